//! In-memory stand-in for the task API.

use std::{
    collections::HashSet,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use shared::{
    domain::{Session, Task, TaskId, UserId, UserProfile},
    protocol::{AuthResponse, Credentials, RegistrationProfile, TaskDraft},
};

use crate::{
    error::{RemoteError, TransportError},
    remote::RemoteClient,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Op {
    Login,
    Register,
    List,
    Create,
    Update,
    Delete,
}

struct Account {
    email: String,
    password: String,
    user: UserProfile,
    token: String,
}

#[derive(Default)]
struct FakeState {
    accounts: Vec<Account>,
    tasks: Vec<Task>,
    next_task_id: i64,
    failing: HashSet<Op>,
    calls: Vec<Op>,
    tokens_seen: Vec<String>,
}

pub(crate) struct FakeRemote {
    state: Mutex<FakeState>,
}

impl FakeRemote {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                next_task_id: 100,
                ..FakeState::default()
            }),
        }
    }

    pub(crate) fn with_account(
        self,
        email: &str,
        password: &str,
        user: UserProfile,
        token: &str,
    ) -> Self {
        self.lock().accounts.push(Account {
            email: email.to_string(),
            password: password.to_string(),
            user,
            token: token.to_string(),
        });
        self
    }

    pub(crate) fn with_tasks(self, tasks: Vec<Task>) -> Self {
        self.lock().tasks = tasks;
        self
    }

    pub(crate) fn seed_task(&self, task: Task) {
        self.lock().tasks.push(task);
    }

    pub(crate) fn fail(&self, op: Op) {
        self.lock().failing.insert(op);
    }

    pub(crate) fn heal(&self, op: Op) {
        self.lock().failing.remove(&op);
    }

    pub(crate) fn calls(&self) -> Vec<Op> {
        self.lock().calls.clone()
    }

    pub(crate) fn count(&self, op: Op) -> usize {
        self.lock().calls.iter().filter(|call| **call == op).count()
    }

    pub(crate) fn tokens_seen(&self) -> Vec<String> {
        self.lock().tokens_seen.clone()
    }

    pub(crate) fn server_tasks(&self) -> Vec<Task> {
        self.lock().tasks.clone()
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake remote lock")
    }

    fn enter(&self, op: Op, session: Option<&Session>) -> Result<MutexGuard<'_, FakeState>, TransportError> {
        let mut state = self.lock();
        state.calls.push(op);
        if let Some(session) = session {
            state.tokens_seen.push(session.token.clone());
        }
        if state.failing.contains(&op) {
            return Err(TransportError::Unavailable("network down".to_string()));
        }
        Ok(state)
    }
}

fn not_found(id: TaskId) -> TransportError {
    TransportError::Status {
        status: 404,
        message: format!("task {id} not found"),
    }
}

fn apply_draft(task: &mut Task, draft: &TaskDraft) {
    if let Some(title) = &draft.title {
        task.title = title.clone();
    }
    if let Some(description) = &draft.description {
        task.description = Some(description.clone());
    }
    if let Some(completed) = draft.completed {
        task.completed = completed;
    }
}

#[async_trait]
impl RemoteClient for FakeRemote {
    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, RemoteError> {
        let state = self.enter(Op::Login, None).map_err(RemoteError::Auth)?;
        state
            .accounts
            .iter()
            .find(|account| {
                account.email == credentials.identifier && account.password == credentials.secret
            })
            .map(|account| AuthResponse {
                user: account.user.clone(),
                token: account.token.clone(),
            })
            .ok_or_else(|| {
                RemoteError::Auth(TransportError::Status {
                    status: 401,
                    message: "invalid credentials".to_string(),
                })
            })
    }

    async fn register(&self, profile: &RegistrationProfile) -> Result<AuthResponse, RemoteError> {
        let mut state = self.enter(Op::Register, None).map_err(RemoteError::Auth)?;
        if state
            .accounts
            .iter()
            .any(|account| account.email == profile.identifier)
        {
            return Err(RemoteError::Auth(TransportError::Status {
                status: 409,
                message: "email already registered".to_string(),
            }));
        }

        let id = UserId(state.accounts.len() as i64 + 1);
        let account = Account {
            email: profile.identifier.clone(),
            password: profile.secret.clone(),
            user: UserProfile::new(id, profile.name.clone()),
            token: format!("token-{id}"),
        };
        let response = AuthResponse {
            user: account.user.clone(),
            token: account.token.clone(),
        };
        state.accounts.push(account);
        Ok(response)
    }

    async fn list_tasks(&self, session: &Session) -> Result<Vec<Task>, RemoteError> {
        let state = self
            .enter(Op::List, Some(session))
            .map_err(RemoteError::Fetch)?;
        Ok(state.tasks.clone())
    }

    async fn create_task(
        &self,
        session: &Session,
        draft: &TaskDraft,
    ) -> Result<Task, RemoteError> {
        let mut state = self
            .enter(Op::Create, Some(session))
            .map_err(RemoteError::Write)?;
        let id = TaskId(state.next_task_id);
        state.next_task_id += 1;

        let mut task = Task::new(id, "", false);
        apply_draft(&mut task, draft);
        state.tasks.push(task.clone());
        Ok(task)
    }

    async fn update_task(
        &self,
        session: &Session,
        id: TaskId,
        draft: &TaskDraft,
    ) -> Result<Task, RemoteError> {
        let mut state = self
            .enter(Op::Update, Some(session))
            .map_err(RemoteError::Write)?;
        let task = state
            .tasks
            .iter_mut()
            .find(|task| task.id == id)
            .ok_or_else(|| RemoteError::Write(not_found(id)))?;
        apply_draft(task, draft);
        Ok(task.clone())
    }

    async fn delete_task(&self, session: &Session, id: TaskId) -> Result<(), RemoteError> {
        let mut state = self
            .enter(Op::Delete, Some(session))
            .map_err(RemoteError::Write)?;
        let before = state.tasks.len();
        state.tasks.retain(|task| task.id != id);
        if state.tasks.len() == before {
            return Err(RemoteError::Write(not_found(id)));
        }
        Ok(())
    }
}

pub(crate) fn alice() -> UserProfile {
    UserProfile::new(UserId(1), "Alice")
}

pub(crate) fn alice_session() -> Session {
    Session {
        token: "abc".to_string(),
        user: alice(),
    }
}

/// Remote with the account used throughout the scenarios: alice/pw -> token "abc".
pub(crate) fn alice_remote() -> FakeRemote {
    FakeRemote::new().with_account("alice", "pw", alice(), "abc")
}

pub(crate) fn buy_milk() -> Task {
    Task::new(TaskId(5), "Buy milk", false)
}
