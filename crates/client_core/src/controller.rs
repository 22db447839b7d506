//! View controller: the one place where user actions turn into session and
//! task-list transitions.

use std::sync::Arc;

use shared::{
    domain::{Session, Task, TaskId, UserProfile},
    protocol::{Credentials, RegistrationProfile, TaskDraft},
};
use storage::KeyValueStore;
use tokio::sync::broadcast;
use tracing::{debug, error};

use crate::{
    error::{ControllerError, RemoteError, SessionError, UserAction},
    registry::TaskRegistry,
    remote::RemoteClient,
    session::SessionStore,
};

/// Which form the unauthenticated view presents. Purely cosmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    #[default]
    Login,
    Register,
}

impl AuthMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::Login => Self::Register,
            Self::Register => Self::Login,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    Loading,
    Unauthenticated { mode: AuthMode },
    Authenticated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    StateChanged(ViewState),
    TasksChanged,
    ErrorRaised(String),
    ErrorCleared,
}

pub struct ViewController {
    remote: Arc<dyn RemoteClient>,
    sessions: SessionStore,
    registry: TaskRegistry,
    state: ViewState,
    error: Option<String>,
    events: broadcast::Sender<ViewEvent>,
}

impl ViewController {
    pub fn new(remote: Arc<dyn RemoteClient>, storage: Arc<dyn KeyValueStore>) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            remote,
            sessions: SessionStore::new(storage),
            registry: TaskRegistry::new(),
            state: ViewState::Loading,
            error: None,
            events,
        }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ViewEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state == ViewState::Loading
    }

    pub fn is_logged_in(&self) -> bool {
        self.sessions.is_logged_in()
    }

    pub fn session(&self) -> Option<&Session> {
        self.sessions.session()
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.sessions.user()
    }

    pub fn tasks(&self) -> &[Task] {
        self.registry.tasks()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn auth_mode(&self) -> Option<AuthMode> {
        match self.state {
            ViewState::Unauthenticated { mode } => Some(mode),
            _ => None,
        }
    }

    /// Restores a persisted session, loading its tasks when one exists.
    pub async fn start(&mut self) {
        self.set_state(ViewState::Loading);
        if self.sessions.restore().is_some() {
            let _ = self.fetch_tasks().await;
            self.set_state(ViewState::Authenticated);
        } else {
            self.set_state(ViewState::Unauthenticated {
                mode: AuthMode::Login,
            });
        }
    }

    pub fn toggle_auth_mode(&mut self) {
        if let ViewState::Unauthenticated { mode } = self.state {
            self.set_state(ViewState::Unauthenticated {
                mode: mode.toggled(),
            });
        }
    }

    pub fn set_auth_mode(&mut self, mode: AuthMode) {
        if matches!(self.state, ViewState::Unauthenticated { .. }) {
            self.set_state(ViewState::Unauthenticated { mode });
        }
    }

    /// Logs in and loads the task list. A failed follow-up fetch lands in
    /// the error slot but does not undo the login.
    pub async fn login(&mut self, credentials: &Credentials) -> Result<(), ControllerError> {
        self.ensure_unauthenticated()?;

        let outcome = self
            .sessions
            .login(self.remote.as_ref(), credentials)
            .await
            .map(|_| ());
        self.auth_outcome(UserAction::Login, outcome)?;

        self.set_state(ViewState::Loading);
        let _ = self.fetch_tasks().await;
        self.set_state(ViewState::Authenticated);
        Ok(())
    }

    /// Registers and signs in immediately. Unlike login, no fetch follows:
    /// a fresh account has nothing to load.
    pub async fn register(&mut self, profile: &RegistrationProfile) -> Result<(), ControllerError> {
        self.ensure_unauthenticated()?;

        let outcome = self
            .sessions
            .register(self.remote.as_ref(), profile)
            .await
            .map(|_| ());
        self.auth_outcome(UserAction::Register, outcome)?;

        self.registry.clear();
        self.emit(ViewEvent::TasksChanged);
        self.set_state(ViewState::Authenticated);
        Ok(())
    }

    pub fn logout(&mut self) {
        self.sessions.logout();
        self.registry.clear();
        self.emit(ViewEvent::TasksChanged);
        self.clear_error();
        self.set_state(ViewState::Unauthenticated {
            mode: AuthMode::Login,
        });
    }

    pub async fn refresh(&mut self) -> Result<(), ControllerError> {
        self.ensure_authenticated()?;
        self.set_state(ViewState::Loading);
        let result = self.fetch_tasks().await;
        self.set_state(ViewState::Authenticated);
        result
    }

    pub async fn add_task(&mut self, draft: &TaskDraft) -> Result<Task, ControllerError> {
        self.ensure_authenticated()?;
        let Some(session) = self.sessions.session() else {
            return Err(ControllerError::NotAuthenticated);
        };
        let result = self.registry.add(self.remote.as_ref(), session, draft).await;
        self.task_outcome(UserAction::AddTask, result)
    }

    pub async fn update_task(
        &mut self,
        id: TaskId,
        draft: &TaskDraft,
    ) -> Result<Task, ControllerError> {
        self.ensure_authenticated()?;
        let Some(session) = self.sessions.session() else {
            return Err(ControllerError::NotAuthenticated);
        };
        let result = self
            .registry
            .update(self.remote.as_ref(), session, id, draft)
            .await;
        self.task_outcome(UserAction::UpdateTask, result)
    }

    pub async fn delete_task(&mut self, id: TaskId) -> Result<(), ControllerError> {
        self.ensure_authenticated()?;
        let Some(session) = self.sessions.session() else {
            return Err(ControllerError::NotAuthenticated);
        };
        let result = self.registry.remove(self.remote.as_ref(), session, id).await;
        self.task_outcome(UserAction::DeleteTask, result)
    }

    async fn fetch_tasks(&mut self) -> Result<(), ControllerError> {
        let Some(session) = self.sessions.session() else {
            return Err(ControllerError::NotAuthenticated);
        };
        let result = self
            .registry
            .fetch_all(self.remote.as_ref(), session)
            .await
            .map(|_| ());

        match result {
            Ok(()) => {
                self.clear_error();
                self.emit(ViewEvent::TasksChanged);
                Ok(())
            }
            Err(source) => Err(self.fail_task(UserAction::FetchTasks, source)),
        }
    }

    fn ensure_authenticated(&self) -> Result<(), ControllerError> {
        if self.state == ViewState::Authenticated && self.sessions.is_logged_in() {
            Ok(())
        } else {
            Err(ControllerError::NotAuthenticated)
        }
    }

    fn ensure_unauthenticated(&self) -> Result<(), ControllerError> {
        if self.sessions.is_logged_in() {
            Err(ControllerError::AlreadyAuthenticated)
        } else {
            Ok(())
        }
    }

    fn auth_outcome(
        &mut self,
        action: UserAction,
        outcome: Result<(), SessionError>,
    ) -> Result<(), ControllerError> {
        outcome.map_err(|source| {
            let message = action.failure_message();
            error!(?action, "{message}: {source}");
            self.raise_error(message);
            ControllerError::Auth { action, source }
        })
    }

    fn task_outcome<T>(
        &mut self,
        action: UserAction,
        result: Result<T, RemoteError>,
    ) -> Result<T, ControllerError> {
        match result {
            Ok(value) => {
                self.emit(ViewEvent::TasksChanged);
                Ok(value)
            }
            Err(source) => Err(self.fail_task(action, source)),
        }
    }

    fn fail_task(&mut self, action: UserAction, source: RemoteError) -> ControllerError {
        let message = action.failure_message();
        error!(?action, "{message}: {source}");
        self.raise_error(message);
        ControllerError::Task { action, source }
    }

    fn raise_error(&mut self, message: &str) {
        self.error = Some(message.to_string());
        self.emit(ViewEvent::ErrorRaised(message.to_string()));
    }

    fn clear_error(&mut self) {
        if self.error.take().is_some() {
            self.emit(ViewEvent::ErrorCleared);
        }
    }

    fn set_state(&mut self, state: ViewState) {
        if self.state != state {
            debug!(?state, "view state changed");
        }
        self.state = state;
        self.emit(ViewEvent::StateChanged(state));
    }

    fn emit(&self, event: ViewEvent) {
        // No subscribers is fine; events are advisory.
        let _ = self.events.send(event);
    }
}
