use std::collections::HashSet;

use shared::{
    domain::{Session, Task, TaskId},
    protocol::TaskDraft,
};
use tracing::warn;

use crate::{error::RemoteError, remote::RemoteClient};

/// Local mirror of the server task list for the active session.
///
/// Every mutation happens only after the remote call has succeeded; a
/// failed call leaves the list exactly as it was.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: Vec<Task>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
    }

    pub async fn fetch_all(
        &mut self,
        remote: &dyn RemoteClient,
        session: &Session,
    ) -> Result<&[Task], RemoteError> {
        let fetched = remote.list_tasks(session).await?;

        let mut seen = HashSet::with_capacity(fetched.len());
        let mut tasks = Vec::with_capacity(fetched.len());
        for task in fetched {
            if seen.insert(task.id) {
                tasks.push(task);
            } else {
                warn!(task_id = task.id.0, "server returned duplicate task id; keeping first");
            }
        }

        self.tasks = tasks;
        Ok(&self.tasks)
    }

    pub async fn add(
        &mut self,
        remote: &dyn RemoteClient,
        session: &Session,
        draft: &TaskDraft,
    ) -> Result<Task, RemoteError> {
        let created = remote.create_task(session, draft).await?;

        match self.position(created.id) {
            Some(index) => {
                warn!(
                    task_id = created.id.0,
                    "created task id already present locally; replacing entry"
                );
                self.tasks[index] = created.clone();
            }
            None => self.tasks.push(created.clone()),
        }
        Ok(created)
    }

    pub async fn update(
        &mut self,
        remote: &dyn RemoteClient,
        session: &Session,
        id: TaskId,
        draft: &TaskDraft,
    ) -> Result<Task, RemoteError> {
        let updated = remote.update_task(session, id, draft).await?;

        if let Some(index) = self.position(id) {
            self.tasks[index] = updated.clone();
        }
        Ok(updated)
    }

    pub async fn remove(
        &mut self,
        remote: &dyn RemoteClient,
        session: &Session,
        id: TaskId,
    ) -> Result<(), RemoteError> {
        remote.delete_task(session, id).await?;
        self.tasks.retain(|task| task.id != id);
        Ok(())
    }

    fn position(&self, id: TaskId) -> Option<usize> {
        self.tasks.iter().position(|task| task.id == id)
    }
}
