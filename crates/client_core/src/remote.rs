use async_trait::async_trait;
use shared::{
    domain::{Session, Task, TaskId},
    protocol::{AuthResponse, Credentials, RegistrationProfile, TaskDraft},
};

use crate::error::RemoteError;

/// Networked boundary for auth and task operations.
///
/// Implementations own transport concerns (timeouts, headers, retries if
/// any); callers treat each method as one opaque round trip.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, RemoteError>;
    async fn register(&self, profile: &RegistrationProfile) -> Result<AuthResponse, RemoteError>;
    async fn list_tasks(&self, session: &Session) -> Result<Vec<Task>, RemoteError>;
    async fn create_task(&self, session: &Session, draft: &TaskDraft)
        -> Result<Task, RemoteError>;
    async fn update_task(
        &self,
        session: &Session,
        id: TaskId,
        draft: &TaskDraft,
    ) -> Result<Task, RemoteError>;
    async fn delete_task(&self, session: &Session, id: TaskId) -> Result<(), RemoteError>;
}
