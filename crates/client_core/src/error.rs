use thiserror::Error;

/// Failure below the API layer: connection, timeout, decode, or a non-2xx reply.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("server responded with {status}: {message}")]
    Status { status: u16, message: String },
    #[error("service unavailable: {0}")]
    Unavailable(String),
}

impl TransportError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Request(err) => err.status().map(|status| status.as_u16()),
            Self::Unavailable(_) => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("authentication rejected: {0}")]
    Auth(#[source] TransportError),
    #[error("task list retrieval failed: {0}")]
    Fetch(#[source] TransportError),
    #[error("task write rejected: {0}")]
    Write(#[source] TransportError),
}

impl RemoteError {
    pub fn transport(&self) -> &TransportError {
        match self {
            Self::Auth(err) | Self::Fetch(err) | Self::Write(err) => err,
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error("failed to persist session: {0:#}")]
    Persist(#[source] anyhow::Error),
}

/// User-initiated actions that can fail into the error slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    FetchTasks,
    AddTask,
    UpdateTask,
    DeleteTask,
    Login,
    Register,
}

impl UserAction {
    pub fn failure_message(self) -> &'static str {
        match self {
            Self::FetchTasks => "Failed to fetch tasks",
            Self::AddTask => "Failed to add task",
            Self::UpdateTask => "Failed to update task",
            Self::DeleteTask => "Failed to delete task",
            Self::Login => "Login failed",
            Self::Register => "Registration failed",
        }
    }
}

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("not logged in")]
    NotAuthenticated,
    #[error("already logged in")]
    AlreadyAuthenticated,
    #[error("{}", .action.failure_message())]
    Auth {
        action: UserAction,
        #[source]
        source: SessionError,
    },
    #[error("{}", .action.failure_message())]
    Task {
        action: UserAction,
        #[source]
        source: RemoteError,
    },
}

impl ControllerError {
    pub fn action(&self) -> Option<UserAction> {
        match self {
            Self::Auth { action, .. } | Self::Task { action, .. } => Some(*action),
            Self::NotAuthenticated | Self::AlreadyAuthenticated => None,
        }
    }

    /// True for calls made from the wrong view state, as opposed to a
    /// failed remote round trip.
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::NotAuthenticated | Self::AlreadyAuthenticated)
    }
}
