use std::sync::Arc;

use shared::{
    domain::{Session, UserProfile},
    protocol::{AuthResponse, Credentials, RegistrationProfile},
};
use storage::KeyValueStore;
use tracing::{info, warn};

use crate::{error::SessionError, remote::RemoteClient};

pub const TOKEN_KEY: &str = "token";
pub const USER_KEY: &str = "user";

/// Single owner of the authenticated session and its durable copy.
pub struct SessionStore {
    storage: Arc<dyn KeyValueStore>,
    session: Option<Session>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            storage,
            session: None,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.session.as_ref().map(|session| &session.user)
    }

    pub fn is_logged_in(&self) -> bool {
        self.session.is_some()
    }

    /// Loads a previously persisted session. The token is trusted as-is;
    /// a stale one only shows up when the next request is rejected.
    pub fn restore(&mut self) -> Option<&Session> {
        let (token, user) = match self.read_pair() {
            Ok(pair) => pair,
            Err(err) => {
                warn!("discarding unreadable session storage: {err:#}");
                self.session = None;
                self.reset_storage();
                return None;
            }
        };

        match (token, user) {
            (Some(token), Some(raw_user)) => match serde_json::from_str::<UserProfile>(&raw_user) {
                Ok(user) => {
                    info!(user_id = user.id.0, "restored persisted session");
                    self.session = Some(Session { token, user });
                }
                Err(err) => {
                    warn!("discarding persisted session with unreadable user: {err}");
                    self.session = None;
                    self.clear_storage();
                }
            },
            (None, None) => {
                self.session = None;
            }
            (token, _) => {
                warn!(
                    has_token = token.is_some(),
                    "discarding incomplete persisted session"
                );
                self.session = None;
                self.clear_storage();
            }
        }

        self.session.as_ref()
    }

    pub async fn login(
        &mut self,
        remote: &dyn RemoteClient,
        credentials: &Credentials,
    ) -> Result<&Session, SessionError> {
        let response = remote.login(credentials).await?;
        info!(user_id = response.user.id.0, "login accepted");
        self.establish(response)
    }

    pub async fn register(
        &mut self,
        remote: &dyn RemoteClient,
        profile: &RegistrationProfile,
    ) -> Result<&Session, SessionError> {
        let response = remote.register(profile).await?;
        info!(user_id = response.user.id.0, "registration accepted");
        self.establish(response)
    }

    /// Drops the session and its durable copy. Never fails; storage errors
    /// are logged and the in-memory session is cleared regardless.
    pub fn logout(&mut self) {
        if let Some(session) = self.session.take() {
            info!(user_id = session.user.id.0, "logged out");
        }
        self.clear_storage();
    }

    fn establish(&mut self, response: AuthResponse) -> Result<&Session, SessionError> {
        let session = Session {
            token: response.token,
            user: response.user,
        };

        if let Err(err) = self.persist(&session) {
            self.clear_storage();
            return Err(SessionError::Persist(err));
        }

        Ok(self.session.insert(session))
    }

    fn persist(&self, session: &Session) -> anyhow::Result<()> {
        let user = serde_json::to_string(&session.user)?;
        self.storage.set(TOKEN_KEY, &session.token)?;
        self.storage.set(USER_KEY, &user)?;
        Ok(())
    }

    fn read_pair(&self) -> anyhow::Result<(Option<String>, Option<String>)> {
        Ok((self.storage.get(TOKEN_KEY)?, self.storage.get(USER_KEY)?))
    }

    /// Removes both keys; falls back to wiping the store when a key
    /// cannot be removed.
    fn clear_storage(&self) {
        for key in [TOKEN_KEY, USER_KEY] {
            if let Err(err) = self.storage.remove(key) {
                warn!(key, "failed to clear persisted session key: {err:#}");
                self.reset_storage();
                return;
            }
        }
    }

    fn reset_storage(&self) {
        if let Err(err) = self.storage.clear() {
            warn!("failed to reset session storage: {err:#}");
        }
    }
}
