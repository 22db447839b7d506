use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::{Session, Task, TaskId},
    error::ApiError,
    protocol::{AuthResponse, Credentials, RegistrationProfile, TaskDraft},
};
use tracing::debug;
use url::Url;

use crate::{
    error::{RemoteError, TransportError},
    remote::RemoteClient,
};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// JSON-over-HTTP binding of [`RemoteClient`].
pub struct HttpRemoteClient {
    http: Client,
    base_url: Url,
}

impl HttpRemoteClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            http,
            base_url: normalize_base_url(base_url)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, TransportError> {
        self.base_url
            .join(path)
            .map_err(|err| TransportError::Unavailable(format!("invalid endpoint '{path}': {err}")))
    }

    fn authorized(
        &self,
        method: Method,
        path: &str,
        session: &Session,
    ) -> Result<RequestBuilder, TransportError> {
        let url = self.endpoint(path)?;
        debug!(%method, %url, "task api request");
        Ok(self.http.request(method, url).bearer_auth(&session.token))
    }

    async fn post_auth<B: serde::Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<AuthResponse, TransportError> {
        let url = self.endpoint(path)?;
        debug!(%url, "auth request");
        let res = self.http.post(url).json(body).send().await?;
        read_json(res).await
    }
}

#[async_trait]
impl RemoteClient for HttpRemoteClient {
    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, RemoteError> {
        self.post_auth("auth/login", credentials)
            .await
            .map_err(RemoteError::Auth)
    }

    async fn register(&self, profile: &RegistrationProfile) -> Result<AuthResponse, RemoteError> {
        self.post_auth("auth/register", profile)
            .await
            .map_err(RemoteError::Auth)
    }

    async fn list_tasks(&self, session: &Session) -> Result<Vec<Task>, RemoteError> {
        let fetch = async {
            let res = self
                .authorized(Method::GET, "tasks", session)?
                .send()
                .await?;
            read_json::<Vec<Task>>(res).await
        };
        fetch.await.map_err(RemoteError::Fetch)
    }

    async fn create_task(
        &self,
        session: &Session,
        draft: &TaskDraft,
    ) -> Result<Task, RemoteError> {
        let write = async {
            let res = self
                .authorized(Method::POST, "tasks", session)?
                .json(draft)
                .send()
                .await?;
            read_json::<Task>(res).await
        };
        write.await.map_err(RemoteError::Write)
    }

    async fn update_task(
        &self,
        session: &Session,
        id: TaskId,
        draft: &TaskDraft,
    ) -> Result<Task, RemoteError> {
        let write = async {
            let res = self
                .authorized(Method::PUT, &format!("tasks/{id}"), session)?
                .json(draft)
                .send()
                .await?;
            read_json::<Task>(res).await
        };
        write.await.map_err(RemoteError::Write)
    }

    async fn delete_task(&self, session: &Session, id: TaskId) -> Result<(), RemoteError> {
        let write = async {
            let res = self
                .authorized(Method::DELETE, &format!("tasks/{id}"), session)?
                .send()
                .await?;
            ensure_success(res).await.map(|_| ())
        };
        write.await.map_err(RemoteError::Write)
    }
}

/// Parses `raw` and guarantees a trailing slash so relative joins append
/// to the path instead of replacing its last segment.
pub(crate) fn normalize_base_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    let mut url =
        Url::parse(trimmed).with_context(|| format!("invalid server url '{trimmed}'"))?;
    if url.cannot_be_a_base() {
        anyhow::bail!("server url '{trimmed}' cannot be used as a base url");
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

async fn ensure_success(res: Response) -> Result<Response, TransportError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }

    let reason = status.canonical_reason().unwrap_or("request failed");
    let body = res.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiError>(&body)
        .map(|err| err.message)
        .unwrap_or_else(|_| reason.to_string());
    Err(TransportError::Status {
        status: status.as_u16(),
        message,
    })
}

async fn read_json<T: DeserializeOwned>(res: Response) -> Result<T, TransportError> {
    let res = ensure_success(res).await?;
    Ok(res.json().await?)
}
