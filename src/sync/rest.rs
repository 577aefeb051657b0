//! REST Remote Store
//!
//! `RemoteStore` over a JSON CRUD API:
//! - `POST   {url}/tasks`
//! - `PATCH  {url}/tasks/{id}`
//! - `DELETE {url}/tasks/{id}`
//! - `POST   {url}/tasks/{id}/events`

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};

use super::remote::RemoteStore;
use crate::config::RemoteConfig;
use crate::entity::{DomainError, DomainResult};
use crate::models::{ConfirmedRecord, ItemId, NewEvent, NewTask, TaskPatch};

/// Characters left as-is inside a path segment
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

pub struct RestRemote {
    client: Client,
    config: RemoteConfig,
}

impl RestRemote {
    pub fn new(config: RemoteConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(client: Client, config: RemoteConfig) -> Self {
        Self { client, config }
    }

    fn tasks_url(&self) -> String {
        format!("{}/tasks", self.config.url.trim_end_matches('/'))
    }

    fn task_url(&self, id: &ItemId) -> String {
        format!("{}/{}", self.tasks_url(), utf8_percent_encode(id.as_str(), SEGMENT))
    }

    fn request(&self, method: Method, url: String) -> RequestBuilder {
        let builder = self.client.request(method, url);
        if self.config.token.is_empty() {
            builder
        } else {
            builder.bearer_auth(&self.config.token)
        }
    }
}

/// Map a non-success HTTP status to a domain error
pub fn status_error(status: StatusCode, body: &str) -> DomainError {
    let detail = if body.is_empty() {
        status.to_string()
    } else {
        format!("{}: {}", status, body)
    };

    match status {
        StatusCode::NOT_FOUND => DomainError::NotFound(detail),
        StatusCode::CONFLICT => DomainError::Conflict(detail),
        s if s.is_client_error() => DomainError::InvalidInput(detail),
        _ => DomainError::Internal(detail),
    }
}

async fn send(builder: RequestBuilder) -> DomainResult<Response> {
    let response = builder
        .send()
        .await
        .map_err(|e| DomainError::Network(e.to_string()))?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(status_error(status, &body))
}

async fn confirmed(response: Response) -> DomainResult<ConfirmedRecord> {
    response
        .json::<ConfirmedRecord>()
        .await
        .map_err(|e| DomainError::Internal(format!("invalid create response: {}", e)))
}

#[async_trait]
impl RemoteStore for RestRemote {
    async fn create(&self, task: &NewTask) -> DomainResult<ConfirmedRecord> {
        let response = send(self.request(Method::POST, self.tasks_url()).json(task)).await?;
        confirmed(response).await
    }

    async fn update(&self, id: &ItemId, patch: &TaskPatch) -> DomainResult<()> {
        send(self.request(Method::PATCH, self.task_url(id)).json(patch)).await?;
        Ok(())
    }

    async fn delete(&self, id: &ItemId) -> DomainResult<()> {
        send(self.request(Method::DELETE, self.task_url(id))).await?;
        Ok(())
    }

    async fn create_event(
        &self,
        task_id: &ItemId,
        event: &NewEvent,
    ) -> DomainResult<ConfirmedRecord> {
        let url = format!("{}/events", self.task_url(task_id));
        let response = send(self.request(Method::POST, url).json(event)).await?;
        confirmed(response).await
    }
}
