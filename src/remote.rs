//! Clients for the remote parse service and the backend upsert service.
//!
//! Contract (poll mode):
//! - `POST {base}/job/parse/start` with `{"text": ...}` answers `{"job_id": ...}`
//! - `GET  {base}/job/parse/status/{job_id}` answers `{"status", "data"?, "error"?}`
//!
//! Sync mode posts the same body to `{base}/job/parse` and the response body is
//! the result itself. Saving posts the edited record to `{base}/job/upsert`.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::Config;
use crate::error::RemoteError;
use crate::models::Feature;

/// Enrichment returned by the parse service. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteParse {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub salary_range: Option<String>,
    #[serde(default)]
    pub date_posted: Option<String>,
    #[serde(default)]
    pub date_closing: Option<String>,
    #[serde(default)]
    pub date_extracted: Option<String>,
    #[serde(default)]
    pub features: Option<Vec<Feature>>,
    #[serde(rename = "_meta", default)]
    pub meta: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Queued,
    Processing,
    Finished,
    Failed,
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskReport {
    pub status: TaskState,
    #[serde(default)]
    pub data: Option<RemoteParse>,
    #[serde(default)]
    pub error: Option<String>,
}

impl TaskReport {
    pub fn pending(status: TaskState) -> Self {
        TaskReport { status, data: None, error: None }
    }
}

#[derive(Debug, Deserialize)]
struct StartResponse {
    job_id: String,
}

#[derive(Serialize)]
struct ParseRequest<'a> {
    text: &'a str,
}

/// Record sent to the backend when the user confirms a reviewed job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpsertPayload {
    pub title: String,
    pub company: String,
    pub location: String,
    pub salary_range: String,
    pub job_url: String,
    pub date_posted: Option<String>,
    pub date_closing: Option<String>,
    pub date_extracted: Option<String>,
    pub description: String,
    pub displayed_description: Option<String>,
    pub features: Vec<Feature>,
}

#[async_trait]
pub trait ParseService: Send + Sync {
    /// Single request; the response is the enrichment itself.
    async fn parse(&self, text: &str) -> Result<RemoteParse, RemoteError>;

    /// Start a remote task and return its identifier.
    async fn start(&self, text: &str) -> Result<String, RemoteError>;

    /// One status check of a started task.
    async fn status(&self, task_id: &str) -> Result<TaskReport, RemoteError>;
}

#[async_trait]
pub trait UpsertService: Send + Sync {
    async fn upsert(&self, payload: &UpsertPayload) -> Result<(), RemoteError>;
}

/// reqwest-backed client for both services.
#[derive(Clone)]
pub struct HttpApi {
    client: Client,
    base: String,
    token: Option<String>,
}

impl HttpApi {
    pub fn new(config: &Config) -> Result<Self, RemoteError> {
        // the sync parse deadline is enforced by the orchestrator, not here
        let client = Client::builder().build()?;
        Ok(HttpApi {
            client,
            base: config.api_base.trim_end_matches('/').to_string(),
            token: config.api_token.clone(),
        })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, RemoteError> {
        let response = self.authorize(request).send().await?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(RemoteError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|_| "Failed to read error body".to_string());
            tracing::error!("API error: Status {}, Body: {}", status, body);
            return Err(RemoteError::Status(status.as_u16()));
        }
        Ok(response)
    }
}

#[async_trait]
impl ParseService for HttpApi {
    async fn parse(&self, text: &str) -> Result<RemoteParse, RemoteError> {
        let url = format!("{}/job/parse", self.base);
        tracing::info!("Sending parse request to {}", url);
        let response = self.send(self.client.post(&url).json(&ParseRequest { text })).await?;
        response
            .json::<RemoteParse>()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))
    }

    async fn start(&self, text: &str) -> Result<String, RemoteError> {
        let url = format!("{}/job/parse/start", self.base);
        tracing::info!("Starting parse task at {}", url);
        let response = self.send(self.client.post(&url).json(&ParseRequest { text })).await?;
        let started = response
            .json::<StartResponse>()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))?;
        Ok(started.job_id)
    }

    async fn status(&self, task_id: &str) -> Result<TaskReport, RemoteError> {
        let url = format!("{}/job/parse/status/{}", self.base, task_id);
        let response = self.send(self.client.get(&url)).await?;
        response
            .json::<TaskReport>()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))
    }
}

#[async_trait]
impl UpsertService for HttpApi {
    async fn upsert(&self, payload: &UpsertPayload) -> Result<(), RemoteError> {
        let url = format!("{}/job/upsert", self.base);
        tracing::info!("Upserting job {:?} to {}", payload.title, url);
        self.send(self.client.post(&url).json(payload)).await?;
        Ok(())
    }
}
