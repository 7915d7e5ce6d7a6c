use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

use crate::models::JobStatus;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

/// The page did not yield a usable description; no Job is created.
#[derive(Debug, Error, PartialEq)]
pub enum ExtractionError {
    #[error("could not detect a job description ({found} characters found, {required} required)")]
    MissingDescription { found: usize, required: usize },
    #[error("invalid page url: {0}")]
    InvalidUrl(String),
}

/// Transport-level failure talking to the parse or upsert service.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RemoteError {
    #[error("not authenticated")]
    Unauthorized,
    #[error("service returned status {0}")]
    Status(u16),
    #[error("request failed: {0}")]
    Transport(String),
    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RemoteError::Decode(err.to_string())
        } else {
            RemoteError::Transport(err.to_string())
        }
    }
}

/// Terminal outcome of an orchestration attempt. The display text is what
/// gets persisted as the job's `error_msg`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum JobFailure {
    #[error("Session expired. Please re-login.")]
    Auth,
    #[error("Server Error: {0}")]
    Server(u16),
    #[error("Request failed: {0}")]
    Request(String),
    #[error("Timed out after {0:?}")]
    Timeout(Duration),
    #[error("Timed out waiting for the parse task after {0} status checks")]
    PollExhausted(u32),
    #[error("Parse task failed: {0}")]
    TaskFailed(String),
    #[error("Parse task {0} was not found by the service")]
    TaskLost(String),
    /// The queue was cleared while the job was in flight; nothing is persisted.
    #[error("cancelled")]
    Cancelled,
}

impl From<RemoteError> for JobFailure {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Unauthorized => JobFailure::Auth,
            RemoteError::Status(code) => JobFailure::Server(code),
            RemoteError::Transport(msg) => JobFailure::Request(msg),
            RemoteError::Decode(msg) => JobFailure::Request(msg),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("corrupt job record {id}: {message}")]
    Corrupt { id: String, message: String },
}

/// Rejection of a user save. The job stays in review so the user can retry.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("job {0} not found")]
    NotFound(String),
    #[error("job is {0}, only jobs in review can be saved")]
    NotReviewable(JobStatus),
    #[error("Session expired. Please re-login.")]
    Unauthorized,
    #[error("Backend Error {0}")]
    Backend(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<RemoteError> for SaveError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Unauthorized => SaveError::Unauthorized,
            RemoteError::Status(code) => SaveError::Backend(code.to_string()),
            other => SaveError::Backend(other.to_string()),
        }
    }
}

/// Errors surfaced by the queue API.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Unprocessable Entity: {0}")]
    UnprocessableEntity(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Upstream error: {0}")]
    Upstream(String),
    #[error("Internal Server Error: {0}")]
    InternalError(String),
}

impl From<ExtractionError> for AppError {
    fn from(err: ExtractionError) -> Self {
        match err {
            ExtractionError::InvalidUrl(_) => AppError::InvalidRequest(err.to_string()),
            ExtractionError::MissingDescription { .. } => AppError::UnprocessableEntity(err.to_string()),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::InternalError(err.to_string())
    }
}

impl From<SaveError> for AppError {
    fn from(err: SaveError) -> Self {
        match err {
            SaveError::NotFound(_) => AppError::NotFound(err.to_string()),
            SaveError::NotReviewable(_) => AppError::Conflict(err.to_string()),
            SaveError::Unauthorized => AppError::Unauthorized(err.to_string()),
            SaveError::Backend(_) => AppError::Upstream(err.to_string()),
            SaveError::Store(inner) => inner.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}
