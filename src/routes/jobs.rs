use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppError;
use crate::estimator::{self, Progress};
use crate::extract::scrape_html;
use crate::jobs::save::JobEdit;
use crate::models::{Job, JobStatus, Stats};
use crate::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitPageRequest {
    /// Address the page was loaded from
    pub url: String,
    /// Full page markup as captured by the host
    pub html: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CaptureRequest {
    /// Page to fetch and extract
    pub url: String,
}

/// A job as shown in the queue.
#[derive(Debug, Serialize, ToSchema)]
pub struct JobView {
    #[serde(flatten)]
    pub job: Job,
    /// Only present while the job is parsing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<Progress>,
}

impl JobView {
    fn new(job: Job, stats: &Stats) -> Self {
        let progress = (job.status == JobStatus::Parsing)
            .then(|| estimator::progress(stats, job.created_at, Utc::now()));
        JobView { job, progress }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ClearResponse {
    /// Number of jobs removed
    pub removed: u64,
}

/// List every job, newest first
#[utoipa::path(
    get,
    path = "/jobs",
    responses(
        (status = 200, description = "All jobs in the queue", body = [JobView]),
        (status = 500, description = "Store unavailable")
    )
)]
pub async fn list_jobs(State(state): State<AppState>) -> Result<Json<Vec<JobView>>, AppError> {
    let stats = state.session.stats().await?;
    let jobs = state.session.jobs().await?;
    Ok(Json(jobs.into_iter().map(|job| JobView::new(job, &stats)).collect()))
}

#[utoipa::path(
    get,
    path = "/jobs/{id}",
    params(("id" = Uuid, Path, description = "Job id")),
    responses(
        (status = 200, description = "The job", body = JobView),
        (status = 404, description = "No such job")
    )
)]
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<JobView>, AppError> {
    let job = state
        .session
        .job(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("job {}", id)))?;
    let stats = state.session.stats().await?;
    Ok(Json(JobView::new(job, &stats)))
}

/// Extract a page the host already captured and queue it for parsing
#[utoipa::path(
    post,
    path = "/jobs",
    request_body = SubmitPageRequest,
    responses(
        (status = 202, description = "Job queued, parsing in the background", body = Job),
        (status = 400, description = "Invalid page url"),
        (status = 422, description = "No job description could be detected on the page")
    )
)]
#[tracing::instrument(skip(state, request), fields(url = %request.url))]
pub async fn submit_page(
    State(state): State<AppState>,
    Json(request): Json<SubmitPageRequest>,
) -> Result<impl IntoResponse, AppError> {
    let scraped = scrape_html(&request.url, &request.html)?;
    let job = state.session.submit(scraped).await?;
    Ok((StatusCode::ACCEPTED, Json(job)))
}

/// Fetch a page, extract it and queue it for parsing
#[utoipa::path(
    post,
    path = "/jobs/capture",
    request_body = CaptureRequest,
    responses(
        (status = 202, description = "Job queued, parsing in the background", body = Job),
        (status = 422, description = "No job description could be detected on the page"),
        (status = 502, description = "The page could not be fetched")
    )
)]
#[tracing::instrument(skip(state, request), fields(url = %request.url))]
pub async fn capture_page(
    State(state): State<AppState>,
    Json(request): Json<CaptureRequest>,
) -> Result<impl IntoResponse, AppError> {
    let html = state.capture.capture(&request.url).await.map_err(|e| {
        tracing::error!("Capture failed for {}: {}", request.url, e);
        AppError::Upstream(e.to_string())
    })?;
    let scraped = scrape_html(&request.url, &html)?;
    let job = state.session.submit(scraped).await?;
    Ok((StatusCode::ACCEPTED, Json(job)))
}

/// Send a reviewed job, with the user's edits, to the backend
#[utoipa::path(
    post,
    path = "/jobs/{id}/save",
    params(("id" = Uuid, Path, description = "Job id")),
    request_body = JobEdit,
    responses(
        (status = 200, description = "Job saved", body = Job),
        (status = 401, description = "Backend session expired"),
        (status = 404, description = "No such job"),
        (status = 409, description = "Job is not awaiting review"),
        (status = 502, description = "Backend rejected the record")
    )
)]
pub async fn save_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(edit): Json<JobEdit>,
) -> Result<Json<Job>, AppError> {
    let job = state.session.save(id, edit).await?;
    Ok(Json(job))
}

/// Empty the queue, abandoning anything still parsing
#[utoipa::path(
    delete,
    path = "/jobs",
    responses(
        (status = 200, description = "Queue cleared", body = ClearResponse)
    )
)]
pub async fn clear_jobs(State(state): State<AppState>) -> Result<Json<ClearResponse>, AppError> {
    let removed = state.session.clear().await?;
    Ok(Json(ClearResponse { removed }))
}

#[utoipa::path(
    get,
    path = "/stats",
    responses(
        (status = 200, description = "Rolling parse-time estimate", body = Stats)
    )
)]
pub async fn get_stats(State(state): State<AppState>) -> Result<Json<Stats>, AppError> {
    Ok(Json(state.session.stats().await?))
}
