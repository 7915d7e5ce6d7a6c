use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;

pub mod capture;
pub mod config;
pub mod entities;
pub mod error;
pub mod estimator;
pub mod extract;
pub mod jobs;
pub mod models;
pub mod remote;
pub mod routes;
pub mod session;
pub mod store;

use capture::PageCapture;
use session::Session;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub session: Session,
    pub capture: Arc<dyn PageCapture>,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = String)
    )
)]
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "Service is healthy")
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "RoleCase queue API",
        version = "0.1.0",
        description = "Capture job postings, enrich them through the parse service and save reviewed records."
    ),
    paths(
        health_check,
        routes::jobs::list_jobs,
        routes::jobs::get_job,
        routes::jobs::submit_page,
        routes::jobs::capture_page,
        routes::jobs::save_job,
        routes::jobs::clear_jobs,
        routes::jobs::get_stats
    ),
    components(schemas(
        models::Job,
        models::JobStatus,
        models::ScrapedJobData,
        models::ParsedResult,
        models::Feature,
        models::FeatureType,
        models::Stats,
        estimator::Progress,
        jobs::save::JobEdit,
        routes::jobs::JobView,
        routes::jobs::SubmitPageRequest,
        routes::jobs::CaptureRequest,
        routes::jobs::ClearResponse
    ))
)]
pub struct ApiDoc;

pub fn create_app(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/jobs", get(routes::list_jobs).post(routes::submit_page).delete(routes::clear_jobs))
        .route("/jobs/capture", post(routes::capture_page))
        .route("/jobs/{id}", get(routes::get_job))
        .route("/jobs/{id}/save", post(routes::save_job))
        .route("/stats", get(routes::get_stats))
        .with_state(state);

    let docs_router = Router::new().route("/api-doc/openapi.json", get(|| async { Json(ApiDoc::openapi()) }));

    Router::new().merge(api_routes).merge(docs_router).layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    )
}
