mod common;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use common::*;
use http_body_util::BodyExt;
use rolecase::capture::PageCapture;
use rolecase::config::ParseMode;
use rolecase::error::RemoteError;
use rolecase::{create_app, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tower::ServiceExt;

struct FixedCapture(String);

#[async_trait]
impl PageCapture for FixedCapture {
    async fn capture(&self, _url: &str) -> Result<String, RemoteError> {
        Ok(self.0.clone())
    }
}

fn job_page() -> String {
    format!(
        "<html><body><h1>Pastry Chef</h1><article><p>{}</p></article></body></html>",
        "Laminate doughs, temper chocolate and run the morning bake for the cafe. ".repeat(10)
    )
}

/// App whose parse service never answers, so submitted jobs stay parsing.
async fn stalled_app() -> Router {
    let parser = Arc::new(ScriptedParser::polling(Vec::new()).gated(Arc::new(Notify::new())));
    let session = session_with(test_config(ParseMode::Poll), parser, Arc::new(RecordingUpserter::accepting())).await;
    create_app(AppState {
        session,
        capture: Arc::new(FixedCapture(job_page())),
    })
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn health_check_responds() {
    let app = stalled_app().await;
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"Service is healthy");
}

#[tokio::test]
async fn pages_without_a_description_are_unprocessable() {
    let app = stalled_app().await;
    let (status, body) = send(
        &app,
        "POST",
        "/jobs",
        Some(json!({"url": "https://jobs.acme.test/1", "html": "<html><body>Hi</body></html>"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("could not detect a job description"));

    let (_, jobs) = send(&app, "GET", "/jobs", None).await;
    assert_eq!(jobs, json!([]));
}

#[tokio::test]
async fn submitted_pages_are_queued_with_progress() {
    let app = stalled_app().await;
    let (status, job) = send(
        &app,
        "POST",
        "/jobs",
        Some(json!({"url": "https://jobs.acme.test/pastry", "html": job_page()})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(job["status"], "parsing");
    assert_eq!(job["scraped_meta"]["title"], "Pastry Chef");
    let id = job["id"].as_str().unwrap().to_string();

    let (status, jobs) = send(&app, "GET", "/jobs", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(jobs.as_array().unwrap().len(), 1);
    assert_eq!(jobs[0]["id"], id.as_str());
    let percent = jobs[0]["progress"]["percent"].as_f64().unwrap();
    assert!((0.0..=95.0).contains(&percent));

    let (status, single) = send(&app, "GET", &format!("/jobs/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(single["status"], "parsing");

    let (status, body) = send(&app, "POST", &format!("/jobs/{}/save", id), Some(json!({}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn captured_pages_are_queued() {
    let app = stalled_app().await;
    let (status, job) = send(
        &app,
        "POST",
        "/jobs/capture",
        Some(json!({"url": "https://jobs.acme.test/pastry"})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(job["scraped_meta"]["url"], "https://jobs.acme.test/pastry");
}

#[tokio::test]
async fn unknown_jobs_are_not_found() {
    let app = stalled_app().await;
    let missing = uuid::Uuid::new_v4();

    let (status, body) = send(&app, "GET", &format!("/jobs/{}", missing), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains(&missing.to_string()));

    let (status, _) = send(&app, "POST", &format!("/jobs/{}/save", missing), Some(json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn clearing_empties_the_queue() {
    let app = stalled_app().await;
    for n in 0..2 {
        let (status, _) = send(
            &app,
            "POST",
            "/jobs",
            Some(json!({"url": format!("https://jobs.acme.test/{}", n), "html": job_page()})),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
    }

    let (status, body) = send(&app, "DELETE", "/jobs", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed"], 2);

    let (_, jobs) = send(&app, "GET", "/jobs", None).await;
    assert_eq!(jobs, json!([]));
}

#[tokio::test]
async fn reviewed_jobs_can_be_saved_over_http() {
    let parser = Arc::new(ScriptedParser::replying(Ok(enrichment(30.0))));
    let upserter = Arc::new(RecordingUpserter::accepting());
    let session = session_with(test_config(ParseMode::Sync), parser, upserter.clone()).await;
    let app = create_app(AppState {
        session,
        capture: Arc::new(FixedCapture(job_page())),
    });

    let (_, job) = send(
        &app,
        "POST",
        "/jobs",
        Some(json!({"url": "https://jobs.acme.test/pastry", "html": job_page()})),
    )
    .await;
    let id = job["id"].as_str().unwrap().to_string();

    let mut current = Value::Null;
    for _ in 0..500 {
        current = send(&app, "GET", &format!("/jobs/{}", id), None).await.1;
        if current["status"] != "parsing" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    assert_eq!(current["status"], "review");
    assert!(current.get("progress").is_none());

    let (status, saved) = send(
        &app,
        "POST",
        &format!("/jobs/{}/save", id),
        Some(json!({"title": "Head Pastry Chef"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(saved["status"], "saved");
    assert_eq!(upserter.payloads.lock().unwrap()[0].title, "Head Pastry Chef");

    let (_, stats) = send(&app, "GET", "/stats", None).await;
    assert_eq!(stats, json!({"count": 1, "avg_time_sec": 30.0}));

    upserter.set_reply(Err(RemoteError::Unauthorized));
    let (status, _) = send(&app, "POST", &format!("/jobs/{}/save", id), Some(json!({}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn openapi_document_lists_the_queue_routes() {
    let app = stalled_app().await;
    let (status, doc) = send(&app, "GET", "/api-doc/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/jobs"].is_object());
    assert!(doc["paths"]["/jobs/{id}/save"]["post"].is_object());
}
