#![allow(dead_code)]

use async_trait::async_trait;
use rolecase::config::{Config, ParseMode};
use rolecase::error::RemoteError;
use rolecase::models::ScrapedJobData;
use rolecase::remote::{ParseService, RemoteParse, TaskReport, TaskState, UpsertPayload, UpsertService};
use rolecase::session::Session;
use rolecase::store::JobStore;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;
use tokio::sync::Notify;

static INIT: Once = Once::new();

pub fn setup() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt::try_init();
    });
}

/// Fast timings so whole orchestrations finish in milliseconds.
pub fn test_config(mode: ParseMode) -> Config {
    Config {
        parse_mode: mode,
        poll_interval: Duration::from_millis(1),
        poll_max_attempts: 150,
        parse_timeout: Duration::from_secs(5),
        keepalive_interval: Duration::from_millis(5),
        store_retry_window: Duration::from_millis(200),
        ..Config::default()
    }
}

pub fn scraped() -> ScrapedJobData {
    ScrapedJobData {
        title: "Line Cook".into(),
        company: "Bistro Nine".into(),
        location: "Bristol".into(),
        salary: Some("£24000 YEAR".into()),
        description: "Prepare and cook dishes to a consistent standard during busy services.".into(),
        displayed_description: None,
        date_posted: Some("2024-05-01".into()),
        date_closing: None,
        date_extracted: Some("2024-05-02".into()),
        url: "https://jobs.bistronine.test/line-cook".into(),
    }
}

/// A parse result as the service would send it, reporting `seconds` of work.
pub fn enrichment(seconds: f64) -> RemoteParse {
    serde_json::from_value(json!({
        "title": "Line Cook (Evenings)",
        "company": "",
        "salary_range": "£24,000 per year",
        "features": [
            {"type": "responsibility", "description": "Run the grill station"},
            {"type": "hard_skill", "description": ""},
            {"type": "perks", "description": "Staff meals"}
        ],
        "_meta": {"generation_time_sec": seconds}
    }))
    .unwrap()
}

pub fn finished(data: RemoteParse) -> TaskReport {
    TaskReport {
        status: TaskState::Finished,
        data: Some(data),
        error: None,
    }
}

/// Parse service that replays a script of status reports.
pub struct ScriptedParser {
    script: Mutex<VecDeque<Result<TaskReport, RemoteError>>>,
    sync_reply: Mutex<Option<Result<RemoteParse, RemoteError>>>,
    start_error: Option<RemoteError>,
    delay: Duration,
    gate: Option<Arc<Notify>>,
    pub status_calls: AtomicU32,
    pub texts: Mutex<Vec<String>>,
}

impl ScriptedParser {
    pub fn polling(script: Vec<Result<TaskReport, RemoteError>>) -> Self {
        ScriptedParser {
            script: Mutex::new(script.into()),
            sync_reply: Mutex::new(None),
            start_error: None,
            delay: Duration::ZERO,
            gate: None,
            status_calls: AtomicU32::new(0),
            texts: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(reply: Result<RemoteParse, RemoteError>) -> Self {
        let parser = Self::polling(Vec::new());
        *parser.sync_reply.lock().unwrap() = Some(reply);
        parser
    }

    pub fn failing_start(mut self, error: RemoteError) -> Self {
        self.start_error = Some(error);
        self
    }

    /// Every call sleeps this long before answering.
    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Calls wait for a notification before answering.
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn calls(&self) -> u32 {
        self.status_calls.load(Ordering::SeqCst)
    }

    async fn hold(&self) {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

#[async_trait]
impl ParseService for ScriptedParser {
    async fn parse(&self, text: &str) -> Result<RemoteParse, RemoteError> {
        self.texts.lock().unwrap().push(text.to_string());
        self.hold().await;
        self.sync_reply
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Ok(RemoteParse::default()))
    }

    async fn start(&self, text: &str) -> Result<String, RemoteError> {
        self.texts.lock().unwrap().push(text.to_string());
        match &self.start_error {
            Some(error) => Err(error.clone()),
            None => Ok("task-1".to_string()),
        }
    }

    async fn status(&self, task_id: &str) -> Result<TaskReport, RemoteError> {
        assert_eq!(task_id, "task-1");
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.hold().await;
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(TaskReport::pending(TaskState::Processing)))
    }
}

/// Upsert service that records payloads and answers with a fixed reply.
pub struct RecordingUpserter {
    reply: Mutex<Result<(), RemoteError>>,
    pub payloads: Mutex<Vec<UpsertPayload>>,
}

impl RecordingUpserter {
    pub fn accepting() -> Self {
        Self::answering(Ok(()))
    }

    pub fn answering(reply: Result<(), RemoteError>) -> Self {
        RecordingUpserter {
            reply: Mutex::new(reply),
            payloads: Mutex::new(Vec::new()),
        }
    }

    pub fn set_reply(&self, reply: Result<(), RemoteError>) {
        *self.reply.lock().unwrap() = reply;
    }
}

#[async_trait]
impl UpsertService for RecordingUpserter {
    async fn upsert(&self, payload: &UpsertPayload) -> Result<(), RemoteError> {
        self.payloads.lock().unwrap().push(payload.clone());
        self.reply.lock().unwrap().clone()
    }
}

pub async fn session_with(
    config: Config,
    parser: Arc<ScriptedParser>,
    upserter: Arc<RecordingUpserter>,
) -> Session {
    setup();
    let store = JobStore::in_memory().await.unwrap();
    Session::start(config, store, parser, upserter)
}

/// Wait (briefly) until `check` holds.
pub async fn eventually<F: Fn() -> bool>(check: F) {
    for _ in 0..500 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("condition not reached in time");
}
