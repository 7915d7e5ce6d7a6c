use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// Default estimate (seconds) before any parse duration has been observed.
pub const DEFAULT_AVG_TIME_SEC: f64 = 60.0;

/// Best-effort snapshot of what was visible on the page at extraction time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ScrapedJobData {
    pub title: String,
    pub company: String,
    pub location: String,
    /// Raw salary text; `None` when the page carries no salary at all
    pub salary: Option<String>,
    pub description: String,
    /// Markup the description was rendered from, when the page supplied markup
    #[serde(default)]
    pub displayed_description: Option<String>,
    pub date_posted: Option<String>,
    pub date_closing: Option<String>,
    pub date_extracted: Option<String>,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Parsing,
    Review,
    Saved,
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Parsing => "parsing",
            JobStatus::Review => "review",
            JobStatus::Saved => "saved",
            JobStatus::Error => "error",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "parsing" => Ok(JobStatus::Parsing),
            "review" => Ok(JobStatus::Review),
            "saved" => Ok(JobStatus::Saved),
            "error" => Ok(JobStatus::Error),
            other => Err(format!("unknown job status '{}'", other)),
        }
    }
}

/// Category of an enriched feature. Unknown categories coming back from the
/// parse service are kept as `Other` rather than rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FeatureType {
    Responsibility,
    HardSkill,
    SoftSkill,
    Qualification,
    Requirement,
    Benefit,
    EmployerMission,
    EmployerCulture,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: FeatureType,
    pub description: String,
}

/// Enriched record, merged from the parse service result and the local scrape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ParsedResult {
    pub title: String,
    pub company: String,
    pub location: String,
    pub salary_range: Option<String>,
    pub date_posted: Option<String>,
    pub date_closing: Option<String>,
    pub date_extracted: Option<String>,
    pub description: String,
    pub displayed_description: Option<String>,
    pub job_url: String,
    #[serde(default)]
    pub features: Vec<Feature>,
    /// Diagnostics passed through untouched from the parse service
    #[serde(rename = "_meta", alias = "meta", default)]
    #[schema(value_type = Option<Object>)]
    pub meta: Option<Value>,
}

impl ParsedResult {
    /// Seconds the parse service reported spending on this record, if any.
    pub fn generation_time_sec(&self) -> Option<f64> {
        self.meta
            .as_ref()?
            .get("generation_time_sec")?
            .as_f64()
            .filter(|secs| secs.is_finite() && *secs >= 0.0)
    }
}

/// One tracked extraction and its lifecycle.
///
/// `parsed_result` is present exactly when the status is `review` or `saved`,
/// `error_msg` exactly when it is `error`. The transition methods below are the
/// only way the status moves, and each keeps both rules intact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Job {
    pub id: Uuid,
    pub status: JobStatus,
    pub original_text: String,
    pub scraped_meta: ScrapedJobData,
    pub parsed_result: Option<ParsedResult>,
    pub created_at: DateTime<Utc>,
    pub error_msg: Option<String>,
    #[serde(default)]
    pub remote_task_id: Option<String>,
}

impl Job {
    pub fn new(scraped: ScrapedJobData) -> Self {
        Job {
            id: Uuid::new_v4(),
            status: JobStatus::Parsing,
            original_text: scraped.description.clone(),
            scraped_meta: scraped,
            parsed_result: None,
            created_at: Utc::now(),
            error_msg: None,
            remote_task_id: None,
        }
    }

    pub fn complete(&mut self, parsed: ParsedResult) {
        self.status = JobStatus::Review;
        self.parsed_result = Some(parsed);
        self.error_msg = None;
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.status = JobStatus::Error;
        self.parsed_result = None;
        self.error_msg = Some(message.into());
    }

    pub fn mark_saved(&mut self) {
        self.status = JobStatus::Saved;
    }

    pub fn is_consistent(&self) -> bool {
        let has_result = matches!(self.status, JobStatus::Review | JobStatus::Saved);
        let has_error = self.status == JobStatus::Error;
        self.parsed_result.is_some() == has_result && self.error_msg.is_some() == has_error
    }
}

/// Process-wide running average of parse durations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Stats {
    pub count: u64,
    pub avg_time_sec: f64,
}

impl Default for Stats {
    fn default() -> Self {
        Stats {
            count: 0,
            avg_time_sec: DEFAULT_AVG_TIME_SEC,
        }
    }
}
