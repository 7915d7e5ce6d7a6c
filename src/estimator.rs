//! Rolling average of parse durations, used only for progress display.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::models::Stats;

/// Progress shown for a job still parsing never claims more than this.
const MAX_PERCENT: f64 = 95.0;

/// Fold one observed duration into the running average.
pub fn record(stats: Stats, duration_sec: f64) -> Stats {
    let n = stats.count as f64;
    Stats {
        count: stats.count + 1,
        avg_time_sec: (stats.avg_time_sec * n + duration_sec) / (n + 1.0),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct Progress {
    pub percent: f64,
    pub seconds_left: u64,
}

/// Estimated progress of a job created at `created_at`, judged against the
/// average parse time.
pub fn progress(stats: &Stats, created_at: DateTime<Utc>, now: DateTime<Utc>) -> Progress {
    let elapsed = (now - created_at).num_milliseconds().max(0) as f64 / 1000.0;
    let total = stats.avg_time_sec.max(f64::EPSILON);
    Progress {
        percent: (elapsed / total * 100.0).min(MAX_PERCENT),
        seconds_left: (total - elapsed).max(0.0).ceil() as u64,
    }
}
