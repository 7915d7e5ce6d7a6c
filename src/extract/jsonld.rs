use select::predicate::{Attr, Name, Predicate};
use serde_json::Value;

use super::rules::Page;

const JOB_POSTING: &str = "JobPosting";

/// First embedded `JobPosting` block on the page, looking one level into
/// `@graph` groups and top-level arrays. Blocks that fail to parse are skipped.
pub fn find_job_posting(page: &Page) -> Option<Value> {
    let scripts = page
        .document
        .find(Name("script").and(Attr("type", "application/ld+json")));

    for script in scripts {
        let raw = script.text();
        let data: Value = match serde_json::from_str(raw.trim()) {
            Ok(v) => v,
            Err(e) => {
                tracing::debug!("Skipping unparseable ld+json block: {}", e);
                continue;
            }
        };
        if let Some(posting) = pick_posting(data) {
            return Some(posting);
        }
    }
    None
}

fn pick_posting(data: Value) -> Option<Value> {
    if is_job_posting(&data) {
        return Some(data);
    }
    let group = match data {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("@graph") {
            Some(Value::Array(items)) => items,
            _ => return None,
        },
        _ => return None,
    };
    group.into_iter().find(is_job_posting)
}

fn is_job_posting(value: &Value) -> bool {
    match value.get("@type") {
        Some(Value::String(t)) => t == JOB_POSTING,
        Some(Value::Array(types)) => types.iter().any(|t| t.as_str() == Some(JOB_POSTING)),
        _ => false,
    }
}
