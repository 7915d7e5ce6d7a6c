//! Flattening and field normalisation for structured job-posting data.

use select::document::Document;
use select::predicate::Name;
use serde_json::{Map, Number, Value};

use super::rules::visible_text;

/// Keys that carry links or images rather than readable text.
const NON_TEXT_KEYS: &[&str] = &["url", "sameAs", "logo"];

/// Currency code to printable symbol. Codes not listed print as themselves.
const CURRENCY_SYMBOLS: &[(&str, &str)] = &[("GBP", "£"), ("USD", "$"), ("EUR", "€")];

const DEFAULT_CURRENCY: &str = "GBP";

/// Collapse any JSON value into plain text.
///
/// Scalars become their trimmed string form, arrays join their non-empty
/// parts with ", ", objects join their values with a space while skipping
/// `@`-prefixed keys and link-ish keys.
pub fn flatten(value: &Value) -> String {
    match value {
        Value::Null | Value::Bool(_) => String::new(),
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => number_text(n).unwrap_or_default(),
        Value::Array(items) => items
            .iter()
            .map(flatten)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(map) => map
            .iter()
            .filter(|(key, _)| !key.starts_with('@') && !NON_TEXT_KEYS.contains(&key.as_str()))
            .map(|(_, v)| flatten(v))
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
    }
}

/// Flatten an optional field, returning `None` when nothing readable is left.
pub fn flatten_field(value: Option<&Value>) -> Option<String> {
    value.map(flatten).filter(|s| !s.is_empty())
}

/// Integral floats print without a fraction.
fn number_text(n: &Number) -> Option<String> {
    if n.is_i64() || n.is_u64() {
        return Some(n.to_string());
    }
    let f = n.as_f64().filter(|f| f.is_finite())?;
    if f.fract() == 0.0 && f.abs() < 1e15 {
        Some(format!("{}", f as i64))
    } else {
        Some(f.to_string())
    }
}

/// Text form of a scalar that counts as "set": non-zero numbers and
/// non-empty strings.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => {
            let zero = n.as_f64().is_some_and(|f| f == 0.0);
            if zero {
                None
            } else {
                number_text(n)
            }
        }
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        _ => None,
    }
}

/// Render a `baseSalary` value as display text.
///
/// Structured ranges become "£1000 - £2000 YEAR" (or "£1000 YEAR" with only a
/// lower bound); anything else falls back to its flattened form. No salary
/// field at all gives `None`, never an empty string.
pub fn normalize_salary(value: Option<&Value>) -> Option<String> {
    let value = value?;
    let root = match value {
        Value::Object(map) => map,
        Value::Null | Value::Bool(false) => return None,
        other => return flatten_field(Some(other)),
    };

    let mut merged: Map<String, Value> = root.clone();
    if let Some(Value::Object(inner)) = root.get("value") {
        for (k, v) in inner {
            merged.insert(k.clone(), v.clone());
        }
    }

    let min = merged
        .get("minValue")
        .and_then(scalar_text)
        .or_else(|| merged.get("value").and_then(scalar_text));
    let max = merged.get("maxValue").and_then(scalar_text);
    let currency = merged
        .get("currency")
        .and_then(scalar_text)
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());
    let unit = merged.get("unitText").map(flatten).unwrap_or_default();
    let symbol = currency_symbol(&currency);

    match (min, max) {
        (Some(min), Some(max)) => Some(format!("{symbol}{min} - {symbol}{max} {unit}")),
        (Some(min), None) => Some(format!("{symbol}{min} {unit}")),
        _ => flatten_field(Some(value)),
    }
}

fn currency_symbol(code: &str) -> &str {
    CURRENCY_SYMBOLS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, sym)| *sym)
        .unwrap_or(code)
}

/// Date-only prefix of a flattened date-time value.
pub fn normalize_date(value: Option<&Value>) -> Option<String> {
    flatten_field(value).and_then(|s| date_only(&s))
}

/// Keep the part of a date string before any time separator.
pub fn date_only(raw: &str) -> Option<String> {
    let date = raw.trim().split('T').next().unwrap_or("").trim();
    (!date.is_empty()).then(|| date.to_string())
}

/// Flattened description, rendered to plain text when it carries markup.
/// Returns `(text, markup)` where `markup` is the original HTML, if any.
pub fn normalize_description(value: Option<&Value>) -> (String, Option<String>) {
    let raw = value.map(flatten).unwrap_or_default();
    if !raw.contains('<') {
        return (raw, None);
    }
    let document = Document::from(raw.as_str());
    let text = document
        .find(Name("body"))
        .next()
        .map(|body| visible_text(&body))
        .unwrap_or_default();
    (text, Some(raw))
}

/// Cut the text just before a trailing boilerplate phrase ("Related jobs" and
/// friends), but only when the phrase sits in the last 30% of the text.
pub fn trim_noise(text: &str, phrases: &[&str]) -> String {
    let mut text = text.to_string();
    for phrase in phrases {
        let lower = text.to_ascii_lowercase();
        let needle = phrase.to_ascii_lowercase();
        let Some(byte_idx) = lower.rfind(&needle) else {
            continue;
        };
        let char_idx = text[..byte_idx].chars().count();
        let char_len = text.chars().count();
        if char_idx * 10 >= char_len * 7 {
            tracing::info!("Trimming noise: \"{}\" found at {} of {} chars", phrase, char_idx, char_len);
            text.truncate(byte_idx);
            let kept = text.trim_end().len();
            text.truncate(kept);
        }
    }
    text
}

/// Truncate to at most `max_chars` characters.
pub fn cap_chars(text: &mut String, max_chars: usize) {
    if let Some((byte_idx, _)) = text.char_indices().nth(max_chars) {
        text.truncate(byte_idx);
    }
}
