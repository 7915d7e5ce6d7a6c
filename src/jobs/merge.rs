//! Reconcile the parse service result with what was scraped locally.

use crate::models::{ParsedResult, ScrapedJobData};
use crate::remote::RemoteParse;

/// The remote value when it has any non-blank text, otherwise the local one.
pub fn pick(remote: Option<String>, local: Option<String>) -> Option<String> {
    match remote {
        Some(value) if !value.trim().is_empty() => Some(value),
        _ => local,
    }
}

/// Build the reviewable record. Descriptions and the job URL always come from
/// the scrape, features always from the service.
pub fn merge(remote: RemoteParse, scraped: &ScrapedJobData) -> ParsedResult {
    let features = remote
        .features
        .unwrap_or_default()
        .into_iter()
        .filter(|f| !f.description.trim().is_empty())
        .collect();

    ParsedResult {
        title: pick(remote.title, Some(scraped.title.clone())).unwrap_or_default(),
        company: pick(remote.company, Some(scraped.company.clone())).unwrap_or_default(),
        location: pick(remote.location, Some(scraped.location.clone())).unwrap_or_default(),
        salary_range: pick(remote.salary_range, scraped.salary.clone()),
        date_posted: pick(remote.date_posted, scraped.date_posted.clone()),
        date_closing: pick(remote.date_closing, scraped.date_closing.clone()),
        date_extracted: pick(remote.date_extracted, scraped.date_extracted.clone()),
        description: scraped.description.clone(),
        displayed_description: scraped.displayed_description.clone(),
        job_url: scraped.url.clone(),
        features,
        meta: remote.meta,
    }
}
