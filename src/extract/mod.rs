//! Job-posting extraction: structured data first, then per-site DOM rules,
//! merged into one `ScrapedJobData`.

pub mod family;
pub mod flatten;
pub mod jsonld;
pub mod rules;

use chrono::{NaiveDate, Utc};
use serde_json::Value;
use url::Url;

use crate::error::ExtractionError;
use crate::models::ScrapedJobData;
use family::{DescriptionPolicy, SiteFamily};
use flatten::{cap_chars, flatten_field, normalize_date, normalize_description, normalize_salary, trim_noise};
use rules::{first_match, Page};

/// Character budget for the description handed to the parse service.
pub const MAX_DESCRIPTION_CHARS: usize = 25_000;

/// Descriptions shorter than this are treated as "nothing found".
pub const MIN_DESCRIPTION_CHARS: usize = 50;

/// Extract a job posting from raw page HTML.
pub fn scrape_html(url: &str, html: &str) -> Result<ScrapedJobData, ExtractionError> {
    let url = Url::parse(url).map_err(|e| ExtractionError::InvalidUrl(format!("{}: {}", url, e)))?;
    let page = Page::parse(url, html);
    scrape_page(&page, Utc::now().date_naive())
}

/// Run the full extraction pipeline over a parsed page.
#[tracing::instrument(skip(page), fields(url = %page.url))]
pub fn scrape_page(page: &Page, extracted_on: NaiveDate) -> Result<ScrapedJobData, ExtractionError> {
    let posting = jsonld::find_job_posting(page).unwrap_or(Value::Null);
    let mut data = baseline(page, &posting, extracted_on);
    tracing::debug!(
        has_structured_data = !posting.is_null(),
        description_chars = data.description.chars().count(),
        "Baseline extracted"
    );

    let family = SiteFamily::detect(page.host());
    tracing::info!("Using {} strategy", family.name());
    let rules = family.rules();

    if let Some(dom_desc) = first_match(&rules.description, page) {
        let dom_len = dom_desc.chars().count();
        let take_dom = match family.description_policy() {
            DescriptionPolicy::PreferLonger => dom_len > data.description.chars().count(),
            DescriptionPolicy::PreferSubstantial(min) => dom_len > min,
        };
        if take_dom {
            tracing::debug!("Preferring DOM description ({} chars)", dom_len);
            data.description = dom_desc;
            data.displayed_description = None;
        }
    }

    fill_gap(&mut data.title, || first_match(&rules.title, page));
    fill_gap(&mut data.company, || first_match(&rules.company, page));
    fill_gap(&mut data.location, || first_match(&rules.location, page));

    let noise = family.noise_phrases();
    if !noise.is_empty() {
        data.description = trim_noise(&data.description, noise);
    }

    cap_chars(&mut data.description, MAX_DESCRIPTION_CHARS);
    if let Some(markup) = data.displayed_description.as_mut() {
        cap_chars(markup, MAX_DESCRIPTION_CHARS);
    }

    let found = data.description.chars().count();
    if found < MIN_DESCRIPTION_CHARS {
        return Err(ExtractionError::MissingDescription {
            found,
            required: MIN_DESCRIPTION_CHARS,
        });
    }
    Ok(data)
}

/// Fields read from structured data, with page metadata as fallback.
fn baseline(page: &Page, posting: &Value, extracted_on: NaiveDate) -> ScrapedJobData {
    let field = |key: &str| posting.get(key);
    let (description, markup) = normalize_description(field("description"));

    ScrapedJobData {
        title: flatten_field(field("title"))
            .or_else(|| page.meta("og:title"))
            .or_else(|| page.title())
            .unwrap_or_default(),
        company: flatten_field(field("hiringOrganization"))
            .or_else(|| page.meta("og:site_name"))
            .unwrap_or_default(),
        location: flatten_field(field("jobLocation")).unwrap_or_default(),
        salary: normalize_salary(field("baseSalary")),
        description,
        displayed_description: markup,
        date_posted: normalize_date(field("datePosted")),
        date_closing: normalize_date(field("validThrough")),
        date_extracted: Some(extracted_on.format("%Y-%m-%d").to_string()),
        url: page.url.to_string(),
    }
}

fn fill_gap<F>(slot: &mut String, dom: F)
where
    F: FnOnce() -> Option<String>,
{
    if slot.trim().is_empty() {
        if let Some(found) = dom() {
            *slot = found;
        }
    }
}
