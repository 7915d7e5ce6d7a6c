//! The save flow: a reviewed job, amended by the user, goes to the backend and
//! is marked saved.

use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::SaveError;
use crate::extract::flatten::date_only;
use crate::models::{Feature, Job, JobStatus, ParsedResult};
use crate::remote::UpsertPayload;
use crate::session::Session;

/// Fields the user may amend before saving. Anything left out keeps the
/// reviewed value.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct JobEdit {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub salary_range: Option<String>,
    #[serde(default)]
    pub job_url: Option<String>,
    #[serde(default)]
    pub date_posted: Option<String>,
    #[serde(default)]
    pub date_closing: Option<String>,
    #[serde(default)]
    pub date_extracted: Option<String>,
    #[serde(default)]
    pub features: Option<Vec<Feature>>,
}

fn normalize_date(edited: Option<String>, reviewed: &Option<String>) -> Option<String> {
    edited.or_else(|| reviewed.clone()).as_deref().and_then(date_only)
}

/// Combine the edit with the reviewed record. Descriptions always come from
/// the reviewed record.
pub fn build_payload(edit: JobEdit, parsed: &ParsedResult) -> UpsertPayload {
    let features = edit
        .features
        .unwrap_or_else(|| parsed.features.clone())
        .into_iter()
        .filter_map(|feature| {
            let description = feature.description.trim();
            (!description.is_empty()).then(|| Feature {
                kind: feature.kind,
                description: description.to_string(),
            })
        })
        .collect();

    UpsertPayload {
        title: edit.title.unwrap_or_else(|| parsed.title.clone()),
        company: edit.company.unwrap_or_else(|| parsed.company.clone()),
        location: edit.location.unwrap_or_else(|| parsed.location.clone()),
        salary_range: edit
            .salary_range
            .or_else(|| parsed.salary_range.clone())
            .unwrap_or_default(),
        job_url: edit.job_url.unwrap_or_else(|| parsed.job_url.clone()),
        date_posted: normalize_date(edit.date_posted, &parsed.date_posted),
        date_closing: normalize_date(edit.date_closing, &parsed.date_closing),
        date_extracted: normalize_date(edit.date_extracted, &parsed.date_extracted),
        description: parsed.description.clone(),
        displayed_description: parsed.displayed_description.clone(),
        features,
    }
}

impl Session {
    /// Send a reviewed job to the backend and mark it saved. On any failure
    /// the job stays in review.
    #[tracing::instrument(skip(self, edit))]
    pub async fn save(&self, id: Uuid, edit: JobEdit) -> Result<Job, SaveError> {
        let store = &self.inner.store;
        let mut job = store
            .get(id)
            .await?
            .ok_or_else(|| SaveError::NotFound(id.to_string()))?;

        let parsed = match (&job.status, &job.parsed_result) {
            (JobStatus::Review, Some(parsed)) => parsed,
            _ => return Err(SaveError::NotReviewable(job.status)),
        };
        let duration = parsed.generation_time_sec();
        let payload = build_payload(edit, parsed);

        if let Err(e) = self.inner.upserter.upsert(&payload).await {
            tracing::error!("Upsert rejected: {}", e);
            return Err(e.into());
        }

        job.mark_saved();
        if !store.transition(&job, JobStatus::Review).await? {
            // cleared, or saved by someone else in the meantime
            return match store.get(id).await? {
                Some(current) => Err(SaveError::NotReviewable(current.status)),
                None => Err(SaveError::NotFound(id.to_string())),
            };
        }
        tracing::info!(title = %payload.title, "Job saved");

        if let Some(seconds) = duration {
            match store.record_duration(seconds).await {
                Ok(stats) => tracing::debug!(count = stats.count, avg = stats.avg_time_sec, "Estimator updated"),
                Err(e) => tracing::warn!("Failed to update estimator: {}", e),
            }
        }

        Ok(job)
    }
}
