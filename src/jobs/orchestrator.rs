//! Drives one queued job from `parsing` to `review` or `error`.

use backoff::future::retry_notify;
use backoff::Error as BackoffError;
use backoff::ExponentialBackoff;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::config::ParseMode;
use crate::error::{JobFailure, StoreError};
use crate::jobs::merge::merge;
use crate::models::{Job, JobStatus};
use crate::remote::{RemoteParse, TaskState};
use crate::session::Session;

fn retry_notify_handler<E: std::fmt::Display>(err: E, duration: Duration) {
    tracing::warn!("Result write failed: {}. Retrying in {:.1}s...", err, duration.as_secs_f32());
}

impl Session {
    #[tracing::instrument(skip(self, job, token), fields(job_id = %job.id))]
    pub(crate) async fn drive(&self, mut job: Job, token: CancellationToken) -> Option<Job> {
        let started = Instant::now();
        let outcome = {
            // keepalive covers the remote work only, not the final write
            let _beat = self
                .inner
                .heartbeats
                .start(job.id, self.inner.config.keepalive_interval);
            self.enrich(&mut job, &token).await
        };

        match outcome {
            Ok(remote) => {
                let parsed = merge(remote, &job.scraped_meta);
                job.complete(parsed);
                tracing::info!("Parsed in {:.1}s", started.elapsed().as_secs_f64());
            }
            Err(JobFailure::Cancelled) => {
                tracing::info!("Abandoned, queue was cleared");
                self.forget(job.id);
                return None;
            }
            Err(failure) => {
                tracing::warn!("Job failed: {}", failure);
                job.fail(failure.to_string());
            }
        }

        if token.is_cancelled() {
            self.forget(job.id);
            return None;
        }

        let written = self.persist_result(&job).await;
        self.forget(job.id);
        match written {
            Ok(true) => Some(job),
            Ok(false) => {
                tracing::warn!("Job no longer in the queue, result dropped");
                None
            }
            Err(e) => {
                tracing::error!("Failed to persist job result, giving up: {}", e);
                None
            }
        }
    }

    /// Final `parsing` -> `review`/`error` write. Store errors are retried
    /// until the configured window runs out; a row that moved on is final.
    async fn persist_result(&self, job: &Job) -> Result<bool, StoreError> {
        let window = self.inner.config.store_retry_window;
        let backoff = ExponentialBackoff {
            initial_interval: (window / 10).min(Duration::from_millis(500)),
            max_elapsed_time: Some(window),
            ..ExponentialBackoff::default()
        };
        retry_notify(
            backoff,
            || async { self.inner.store.transition(job, JobStatus::Parsing).await.map_err(BackoffError::transient) },
            retry_notify_handler,
        )
        .await
    }

    async fn enrich(&self, job: &mut Job, token: &CancellationToken) -> Result<RemoteParse, JobFailure> {
        match self.inner.config.parse_mode {
            ParseMode::Sync => self.parse_sync(&job.original_text, token).await,
            ParseMode::Poll => {
                let task_id = tokio::select! {
                    biased;
                    _ = token.cancelled() => return Err(JobFailure::Cancelled),
                    started = self.inner.parser.start(&job.original_text) => started?,
                };
                tracing::info!(%task_id, "Remote parse task started");

                job.remote_task_id = Some(task_id.clone());
                match self.inner.store.transition(job, JobStatus::Parsing).await {
                    Ok(true) => {}
                    Ok(false) => return Err(JobFailure::Cancelled),
                    Err(e) => tracing::warn!("Could not record remote task id: {}", e),
                }

                self.poll_until_done(&task_id, token).await
            }
        }
    }

    async fn parse_sync(&self, text: &str, token: &CancellationToken) -> Result<RemoteParse, JobFailure> {
        let limit = self.inner.config.parse_timeout;
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(JobFailure::Cancelled),
            result = tokio::time::timeout(limit, self.inner.parser.parse(text)) => match result {
                Ok(parsed) => Ok(parsed?),
                Err(_) => Err(JobFailure::Timeout(limit)),
            },
        }
    }

    /// Wait one interval, then check; repeat up to the configured number of
    /// checks. A failed check is retried on the next round.
    async fn poll_until_done(&self, task_id: &str, token: &CancellationToken) -> Result<RemoteParse, JobFailure> {
        let interval = self.inner.config.poll_interval;
        let max_attempts = self.inner.config.poll_max_attempts;

        for attempt in 1..=max_attempts {
            tokio::select! {
                biased;
                _ = token.cancelled() => return Err(JobFailure::Cancelled),
                _ = tokio::time::sleep(interval) => {}
            }

            let report = match self.inner.parser.status(task_id).await {
                Ok(report) => report,
                Err(e) => {
                    tracing::warn!(attempt, "Status check failed, retrying: {}", e);
                    continue;
                }
            };

            match report.status {
                TaskState::Queued | TaskState::Processing => {
                    tracing::debug!(attempt, status = ?report.status, "Still waiting on parse task");
                }
                TaskState::Finished => {
                    return report
                        .data
                        .ok_or_else(|| JobFailure::TaskFailed("finished without a result".to_string()));
                }
                TaskState::Failed => {
                    let message = report.error.unwrap_or_else(|| "unknown error".to_string());
                    return Err(JobFailure::TaskFailed(message));
                }
                TaskState::NotFound => return Err(JobFailure::TaskLost(task_id.to_string())),
            }
        }

        Err(JobFailure::PollExhausted(max_attempts))
    }
}
