//! Process-lifetime state shared by every job: the store, the remote services,
//! keepalive bookkeeping and per-job cancellation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::Config;
use crate::error::StoreError;
use crate::jobs::heartbeat::HeartbeatRegistry;
use crate::models::{Job, ScrapedJobData, Stats};
use crate::remote::{ParseService, UpsertService};
use crate::store::JobStore;

/// Created once at start-up and torn down with [`Session::shutdown`]. Cheap to
/// clone; clones share everything.
#[derive(Clone)]
pub struct Session {
    pub(crate) inner: Arc<SessionInner>,
}

pub(crate) struct SessionInner {
    pub(crate) config: Config,
    pub(crate) store: JobStore,
    pub(crate) parser: Arc<dyn ParseService>,
    pub(crate) upserter: Arc<dyn UpsertService>,
    pub(crate) heartbeats: HeartbeatRegistry,
    in_flight: Mutex<HashMap<Uuid, CancellationToken>>,
    closed: CancellationToken,
}

impl Session {
    pub fn start(
        config: Config,
        store: JobStore,
        parser: Arc<dyn ParseService>,
        upserter: Arc<dyn UpsertService>,
    ) -> Self {
        tracing::info!(mode = ?config.parse_mode, "Session started");
        Session {
            inner: Arc::new(SessionInner {
                config,
                store,
                parser,
                upserter,
                heartbeats: HeartbeatRegistry::new(),
                in_flight: Mutex::new(HashMap::new()),
                closed: CancellationToken::new(),
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn store(&self) -> &JobStore {
        &self.inner.store
    }

    pub fn heartbeats(&self) -> HeartbeatRegistry {
        self.inner.heartbeats.clone()
    }

    fn tokens(&self) -> MutexGuard<'_, HashMap<Uuid, CancellationToken>> {
        self.inner.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a new job in the queue without starting it.
    pub async fn create(&self, scraped: ScrapedJobData) -> Result<Job, StoreError> {
        let job = Job::new(scraped);
        self.inner.store.insert(&job).await?;
        tracing::info!(job_id = %job.id, title = %job.scraped_meta.title, "Job queued");
        Ok(job)
    }

    /// Queue a job and start enriching it in the background.
    pub async fn submit(&self, scraped: ScrapedJobData) -> Result<Job, StoreError> {
        let job = self.create(scraped).await?;
        let session = self.clone();
        let queued = job.clone();
        tokio::spawn(async move {
            session.run(queued).await;
        });
        Ok(job)
    }

    /// Orchestrate an already-queued job to a terminal state.
    ///
    /// Returns the job as persisted, or `None` if the queue was cleared (or the
    /// session shut down) while it was in flight, in which case nothing is written.
    pub async fn run(&self, job: Job) -> Option<Job> {
        let token = self.inner.closed.child_token();
        self.tokens().insert(job.id, token.clone());
        self.drive(job, token).await
    }

    pub(crate) fn forget(&self, job_id: Uuid) {
        self.tokens().remove(&job_id);
    }

    /// Jobs currently being orchestrated.
    pub fn in_flight(&self) -> usize {
        self.tokens().len()
    }

    fn cancel_all(&self) {
        for (job_id, token) in self.tokens().drain() {
            tracing::info!(%job_id, "Cancelling in-flight job");
            token.cancel();
        }
    }

    /// Empty the queue. In-flight jobs are cancelled first so none of them
    /// writes a result afterwards.
    pub async fn clear(&self) -> Result<u64, StoreError> {
        self.cancel_all();
        let removed = self.inner.store.clear().await?;
        tracing::info!("Cleared {} jobs", removed);
        Ok(removed)
    }

    pub async fn jobs(&self) -> Result<Vec<Job>, StoreError> {
        self.inner.store.all().await
    }

    pub async fn job(&self, id: Uuid) -> Result<Option<Job>, StoreError> {
        self.inner.store.get(id).await
    }

    pub async fn stats(&self) -> Result<Stats, StoreError> {
        self.inner.store.stats().await
    }

    /// Stop everything still in flight. Jobs left in `parsing` stay that way
    /// in the store.
    pub fn shutdown(&self) {
        tracing::info!("Session shutting down ({} jobs in flight)", self.in_flight());
        self.inner.closed.cancel();
        self.cancel_all();
    }
}
