//! Keepalive for long remote calls.
//!
//! While a job waits on the parse service, a periodic no-op runs so the host
//! does not treat the process as idle and reclaim it mid-flight. The signal is
//! tied to a guard: dropping the guard stops the ticker and releases the
//! registration, whichever way the orchestration routine exits.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct HeartbeatRegistry {
    active: Arc<Mutex<HashMap<Uuid, usize>>>,
}

impl HeartbeatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, usize>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start pinging every `period` on behalf of `job_id`.
    pub fn start(&self, job_id: Uuid, period: Duration) -> Heartbeat {
        *self.lock().entry(job_id).or_insert(0) += 1;

        let task = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // the first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                tracing::debug!(%job_id, "[KeepAlive] ping");
            }
        });
        tracing::debug!(%job_id, "[KeepAlive] started");

        Heartbeat {
            job_id,
            registry: self.clone(),
            task,
        }
    }

    /// Number of live signals held for `job_id`.
    pub fn active_for(&self, job_id: Uuid) -> usize {
        self.lock().get(&job_id).copied().unwrap_or(0)
    }

    pub fn total_active(&self) -> usize {
        self.lock().values().sum()
    }

    fn release(&self, job_id: Uuid) {
        let mut active = self.lock();
        if let Some(count) = active.get_mut(&job_id) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                active.remove(&job_id);
            }
        }
    }
}

/// A running keepalive. Stops on drop.
pub struct Heartbeat {
    job_id: Uuid,
    registry: HeartbeatRegistry,
    task: JoinHandle<()>,
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.task.abort();
        self.registry.release(self.job_id);
        tracing::debug!(job_id = %self.job_id, "[KeepAlive] released");
    }
}
