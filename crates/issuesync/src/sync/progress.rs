//! Progress reporting from the drive loop to the job row.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::store;

use super::types::SyncProgress;

/// Receives per-page counter deltas for a running job.
///
/// Implementations must not fail the job: write errors are theirs to log
/// and recover from.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn update(&self, job_id: Uuid, delta: &SyncProgress);

    /// Called once the job's terminal state is written. Any delta still
    /// held for `job_id` is superseded by that write.
    async fn finish(&self, _job_id: Uuid) {}
}

type PendingSlot = Arc<Mutex<SyncProgress>>;

/// Sink that merges deltas into the persisted `sync_jobs` row.
///
/// A delta whose write fails is kept and folded into the next write for the
/// same job, so persisted totals only ever lag, never lose, progress. Each
/// job has its own slot; a slow write for one job never holds up another.
#[derive(Debug)]
pub struct JobProgressSink {
    db: DatabaseConnection,
    pending: StdMutex<HashMap<Uuid, PendingSlot>>,
}

impl JobProgressSink {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            pending: StdMutex::new(HashMap::new()),
        }
    }

    /// Delta not yet written for `job_id`, if any.
    pub async fn pending(&self, job_id: Uuid) -> Option<SyncProgress> {
        let slot = self.slots().get(&job_id).cloned()?;
        let delta = slot.lock().await;
        (!delta.is_empty()).then(|| delta.clone())
    }

    /// Number of jobs with a slot.
    pub fn tracked_jobs(&self) -> usize {
        self.slots().len()
    }

    fn slots(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, PendingSlot>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn slot(&self, job_id: Uuid) -> PendingSlot {
        self.slots().entry(job_id).or_default().clone()
    }

    /// Drop the slot for `job_id` if nothing is waiting in it.
    fn release_if_empty(&self, job_id: Uuid, slot: &PendingSlot) {
        let mut slots = self.slots();
        if let Some(current) = slots.get(&job_id)
            && Arc::ptr_eq(current, slot)
            && slot.try_lock().is_ok_and(|delta| delta.is_empty())
        {
            slots.remove(&job_id);
        }
    }
}

#[async_trait]
impl ProgressSink for JobProgressSink {
    async fn update(&self, job_id: Uuid, delta: &SyncProgress) {
        let slot = self.slot(job_id);
        {
            // Held across the write so deltas for one job land in order.
            let mut carried = slot.lock().await;

            let mut combined = std::mem::take(&mut *carried);
            combined.merge(delta);
            if !combined.is_empty() {
                match store::jobs::apply_progress(&self.db, job_id, &combined).await {
                    Ok(job) => {
                        tracing::debug!(
                            %job_id,
                            processed = job.issues_processed,
                            errors = job.errors,
                            "progress written"
                        );
                    }
                    Err(e) => {
                        tracing::warn!(
                            %job_id,
                            error = %e,
                            carried = combined.processed,
                            "Failed to write sync progress, will retry with next update"
                        );
                        *carried = combined;
                    }
                }
            }
        }
        self.release_if_empty(job_id, &slot);
    }

    async fn finish(&self, job_id: Uuid) {
        let slot = self.slots().remove(&job_id);
        if let Some(slot) = slot {
            let dropped = slot.lock().await;
            if !dropped.is_empty() {
                tracing::debug!(
                    %job_id,
                    processed = dropped.processed,
                    "unwritten progress superseded by terminal write"
                );
            }
        }
    }
}

/// Sink that drops every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgressSink;

#[async_trait]
impl ProgressSink for NoopProgressSink {
    async fn update(&self, _job_id: Uuid, _delta: &SyncProgress) {}
}
