//! Sync job rows.
//!
//! The engine is the only writer: admission creates the row already in
//! `running`, progress merges counter deltas, and one terminal write moves
//! it to `completed` or `failed`. Terminal rows are never modified again.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::entity::job_metadata::{ErrorDetails, JobMetadata};
use crate::entity::sync_job::{ActiveModel, Column, Entity as SyncJob, Model};
use crate::entity::sync_job_status::{SyncJobStatus, SyncJobType};
use crate::retry::RetryConfig;
use crate::sync::{SyncProgress, SyncResult};

use super::errors::{Result, StoreError};

// ─── Admission ───────────────────────────────────────────────────────────────

/// Create a job in `running` status unless one is already running for the
/// repository.
///
/// The check and the insert share one transaction, and the partial unique
/// index on running jobs rejects a concurrent insert that slips past the
/// check. Either way the loser gets `StoreError::AlreadyRunning` and no row
/// is written.
pub async fn create_if_not_running(
    db: &DatabaseConnection,
    repository_id: Uuid,
    created_by: &str,
    metadata: JobMetadata,
) -> Result<Model> {
    let txn = db.begin().await?;

    let running = SyncJob::find()
        .filter(Column::RepositoryId.eq(repository_id))
        .filter(Column::Status.eq(SyncJobStatus::Running))
        .one(&txn)
        .await?;
    if let Some(running) = running {
        tracing::debug!(%repository_id, job_id = %running.id, "sync already running");
        return Err(StoreError::AlreadyRunning { repository_id });
    }

    let now = Utc::now().fixed_offset();
    let job = ActiveModel {
        id: Set(Uuid::new_v4()),
        repository_id: Set(repository_id),
        job_type: Set(SyncJobType::Issues),
        status: Set(SyncJobStatus::Running),
        issues_processed: Set(0),
        issues_created: Set(0),
        issues_updated: Set(0),
        errors: Set(0),
        error_details: Set(ErrorDetails::default()),
        metadata: Set(metadata),
        created_by: Set(created_by.to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        completed_at: Set(None),
    };

    let job = job
        .insert(&txn)
        .await
        .map_err(|e| already_running_on_conflict(e.into(), repository_id))?;
    txn.commit()
        .await
        .map_err(|e| already_running_on_conflict(e.into(), repository_id))?;

    Ok(job)
}

fn already_running_on_conflict(err: StoreError, repository_id: Uuid) -> StoreError {
    if err.is_unique_violation() {
        StoreError::AlreadyRunning { repository_id }
    } else {
        err
    }
}

// ─── Queries ─────────────────────────────────────────────────────────────────

/// Find a job by its UUID.
pub async fn find_by_id(db: &DatabaseConnection, id: Uuid) -> Result<Option<Model>> {
    SyncJob::find_by_id(id)
        .one(db)
        .await
        .map_err(StoreError::from)
}

/// Find the running job for a repository, if any.
pub async fn find_running(db: &DatabaseConnection, repository_id: Uuid) -> Result<Option<Model>> {
    SyncJob::find()
        .filter(Column::RepositoryId.eq(repository_id))
        .filter(Column::Status.eq(SyncJobStatus::Running))
        .one(db)
        .await
        .map_err(StoreError::from)
}

/// Most recent jobs for a repository, newest first.
pub async fn list_by_repository(
    db: &DatabaseConnection,
    repository_id: Uuid,
    limit: u64,
) -> Result<Vec<Model>> {
    SyncJob::find()
        .filter(Column::RepositoryId.eq(repository_id))
        .order_by_desc(Column::CreatedAt)
        .limit(limit)
        .all(db)
        .await
        .map_err(StoreError::from)
}

async fn require(db: &DatabaseConnection, job_id: Uuid) -> Result<Model> {
    find_by_id(db, job_id)
        .await?
        .ok_or_else(|| StoreError::job_not_found(job_id))
}

fn to_i32(n: u32) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

fn snapshot(job: &Model) -> SyncProgress {
    SyncProgress {
        processed: job.issues_processed.max(0) as u32,
        created: job.issues_created.max(0) as u32,
        updated: job.issues_updated.max(0) as u32,
        errors: job.errors.max(0) as u32,
        error_messages: Vec::new(),
    }
}

// ─── Writes ──────────────────────────────────────────────────────────────────

/// Merge a counter delta into a running job.
///
/// Adds the counters, appends the error messages and refreshes the
/// `last_progress` snapshot. Terminal jobs are returned unchanged.
pub async fn apply_progress(
    db: &DatabaseConnection,
    job_id: Uuid,
    delta: &SyncProgress,
) -> Result<Model> {
    let job = require(db, job_id).await?;
    if job.status.is_terminal() {
        tracing::debug!(%job_id, status = %job.status, "ignoring progress for finished job");
        return Ok(job);
    }

    let mut details = job.error_details.clone();
    details.extend(delta.error_messages.iter().cloned());

    let mut merged = job.clone();
    merged.issues_processed = job.issues_processed.saturating_add(to_i32(delta.processed));
    merged.issues_created = job.issues_created.saturating_add(to_i32(delta.created));
    merged.issues_updated = job.issues_updated.saturating_add(to_i32(delta.updated));
    merged.errors = job.errors.saturating_add(to_i32(delta.errors));

    let mut metadata = job.metadata.clone();
    metadata.last_progress = Some(snapshot(&merged));

    let mut active = job.into_active_model();
    active.issues_processed = Set(merged.issues_processed);
    active.issues_created = Set(merged.issues_created);
    active.issues_updated = Set(merged.issues_updated);
    active.errors = Set(merged.errors);
    active.error_details = Set(details);
    active.metadata = Set(metadata);
    active.updated_at = Set(Utc::now().fixed_offset());

    active.update(db).await.map_err(StoreError::from)
}

/// Write the terminal state of a job from the drive loop's result.
///
/// Counters, error details and summary come from `result` and replace
/// whatever progress writes left behind. A job that is already terminal is
/// returned unchanged.
pub async fn finalize(db: &DatabaseConnection, job_id: Uuid, result: &SyncResult) -> Result<Model> {
    if !result.status.is_terminal() {
        return Err(StoreError::invalid_input(format!(
            "cannot finalize job with non-terminal status {}",
            result.status
        )));
    }

    let job = require(db, job_id).await?;
    if job.status.is_terminal() {
        tracing::warn!(%job_id, status = %job.status, "job already finished, terminal write skipped");
        return Ok(job);
    }

    let totals = &result.totals;
    let mut metadata = job.metadata.clone();
    metadata.last_progress = Some(totals.counters());
    metadata.summary = Some(result.summary.clone());

    let now = Utc::now().fixed_offset();
    let mut active = job.into_active_model();
    active.status = Set(result.status);
    active.issues_processed = Set(to_i32(totals.processed));
    active.issues_created = Set(to_i32(totals.created));
    active.issues_updated = Set(to_i32(totals.updated));
    active.errors = Set(to_i32(totals.errors));
    active.error_details = Set(ErrorDetails(totals.error_messages.clone()));
    active.metadata = Set(metadata);
    active.updated_at = Set(now);
    active.completed_at = Set(Some(now));

    active.update(db).await.map_err(StoreError::from)
}

/// Mark a job failed without loop totals (the loop died before producing
/// them). Keeps persisted counters and appends `message` to the errors.
pub async fn mark_failed(db: &DatabaseConnection, job_id: Uuid, message: &str) -> Result<Model> {
    let job = require(db, job_id).await?;
    if job.status.is_terminal() {
        return Ok(job);
    }

    let mut totals = snapshot(&job);
    totals.error_messages = job.error_details.0.clone();
    totals.record_error(message);

    finalize(db, job_id, &SyncResult::failed(job_id, totals, message)).await
}

/// [`finalize`] with retries on transient database errors.
///
/// The terminal write is the one write that must land, so lock contention
/// or a dropped connection is retried along `retry`'s backoff.
pub async fn finalize_with_retry(
    db: &DatabaseConnection,
    job_id: Uuid,
    result: &SyncResult,
    retry: &RetryConfig,
) -> Result<Model> {
    let mut delays = retry.delays();
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        match finalize(db, job_id, result).await {
            Ok(job) => return Ok(job),
            Err(e) if e.is_retryable() => match delays.next() {
                Some(delay) => {
                    tracing::warn!(
                        %job_id,
                        attempt,
                        backoff_ms = delay.as_millis() as u64,
                        error = %e,
                        "Terminal write failed, retrying..."
                    );
                    tokio::time::sleep(delay).await;
                }
                None => return Err(e),
            },
            Err(e) => return Err(e),
        }
    }
}
