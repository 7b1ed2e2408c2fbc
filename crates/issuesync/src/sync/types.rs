//! Sync request, option, progress and result types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::entity::sync_job::Model as SyncJobModel;
use crate::entity::sync_job_status::SyncJobStatus;
use crate::platform::RemoteIssueState;

use super::error::ValidationError;

/// Sync options as they arrive from a caller, before validation.
///
/// ```json
/// { "states": ["OPEN"], "since": "2026-01-01T00:00:00Z", "batchSize": 25 }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub states: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<i64>,
}

impl SyncRequest {
    /// Validate into immutable [`SyncOptions`].
    ///
    /// States must be exactly `OPEN` or `CLOSED`; duplicates collapse.
    /// `since` must be RFC 3339. `batchSize` must lie in
    /// `1..=config.max_batch_size`.
    pub fn validate(&self, config: &EngineConfig) -> Result<SyncOptions, ValidationError> {
        let mut states = Vec::new();
        for raw in self.states.iter().flatten() {
            let state = match raw.as_str() {
                "OPEN" => RemoteIssueState::Open,
                "CLOSED" => RemoteIssueState::Closed,
                other => return Err(ValidationError::InvalidState(other.to_string())),
            };
            if !states.contains(&state) {
                states.push(state);
            }
        }

        let since = self
            .since
            .as_deref()
            .map(|s| {
                DateTime::parse_from_rfc3339(s)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|_| ValidationError::InvalidSince(s.to_string()))
            })
            .transpose()?;

        let batch_size = match self.batch_size {
            None => config.default_batch_size,
            Some(n) if n >= 1 && n <= i64::from(config.max_batch_size) => n as u32,
            Some(n) => {
                return Err(ValidationError::BatchSizeOutOfRange {
                    value: n,
                    max: config.max_batch_size,
                });
            }
        };

        Ok(SyncOptions {
            states,
            since,
            batch_size,
        })
    }
}

/// Validated, immutable options for one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOptions {
    /// State filter. Empty means both `OPEN` and `CLOSED`.
    #[serde(default)]
    pub states: Vec<RemoteIssueState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<DateTime<Utc>>,
    pub batch_size: u32,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            states: Vec::new(),
            since: None,
            batch_size: crate::config::DEFAULT_BATCH_SIZE,
        }
    }
}

/// Counter delta (per page) or running totals (per job).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncProgress {
    pub processed: u32,
    pub created: u32,
    pub updated: u32,
    pub errors: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub error_messages: Vec<String>,
}

impl SyncProgress {
    /// Record one error, counting it and keeping its message.
    pub fn record_error(&mut self, message: impl Into<String>) {
        self.errors += 1;
        self.error_messages.push(message.into());
    }

    /// Fold `other` into `self`.
    pub fn merge(&mut self, other: &SyncProgress) {
        self.processed += other.processed;
        self.created += other.created;
        self.updated += other.updated;
        self.errors += other.errors;
        self.error_messages
            .extend(other.error_messages.iter().cloned());
    }

    /// Whether this delta carries nothing to write.
    pub fn is_empty(&self) -> bool {
        self.processed == 0
            && self.created == 0
            && self.updated == 0
            && self.errors == 0
            && self.error_messages.is_empty()
    }

    /// Copy of the counters without the message list.
    pub fn counters(&self) -> SyncProgress {
        SyncProgress {
            error_messages: Vec::new(),
            ..self.clone()
        }
    }

    /// Human-readable one-line summary.
    pub fn summary(&self) -> String {
        format!(
            "Processed {} issues: {} created, {} updated, {} errors",
            self.processed, self.created, self.updated, self.errors
        )
    }
}

/// Outcome of one drive loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncResult {
    pub job_id: Uuid,
    pub status: SyncJobStatus,
    pub totals: SyncProgress,
    /// `true` when the job completed, even with recorded errors.
    pub success: bool,
    pub summary: String,
    /// The fatal error that aborted the loop, if any.
    pub fatal: Option<String>,
}

impl SyncResult {
    pub fn completed(job_id: Uuid, totals: SyncProgress) -> Self {
        Self {
            job_id,
            status: SyncJobStatus::Completed,
            summary: totals.summary(),
            totals,
            success: true,
            fatal: None,
        }
    }

    pub fn failed(job_id: Uuid, totals: SyncProgress, fatal: impl Into<String>) -> Self {
        let fatal = fatal.into();
        Self {
            job_id,
            status: SyncJobStatus::Failed,
            summary: format!("Sync failed: {fatal}. {}", totals.summary()),
            totals,
            success: false,
            fatal: Some(fatal),
        }
    }
}

/// Read-only view of a job for status polling.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusView {
    pub job_id: Uuid,
    pub repository_id: Uuid,
    pub status: SyncJobStatus,
    pub issues_processed: i32,
    pub issues_created: i32,
    pub issues_updated: i32,
    pub errors: i32,
    pub error_details: Vec<String>,
    pub options: SyncOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_progress: Option<SyncProgress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobStatusView {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

impl From<SyncJobModel> for JobStatusView {
    fn from(job: SyncJobModel) -> Self {
        Self {
            job_id: job.id,
            repository_id: job.repository_id,
            status: job.status,
            issues_processed: job.issues_processed,
            issues_created: job.issues_created,
            issues_updated: job.issues_updated,
            errors: job.errors,
            error_details: job.error_details.0,
            options: job.metadata.options,
            last_progress: job.metadata.last_progress,
            summary: job.metadata.summary,
            created_by: job.created_by,
            created_at: job.created_at.with_timezone(&Utc),
            updated_at: job.updated_at.with_timezone(&Utc),
            completed_at: job.completed_at.map(|t| t.with_timezone(&Utc)),
        }
    }
}
