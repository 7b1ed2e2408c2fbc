//! Mapping remote issue records onto local issue rows.
//!
//! Remote-sourced columns (title, body, linked pull request, status) follow
//! the remote. Locally owned columns (assignee, priority, expanded
//! description, author, project) are written once on insert and never again.

use std::fmt;

use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{ActiveValue, DatabaseConnection, IntoActiveModel, Set};
use uuid::Uuid;

use crate::entity::issue::{ActiveModel as IssueActiveModel, Model as IssueModel};
use crate::entity::issue_priority::IssuePriority;
use crate::entity::issue_status::IssueStatus;
use crate::platform::{PullRequestState, RemoteIssueRecord, RemoteIssueState};
use crate::store::{self, StoreError};

use super::types::SyncProgress;

/// A record that could not be reconciled. The record is skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordError {
    pub remote_id: i64,
    pub number: i64,
    pub message: String,
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "issue #{} (remote id {}): {}",
            self.number, self.remote_id, self.message
        )
    }
}

/// Counts for one batch of records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub created: u32,
    pub updated: u32,
    pub unchanged: u32,
    pub errors: Vec<RecordError>,
}

impl ReconcileOutcome {
    /// Records looked at, including failed ones.
    pub fn processed(&self) -> u32 {
        self.created + self.updated + self.unchanged + self.errors.len() as u32
    }

    /// Progress delta for this batch.
    pub fn to_progress(&self) -> SyncProgress {
        let mut delta = SyncProgress {
            processed: self.processed(),
            created: self.created,
            updated: self.updated,
            ..Default::default()
        };
        for error in &self.errors {
            delta.record_error(error.to_string());
        }
        delta
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Change {
    Created,
    Updated,
    Unchanged,
}

/// Local status implied by remote state alone.
///
/// A closed issue whose closing pull request is still open is in review.
pub fn map_status(state: RemoteIssueState, record: &RemoteIssueRecord) -> IssueStatus {
    match state {
        RemoteIssueState::Open => IssueStatus::Open,
        RemoteIssueState::Closed => match &record.linked_pull_request {
            Some(pr) if pr.state == PullRequestState::Open => IssueStatus::Review,
            _ => IssueStatus::Completed,
        },
    }
}

/// Status to store for an existing row.
///
/// Terminal local statuses (`completed`, `cancelled`) are never reverted.
/// While the remote issue is open, local `in_progress` and `review` survive;
/// otherwise the mapped status wins.
pub fn merge_status(local: IssueStatus, state: RemoteIssueState, mapped: IssueStatus) -> IssueStatus {
    match (local, state) {
        (IssueStatus::Completed | IssueStatus::Cancelled, _) => local,
        (IssueStatus::InProgress | IssueStatus::Review, RemoteIssueState::Open) => local,
        _ => mapped,
    }
}

/// `completed_at` consistent with `status`: kept if already set, else the
/// remote close time, else now. Cleared for any other status.
fn completed_at_for(
    status: IssueStatus,
    existing: Option<DateTime<FixedOffset>>,
    record: &RemoteIssueRecord,
    now: DateTime<FixedOffset>,
) -> Option<DateTime<FixedOffset>> {
    if status != IssueStatus::Completed {
        return None;
    }
    existing.or_else(|| record.closed_at.map(|t| t.fixed_offset())).or(Some(now))
}

/// Reconciles batches of remote records for one repository.
#[derive(Debug, Clone)]
pub struct RecordReconciler {
    db: DatabaseConnection,
    repository_id: Uuid,
    project_id: Uuid,
    /// Author recorded on inserted rows.
    created_by: String,
}

impl RecordReconciler {
    pub fn new(
        db: DatabaseConnection,
        repository_id: Uuid,
        project_id: Uuid,
        created_by: impl Into<String>,
    ) -> Self {
        Self {
            db,
            repository_id,
            project_id,
            created_by: created_by.into(),
        }
    }

    /// Insert or update each record in order. Failures are collected per
    /// record and never abort the batch.
    pub async fn reconcile(&self, records: &[RemoteIssueRecord]) -> ReconcileOutcome {
        let mut outcome = ReconcileOutcome::default();

        for record in records {
            match self.reconcile_one(record).await {
                Ok(Change::Created) => outcome.created += 1,
                Ok(Change::Updated) => outcome.updated += 1,
                Ok(Change::Unchanged) => outcome.unchanged += 1,
                Err(message) => {
                    let error = RecordError {
                        remote_id: record.remote_id,
                        number: record.number,
                        message,
                    };
                    tracing::warn!(repository_id = %self.repository_id, %error, "record skipped");
                    outcome.errors.push(error);
                }
            }
        }

        tracing::debug!(
            repository_id = %self.repository_id,
            created = outcome.created,
            updated = outcome.updated,
            unchanged = outcome.unchanged,
            errors = outcome.errors.len(),
            "batch reconciled"
        );
        outcome
    }

    async fn reconcile_one(&self, record: &RemoteIssueRecord) -> Result<Change, String> {
        let state: RemoteIssueState = record.state.parse().map_err(|e| format!("{e}"))?;
        if record.title.trim().is_empty() {
            return Err("empty title".to_string());
        }

        let existing =
            store::issues::find_by_remote_id(&self.db, self.repository_id, record.remote_id)
                .await
                .map_err(store_message)?;

        match existing {
            None => {
                let model = self.new_row(state, record);
                store::issues::insert(&self.db, model)
                    .await
                    .map_err(store_message)?;
                Ok(Change::Created)
            }
            Some(row) => match remote_patch(row, state, record) {
                Some(patch) => {
                    store::issues::update(&self.db, patch)
                        .await
                        .map_err(store_message)?;
                    Ok(Change::Updated)
                }
                None => Ok(Change::Unchanged),
            },
        }
    }

    fn new_row(&self, state: RemoteIssueState, record: &RemoteIssueRecord) -> IssueActiveModel {
        let now = Utc::now().fixed_offset();
        let status = map_status(state, record);
        let pr = record.linked_pull_request.as_ref();

        IssueActiveModel {
            id: Set(Uuid::new_v4()),
            project_id: Set(self.project_id),
            repository_id: Set(self.repository_id),
            remote_issue_number: Set(Some(record.number)),
            remote_issue_id: Set(Some(record.remote_id)),
            title: Set(record.title.clone()),
            original_description: Set(record.body.clone()),
            expanded_description: Set(None),
            status: Set(status),
            priority: Set(IssuePriority::Medium),
            created_by: Set(self.created_by.clone()),
            // Remote logins are not local user ids.
            assigned_to: Set(None),
            remote_pr_number: Set(pr.map(|p| p.number)),
            remote_pr_id: Set(pr.map(|p| p.id)),
            created_at: Set(record.created_at.fixed_offset()),
            updated_at: Set(now),
            completed_at: Set(completed_at_for(status, None, record, now)),
        }
    }
}

fn store_message(err: StoreError) -> String {
    err.to_string()
}

/// Active model touching only the remote-sourced columns that differ from
/// `row`, or `None` when nothing changed.
fn remote_patch(
    row: IssueModel,
    state: RemoteIssueState,
    record: &RemoteIssueRecord,
) -> Option<IssueActiveModel> {
    let now = Utc::now().fixed_offset();
    let status = merge_status(row.status, state, map_status(state, record));
    let completed_at = if status == IssueStatus::Cancelled {
        row.completed_at
    } else {
        completed_at_for(status, row.completed_at, record, now)
    };
    let pr = record.linked_pull_request.as_ref();

    let mut patch = row.clone().into_active_model();
    let mut changed = false;

    fn assign<T: PartialEq + Into<sea_orm::Value>>(
        slot: &mut ActiveValue<T>,
        current: &T,
        next: T,
        changed: &mut bool,
    ) {
        if *current != next {
            *slot = Set(next);
            *changed = true;
        }
    }

    assign(&mut patch.title, &row.title, record.title.clone(), &mut changed);
    assign(
        &mut patch.original_description,
        &row.original_description,
        record.body.clone(),
        &mut changed,
    );
    assign(
        &mut patch.remote_issue_number,
        &row.remote_issue_number,
        Some(record.number),
        &mut changed,
    );
    assign(
        &mut patch.remote_pr_number,
        &row.remote_pr_number,
        pr.map(|p| p.number),
        &mut changed,
    );
    assign(
        &mut patch.remote_pr_id,
        &row.remote_pr_id,
        pr.map(|p| p.id),
        &mut changed,
    );
    assign(&mut patch.status, &row.status, status, &mut changed);
    assign(
        &mut patch.completed_at,
        &row.completed_at,
        completed_at,
        &mut changed,
    );

    if !changed {
        return None;
    }
    patch.updated_at = Set(now);
    Some(patch)
}
