//! Job admission and the detached drive loop.

use std::sync::Arc;

use sea_orm::DatabaseConnection;
use tokio::task::{JoinError, JoinHandle};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::entity::job_metadata::JobMetadata;
use crate::entity::repository::Model as RepositoryModel;
use crate::entity::sync_job::Model as SyncJobModel;
use crate::platform::{IssueQuery, IssueSource, short_error_message};
use crate::store;

use super::error::{PagerError, Result, SyncError, ValidationError};
use super::pager::{RemotePage, RemotePager};
use super::progress::{JobProgressSink, ProgressSink};
use super::rate_gate::RateGate;
use super::reconcile::RecordReconciler;
use super::types::{JobStatusView, SyncOptions, SyncProgress, SyncRequest, SyncResult};

/// Path a caller polls for the state of `job_id`.
pub fn status_poll_url(repository_id: Uuid, job_id: Uuid) -> String {
    format!("/api/repositories/{repository_id}/sync/status?jobId={job_id}")
}

/// An admitted job.
///
/// The job row is already `running` when this is returned. Dropping
/// `handle` detaches the job; awaiting it yields the terminal result.
#[derive(Debug)]
#[must_use = "the handle can be dropped to detach, but the job id is needed to poll"]
pub struct StartedSync {
    pub job_id: Uuid,
    pub status_poll_url: String,
    pub handle: JoinHandle<SyncResult>,
}

/// Everything the drive loop needs for one job.
#[derive(Debug, Clone)]
struct JobContext {
    job_id: Uuid,
    repository: RepositoryModel,
    options: SyncOptions,
    actor_id: String,
}

/// Admits sync jobs and runs each one on its own task.
#[derive(Clone)]
pub struct SyncJobManager {
    db: DatabaseConnection,
    source: Arc<dyn IssueSource>,
    gate: Arc<RateGate>,
    config: EngineConfig,
    sink: Arc<dyn ProgressSink>,
}

impl std::fmt::Debug for SyncJobManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncJobManager")
            .field("gate", &self.gate)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SyncJobManager {
    /// Manager writing progress to the job rows in `db`.
    pub fn new(db: DatabaseConnection, source: Arc<dyn IssueSource>, config: EngineConfig) -> Self {
        let sink = Arc::new(JobProgressSink::new(db.clone()));
        Self {
            gate: Arc::new(RateGate::from_config(&config)),
            db,
            source,
            config,
            sink,
        }
    }

    /// Replace the progress sink.
    pub fn with_progress_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Share a rate gate between managers.
    pub fn with_rate_gate(mut self, gate: Arc<RateGate>) -> Self {
        self.gate = gate;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Admit and launch a sync of `repository_id`.
    ///
    /// Admission errors (`Validation`, `RateLimited`, `NotFound`,
    /// `AlreadyRunning`) are returned before any job row exists. Once a job
    /// is admitted, its outcome is only visible on the job row and through
    /// the returned handle.
    #[tracing::instrument(skip(self, request))]
    pub async fn start(
        &self,
        repository_id: Uuid,
        request: &SyncRequest,
        actor_id: &str,
    ) -> Result<StartedSync> {
        if actor_id.trim().is_empty() {
            return Err(ValidationError::MissingActor.into());
        }
        let options = request.validate(&self.config)?;

        if !self.gate.try_admit(actor_id) {
            let retry_after = self
                .gate
                .retry_after(actor_id)
                .unwrap_or_else(|| self.config.rate_gate_period());
            tracing::debug!(retry_after_ms = retry_after.as_millis() as u64, "sync start throttled");
            return Err(SyncError::RateLimited { retry_after });
        }

        let repository = store::targets::find_repository(&self.db, repository_id)
            .await?
            .ok_or_else(|| SyncError::NotFound(format!("repository {repository_id}")))?;

        let job = store::jobs::create_if_not_running(
            &self.db,
            repository.id,
            actor_id,
            JobMetadata::new(options.clone()),
        )
        .await?;

        tracing::info!(
            job_id = %job.id,
            repo = %repository.full_name,
            batch_size = options.batch_size,
            "Sync job started"
        );

        let context = JobContext {
            job_id: job.id,
            repository,
            options,
            actor_id: actor_id.to_string(),
        };
        let handle = self.spawn_supervised(context);

        Ok(StartedSync {
            job_id: job.id,
            status_poll_url: status_poll_url(repository_id, job.id),
            handle,
        })
    }

    /// Current state of a job, for polling.
    pub async fn status(&self, job_id: Uuid) -> Result<Option<JobStatusView>> {
        Ok(store::jobs::find_by_id(&self.db, job_id)
            .await?
            .map(JobStatusView::from))
    }

    // ─── Task Boundary ───────────────────────────────────────────────────────

    /// Run the job on an inner task watched by an outer one, so a panic in
    /// the loop still ends with a terminal write.
    fn spawn_supervised(&self, context: JobContext) -> JoinHandle<SyncResult> {
        let manager = self.clone();
        let db = self.db.clone();
        let sink = Arc::clone(&self.sink);
        let job_id = context.job_id;

        tokio::spawn(async move {
            let inner = tokio::spawn(async move { manager.run(context).await });
            let result = match inner.await {
                Ok(result) => result,
                Err(e) => {
                    let message = task_failure_message(e);
                    tracing::error!(%job_id, error = %message, "Sync task died");
                    match store::jobs::mark_failed(&db, job_id, &message).await {
                        Ok(job) => SyncResult::failed(job_id, totals_of(&job), message),
                        Err(write_err) => {
                            tracing::error!(
                                %job_id,
                                error = %write_err,
                                "Failed to record sync task failure"
                            );
                            let mut totals = SyncProgress::default();
                            totals.record_error(message.clone());
                            SyncResult::failed(job_id, totals, message)
                        }
                    }
                }
            };
            sink.finish(job_id).await;
            result
        })
    }

    /// Drive the job under the wall-clock limit, then write its terminal
    /// state.
    async fn run(&self, context: JobContext) -> SyncResult {
        let job_id = context.job_id;
        let limit = self.config.job_timeout();
        let mut totals = SyncProgress::default();

        let outcome = match tokio::time::timeout(limit, self.drive(&context, &mut totals)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(SyncError::Timeout { limit }),
        };

        let result = match outcome {
            Ok(()) => SyncResult::completed(job_id, totals),
            Err(e) => {
                tracing::warn!(%job_id, error = %e, "Sync aborted");
                let fatal = e.to_string();
                totals.record_error(fatal.clone());
                SyncResult::failed(job_id, totals, fatal)
            }
        };

        match store::jobs::finalize_with_retry(&self.db, job_id, &result, &self.config.page_retry)
            .await
        {
            Ok(job) => tracing::info!(
                %job_id,
                status = %job.status,
                summary = %result.summary,
                "Sync job finished"
            ),
            Err(e) => tracing::error!(%job_id, error = %e, "Failed to write terminal job state"),
        }
        result
    }

    // ─── Drive Loop ──────────────────────────────────────────────────────────

    #[tracing::instrument(
        skip_all,
        fields(job_id = %context.job_id, repo = %context.repository.full_name)
    )]
    async fn drive(&self, context: &JobContext, totals: &mut SyncProgress) -> Result<()> {
        let repository = &context.repository;
        let (owner, name) = repository.remote_coordinates().ok_or_else(|| {
            SyncError::Configuration(format!(
                "repository {} has no remote owner/name",
                repository.full_name
            ))
        })?;
        let project = store::targets::default_project(&self.db, repository.id)
            .await?
            .ok_or_else(|| {
                SyncError::Configuration(format!(
                    "repository {} has no project to attach issues to",
                    repository.full_name
                ))
            })?;

        let query = IssueQuery {
            owner,
            name,
            states: context.options.states.clone(),
            since: context.options.since,
            page_size: context.options.batch_size,
        };
        let mut pager = RemotePager::new(
            Arc::clone(&self.source),
            query,
            self.config.max_rate_limit_wait(),
        );
        let reconciler = RecordReconciler::new(
            self.db.clone(),
            repository.id,
            project.id,
            context.actor_id.clone(),
        );

        let mut page_number = 0u32;
        loop {
            page_number += 1;
            match self.fetch_with_retry(&mut pager, page_number).await {
                Ok(Some(page)) => {
                    let outcome = reconciler.reconcile(&page.records).await;
                    let delta = outcome.to_progress();
                    totals.merge(&delta);
                    self.sink.update(context.job_id, &delta).await;
                }
                Ok(None) => break,
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => {
                    let mut delta = SyncProgress::default();
                    delta.record_error(format!(
                        "page {page_number}: {}",
                        short_error_message(&e)
                    ));
                    totals.merge(&delta);
                    self.sink.update(context.job_id, &delta).await;

                    match pager.skip_page().await {
                        Ok(true) => continue,
                        Ok(false) => break,
                        Err(skip_err) if skip_err.is_fatal() => return Err(skip_err.into()),
                        Err(skip_err) => {
                            // Without a boundary the rest of the sequence is unreachable.
                            let mut delta = SyncProgress::default();
                            delta.record_error(format!(
                                "page {page_number}: cannot skip past failed page: {skip_err}"
                            ));
                            totals.merge(&delta);
                            self.sink.update(context.job_id, &delta).await;
                            break;
                        }
                    }
                }
            }
        }

        tracing::debug!(
            pages = pager.pages_fetched(),
            waited_ms = pager.total_waited().as_millis() as u64,
            processed = totals.processed,
            "Drive loop finished"
        );
        Ok(())
    }

    /// Next page, retrying transient failures along the page backoff.
    async fn fetch_with_retry(
        &self,
        pager: &mut RemotePager,
        page_number: u32,
    ) -> std::result::Result<Option<RemotePage>, PagerError> {
        let mut delays = self.config.page_retry.delays();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match pager.next_page().await {
                Ok(page) => return Ok(page),
                Err(e) if e.is_transient() => match delays.next() {
                    Some(delay) => {
                        tracing::warn!(
                            page = page_number,
                            attempt,
                            backoff_ms = delay.as_millis() as u64,
                            error = %e,
                            "Page fetch failed, retrying..."
                        );
                        tokio::time::sleep(delay).await;
                    }
                    None => return Err(e),
                },
                Err(e) => return Err(e),
            }
        }
    }
}

/// Persisted counters and error details of `job`.
fn totals_of(job: &SyncJobModel) -> SyncProgress {
    SyncProgress {
        processed: job.issues_processed.max(0) as u32,
        created: job.issues_created.max(0) as u32,
        updated: job.issues_updated.max(0) as u32,
        errors: job.errors.max(0) as u32,
        error_messages: job.error_details.0.clone(),
    }
}

/// Describe why a task ended without a result.
fn task_failure_message(err: JoinError) -> String {
    if err.is_panic() {
        let payload = err.into_panic();
        let detail = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        format!("Sync task panicked: {detail}")
    } else if err.is_cancelled() {
        "Task was cancelled".to_string()
    } else {
        format!("Task failed: {err}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_url_names_repository_and_job() {
        let repo = Uuid::nil();
        let job = Uuid::from_u128(7);
        assert_eq!(
            status_poll_url(repo, job),
            format!("/api/repositories/{repo}/sync/status?jobId={job}")
        );
    }

    #[tokio::test]
    async fn panic_payload_is_extracted() {
        let handle: JoinHandle<()> = tokio::spawn(async { panic!("cursor went backwards") });
        let err = handle
            .await
            .expect_err("task panicked");
        assert_eq!(
            task_failure_message(err),
            "Sync task panicked: cursor went backwards"
        );
    }

    #[tokio::test]
    async fn formatted_panic_payload_is_extracted() {
        let page = 3;
        let handle: JoinHandle<()> = tokio::spawn(async move { panic!("bad page {page}") });
        let err = handle
            .await
            .expect_err("task panicked");
        assert_eq!(task_failure_message(err), "Sync task panicked: bad page 3");
    }

    #[tokio::test]
    async fn aborted_task_reports_cancellation() {
        let handle = tokio::spawn(async {
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
        });
        handle.abort();
        let err = handle.await.expect_err("aborted");
        assert_eq!(task_failure_message(err), "Task was cancelled");
    }
}
