//! End-to-end tests for sync jobs against a scripted issue source.
//!
//! These tests require the `sqlite` and `migrate` features and run every job
//! against an in-memory SQLite database.
//!
//! Key scenarios tested:
//! - Admission: running row visible on return, one running job per repository
//! - Idempotent reruns and non-destructive updates
//! - Partial failure across pages, fatal aborts, panics and timeouts
//! - Remote rate limits: waited out, or skipped once the wait budget is spent
//! - Start throttling and option validation

#![cfg(all(feature = "sqlite", feature = "migrate"))]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use issuesync::entity::issue::Model as IssueModel;
use issuesync::platform::{
    IssuePage, IssueQuery, IssueSource, PageBoundary, PlatformError, RemoteIssueRecord,
    RemoteIssueState,
};
use issuesync::store;
use issuesync::sync::{JobProgressSink, SyncError, SyncProgress, SyncResult, ValidationError};
use issuesync::{
    EngineConfig, IssueStatus, ProgressSink, RepositoryModel, RetryConfig, SyncJobManager,
    SyncJobStatus, SyncRequest, connect_and_migrate,
};
use sea_orm::{DatabaseConnection, EntityTrait, IntoActiveModel, Set};
use uuid::Uuid;

/// Upper bound for any job in these tests. Exceeding it means a hang.
const JOB_TIMEOUT: Duration = Duration::from_secs(10);

// ─── Scripted Source ─────────────────────────────────────────────────────────

/// Serves fixed pages with the page index as cursor. Individual pages can be
/// scripted to fail, panic or stall.
#[derive(Default)]
struct ScriptedSource {
    pages: Vec<Vec<RemoteIssueRecord>>,
    /// Page index → (error, remaining failures).
    failures: Mutex<HashMap<usize, (PlatformError, usize)>>,
    panic_on: Option<usize>,
    delay: Option<Duration>,
    queries: Mutex<Vec<IssueQuery>>,
    fetches: AtomicUsize,
    boundary_fetches: AtomicUsize,
}

impl ScriptedSource {
    fn new(pages: Vec<Vec<RemoteIssueRecord>>) -> Self {
        Self {
            pages,
            ..Default::default()
        }
    }

    fn failing(self, page: usize, error: PlatformError, times: usize) -> Self {
        self.failures
            .lock()
            .unwrap()
            .insert(page, (error, times));
        self
    }

    fn panicking_on(mut self, page: usize) -> Self {
        self.panic_on = Some(page);
        self
    }

    fn stalling(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn index(cursor: Option<&str>) -> usize {
        cursor.map_or(0, |c| c.parse().expect("numeric cursor"))
    }

    fn next_cursor(&self, index: usize) -> Option<String> {
        (index + 1 < self.pages.len()).then(|| (index + 1).to_string())
    }
}

#[async_trait]
impl IssueSource for ScriptedSource {
    async fn fetch_issues(
        &self,
        query: &IssueQuery,
        cursor: Option<&str>,
    ) -> issuesync::platform::Result<IssuePage> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let index = Self::index(cursor);
        if self.panic_on == Some(index) {
            panic!("scripted panic on page {index}");
        }
        if let Some((error, remaining)) = self.failures.lock().unwrap().get_mut(&index)
            && *remaining > 0
        {
            *remaining -= 1;
            return Err(error.clone());
        }

        Ok(IssuePage {
            records: self.pages.get(index).cloned().unwrap_or_default(),
            next_cursor: self.next_cursor(index),
            rate_limit: None,
        })
    }

    async fn fetch_page_boundary(
        &self,
        _query: &IssueQuery,
        cursor: Option<&str>,
    ) -> issuesync::platform::Result<PageBoundary> {
        self.boundary_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(PageBoundary {
            next_cursor: self.next_cursor(Self::index(cursor)),
            rate_limit: None,
        })
    }
}

/// Counts progress deltas instead of writing them.
#[derive(Default)]
struct RecordingSink {
    deltas: Mutex<Vec<SyncProgress>>,
    finished: Mutex<Vec<Uuid>>,
}

#[async_trait]
impl ProgressSink for RecordingSink {
    async fn update(&self, _job_id: Uuid, delta: &SyncProgress) {
        self.deltas.lock().unwrap().push(delta.clone());
    }

    async fn finish(&self, job_id: Uuid) {
        self.finished.lock().unwrap().push(job_id);
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

async fn setup_test_db() -> DatabaseConnection {
    connect_and_migrate("sqlite::memory:")
        .await
        .expect("Failed to create test database")
}

async fn register_target(db: &DatabaseConnection) -> RepositoryModel {
    let (repo, _) = store::targets::register(db, "octo/widgets", 4242, "Widgets")
        .await
        .expect("Failed to register target");
    repo
}

fn test_config() -> EngineConfig {
    EngineConfig {
        page_retry: RetryConfig::new(Duration::from_millis(1), Duration::from_millis(5), 2)
            .with_jitter(false),
        ..EngineConfig::default()
    }
}

fn issue(remote_id: i64, state: &str) -> RemoteIssueRecord {
    let created = Utc::now() - TimeDelta::days(7);
    RemoteIssueRecord {
        remote_id,
        number: remote_id - 100,
        title: format!("Issue {remote_id}"),
        body: Some(format!("Body of {remote_id}")),
        state: state.to_string(),
        assignee: None,
        linked_pull_request: None,
        created_at: created,
        updated_at: created,
        closed_at: (state == "CLOSED").then(|| Utc::now() - TimeDelta::hours(2)),
    }
}

fn two_pages_open() -> Vec<Vec<RemoteIssueRecord>> {
    vec![
        vec![issue(101, "OPEN"), issue(102, "OPEN")],
        vec![issue(103, "OPEN"), issue(104, "OPEN")],
    ]
}

async fn run_to_end(
    manager: &SyncJobManager,
    repository_id: Uuid,
    request: &SyncRequest,
) -> SyncResult {
    let started = manager
        .start(repository_id, request, "actor-1")
        .await
        .expect("sync should be admitted");
    tokio::time::timeout(JOB_TIMEOUT, started.handle)
        .await
        .expect("sync should finish in time")
        .expect("supervisor task should not fail")
}

async fn issue_row(db: &DatabaseConnection, repository_id: Uuid, remote_id: i64) -> IssueModel {
    store::issues::find_by_remote_id(db, repository_id, remote_id)
        .await
        .expect("query")
        .expect("row should exist")
}

// ─── Admission ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_job_is_running_before_start_returns() {
    let db = setup_test_db().await;
    let repo = register_target(&db).await;
    let source = Arc::new(ScriptedSource::new(two_pages_open()).stalling(Duration::from_millis(300)));
    let manager = SyncJobManager::new(db.clone(), source, test_config());

    let started = manager
        .start(repo.id, &SyncRequest::default(), "actor-1")
        .await
        .expect("admitted");

    let view = manager
        .status(started.job_id)
        .await
        .expect("query")
        .expect("job row");
    assert_eq!(view.status, SyncJobStatus::Running);
    assert_eq!(view.created_by, "actor-1");
    assert_eq!(
        started.status_poll_url,
        format!("/api/repositories/{}/sync/status?jobId={}", repo.id, started.job_id)
    );

    let result = tokio::time::timeout(JOB_TIMEOUT, started.handle)
        .await
        .expect("finished")
        .expect("joined");
    assert_eq!(result.status, SyncJobStatus::Completed);

    let view = manager.status(started.job_id).await.unwrap().unwrap();
    assert!(view.is_terminal());
    assert!(view.completed_at.is_some());
}

#[tokio::test]
async fn test_second_start_while_running_is_rejected() {
    let db = setup_test_db().await;
    let repo = register_target(&db).await;
    let source = Arc::new(ScriptedSource::new(two_pages_open()).stalling(Duration::from_millis(300)));
    let manager = SyncJobManager::new(db.clone(), source, test_config());

    let first = manager
        .start(repo.id, &SyncRequest::default(), "actor-1")
        .await
        .expect("admitted");

    let second = manager
        .start(repo.id, &SyncRequest::default(), "actor-2")
        .await;
    assert!(
        matches!(second, Err(SyncError::AlreadyRunning { repository_id }) if repository_id == repo.id)
    );

    let jobs = store::jobs::list_by_repository(&db, repo.id, 10)
        .await
        .expect("list");
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].id, first.job_id);

    tokio::time::timeout(JOB_TIMEOUT, first.handle)
        .await
        .expect("finished")
        .expect("joined");

    // Once finished, the repository can be synced again.
    let again = run_to_end(&manager, repo.id, &SyncRequest::default()).await;
    assert_eq!(again.status, SyncJobStatus::Completed);
}

#[tokio::test]
async fn test_unknown_repository_is_rejected() {
    let db = setup_test_db().await;
    let manager = SyncJobManager::new(
        db.clone(),
        Arc::new(ScriptedSource::new(vec![])),
        test_config(),
    );

    let result = manager
        .start(Uuid::new_v4(), &SyncRequest::default(), "actor-1")
        .await;
    assert!(matches!(result, Err(SyncError::NotFound(_))));
}

#[tokio::test]
async fn test_invalid_options_are_rejected_without_job() {
    let db = setup_test_db().await;
    let repo = register_target(&db).await;
    let manager = SyncJobManager::new(
        db.clone(),
        Arc::new(ScriptedSource::new(two_pages_open())),
        test_config(),
    );

    let bad_state = SyncRequest {
        states: Some(vec!["open".to_string()]),
        ..Default::default()
    };
    let bad_batch = SyncRequest {
        batch_size: Some(101),
        ..Default::default()
    };
    let bad_since = SyncRequest {
        since: Some("yesterday".to_string()),
        ..Default::default()
    };

    for request in [&bad_state, &bad_batch, &bad_since] {
        let result = manager.start(repo.id, request, "actor-1").await;
        assert!(matches!(result, Err(SyncError::Validation(_))), "{request:?}");
    }
    let result = manager.start(repo.id, &SyncRequest::default(), "  ").await;
    assert!(matches!(
        result,
        Err(SyncError::Validation(ValidationError::MissingActor))
    ));

    let jobs = store::jobs::list_by_repository(&db, repo.id, 10)
        .await
        .expect("list");
    assert!(jobs.is_empty());
}

#[tokio::test]
async fn test_start_rate_is_limited_per_actor() {
    let db = setup_test_db().await;
    let config = EngineConfig {
        rate_gate_quota: 2,
        ..test_config()
    };
    let manager = SyncJobManager::new(db, Arc::new(ScriptedSource::new(vec![])), config);

    // Unknown repositories still pass through the gate first.
    for _ in 0..2 {
        let result = manager
            .start(Uuid::new_v4(), &SyncRequest::default(), "busy")
            .await;
        assert!(matches!(result, Err(SyncError::NotFound(_))));
    }

    let throttled = manager
        .start(Uuid::new_v4(), &SyncRequest::default(), "busy")
        .await;
    match throttled {
        Err(SyncError::RateLimited { retry_after }) => {
            assert!(retry_after > Duration::ZERO);
            assert!(retry_after <= Duration::from_secs(60));
        }
        other => panic!("expected RateLimited, got {other:?}"),
    }

    let other_actor = manager
        .start(Uuid::new_v4(), &SyncRequest::default(), "calm")
        .await;
    assert!(matches!(other_actor, Err(SyncError::NotFound(_))));
}

// ─── Reconciliation Through Jobs ─────────────────────────────────────────────

#[tokio::test]
async fn test_two_pages_then_close_one_issue() {
    let db = setup_test_db().await;
    let repo = register_target(&db).await;
    let source = Arc::new(ScriptedSource::new(two_pages_open()));
    let manager = SyncJobManager::new(db.clone(), source.clone(), test_config());

    let request = SyncRequest {
        states: Some(vec!["OPEN".to_string()]),
        batch_size: Some(2),
        ..Default::default()
    };
    let first = run_to_end(&manager, repo.id, &request).await;
    assert_eq!(first.status, SyncJobStatus::Completed);
    assert!(first.success);
    assert_eq!(
        (first.totals.processed, first.totals.created, first.totals.updated),
        (4, 4, 0)
    );

    let queries = source.queries.lock().unwrap().clone();
    assert_eq!(queries.len(), 2);
    assert_eq!(queries[0].page_size, 2);
    assert_eq!(queries[0].states, vec![RemoteIssueState::Open]);
    assert_eq!(queries[0].full_name(), "octo/widgets");

    let row = store::jobs::find_by_id(&db, first.job_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.status, SyncJobStatus::Completed);
    assert_eq!(
        (row.issues_processed, row.issues_created, row.issues_updated, row.errors),
        (4, 4, 0, 0)
    );
    assert_eq!(row.metadata.options.batch_size, 2);
    assert_eq!(
        row.metadata.summary.as_deref(),
        Some("Processed 4 issues: 4 created, 0 updated, 0 errors")
    );

    let mut closed = two_pages_open();
    closed[0][0] = issue(101, "CLOSED");
    let manager = SyncJobManager::new(
        db.clone(),
        Arc::new(ScriptedSource::new(closed)),
        test_config(),
    );
    let second = run_to_end(&manager, repo.id, &SyncRequest::default()).await;
    assert_eq!(second.status, SyncJobStatus::Completed);
    assert_eq!(
        (second.totals.processed, second.totals.created, second.totals.updated),
        (4, 0, 1)
    );

    let row = issue_row(&db, repo.id, 101).await;
    assert_eq!(row.status, IssueStatus::Completed);
    assert!(row.completed_at.is_some());
}

#[tokio::test]
async fn test_rerun_against_unchanged_source_creates_nothing() {
    let db = setup_test_db().await;
    let repo = register_target(&db).await;
    let manager = SyncJobManager::new(
        db.clone(),
        Arc::new(ScriptedSource::new(two_pages_open())),
        test_config(),
    );

    let first = run_to_end(&manager, repo.id, &SyncRequest::default()).await;
    assert_eq!(first.totals.created, 4);

    let second = run_to_end(&manager, repo.id, &SyncRequest::default()).await;
    assert_eq!(
        (second.totals.processed, second.totals.created, second.totals.updated),
        (4, 0, 0)
    );
    assert_eq!(
        store::issues::count_by_repository(&db, repo.id)
            .await
            .unwrap(),
        4
    );
}

#[tokio::test]
async fn test_title_change_keeps_local_assignment() {
    let db = setup_test_db().await;
    let repo = register_target(&db).await;
    let manager = SyncJobManager::new(
        db.clone(),
        Arc::new(ScriptedSource::new(two_pages_open())),
        test_config(),
    );
    run_to_end(&manager, repo.id, &SyncRequest::default()).await;

    let mut local = issue_row(&db, repo.id, 102).await.into_active_model();
    local.assigned_to = Set(Some("user-42".to_string()));
    local.expanded_description = Set(Some("Expanded by a person".to_string()));
    store::issues::update(&db, local).await.expect("local edit");

    let mut renamed = two_pages_open();
    renamed[0][1].title = "Renamed upstream".to_string();
    let manager = SyncJobManager::new(
        db.clone(),
        Arc::new(ScriptedSource::new(renamed)),
        test_config(),
    );
    let result = run_to_end(&manager, repo.id, &SyncRequest::default()).await;
    assert_eq!(result.totals.updated, 1);

    let row = issue_row(&db, repo.id, 102).await;
    assert_eq!(row.title, "Renamed upstream");
    assert_eq!(row.assigned_to.as_deref(), Some("user-42"));
    assert_eq!(
        row.expanded_description.as_deref(),
        Some("Expanded by a person")
    );
}

#[tokio::test]
async fn test_progress_reported_after_every_page() {
    let db = setup_test_db().await;
    let repo = register_target(&db).await;
    let sink = Arc::new(RecordingSink::default());
    let manager = SyncJobManager::new(
        db.clone(),
        Arc::new(ScriptedSource::new(two_pages_open())),
        test_config(),
    )
    .with_progress_sink(sink.clone());

    let result = run_to_end(&manager, repo.id, &SyncRequest::default()).await;
    assert_eq!(result.totals.processed, 4);

    let deltas = sink.deltas.lock().unwrap().clone();
    assert_eq!(deltas.len(), 2);
    assert!(deltas.iter().all(|d| d.processed == 2 && d.created == 2));
    assert_eq!(*sink.finished.lock().unwrap(), vec![result.job_id]);
}

#[tokio::test]
async fn test_progress_slots_released_after_panic() {
    let db = setup_test_db().await;
    let repo = register_target(&db).await;
    let sink = Arc::new(JobProgressSink::new(db.clone()));
    let manager = SyncJobManager::new(
        db.clone(),
        Arc::new(ScriptedSource::new(two_pages_open()).panicking_on(1)),
        test_config(),
    )
    .with_progress_sink(sink.clone());

    let result = run_to_end(&manager, repo.id, &SyncRequest::default()).await;
    assert_eq!(result.status, SyncJobStatus::Failed);
    assert_eq!(sink.tracked_jobs(), 0);
    assert!(sink.pending(result.job_id).await.is_none());
}

// ─── Failure Handling ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_transient_page_failure_is_skipped() {
    let db = setup_test_db().await;
    let repo = register_target(&db).await;
    let pages = vec![
        vec![issue(101, "OPEN"), issue(102, "OPEN")],
        vec![issue(103, "OPEN"), issue(104, "OPEN")],
        vec![issue(105, "OPEN"), issue(106, "OPEN")],
    ];
    let source = Arc::new(ScriptedSource::new(pages).failing(
        1,
        PlatformError::api_status(502, "bad gateway"),
        usize::MAX,
    ));
    let manager = SyncJobManager::new(db.clone(), source.clone(), test_config());

    let result = run_to_end(&manager, repo.id, &SyncRequest::default()).await;
    assert_eq!(result.status, SyncJobStatus::Completed);
    assert!(result.success);
    assert_eq!(result.totals.created, 4);
    assert_eq!(result.totals.errors, 1);
    assert!(result.totals.error_messages[0].starts_with("page 2: "));

    // One attempt plus two retries on the failing page.
    assert_eq!(source.fetches.load(Ordering::SeqCst), 1 + 3 + 1);
    assert_eq!(source.boundary_fetches.load(Ordering::SeqCst), 1);

    let row = store::jobs::find_by_id(&db, result.job_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.status, SyncJobStatus::Completed);
    assert_eq!(row.errors, 1);
    assert_eq!(row.error_details.len(), 1);
    assert!(store::issues::find_by_remote_id(&db, repo.id, 103)
        .await
        .unwrap()
        .is_none());
    issue_row(&db, repo.id, 105).await;
}

#[tokio::test]
async fn test_transient_failure_within_budget_recovers() {
    let db = setup_test_db().await;
    let repo = register_target(&db).await;
    let source = Arc::new(ScriptedSource::new(two_pages_open()).failing(
        0,
        PlatformError::network("connection reset"),
        1,
    ));
    let manager = SyncJobManager::new(db.clone(), source, test_config());

    let result = run_to_end(&manager, repo.id, &SyncRequest::default()).await;
    assert_eq!(result.status, SyncJobStatus::Completed);
    assert_eq!(result.totals.created, 4);
    assert_eq!(result.totals.errors, 0);
}

#[tokio::test]
async fn test_remote_rate_limit_is_waited_out() {
    let db = setup_test_db().await;
    let repo = register_target(&db).await;
    let source = Arc::new(ScriptedSource::new(two_pages_open()).failing(
        1,
        PlatformError::RateLimited {
            retry_after: Duration::from_millis(10),
        },
        1,
    ));
    let manager = SyncJobManager::new(db.clone(), source.clone(), test_config());

    let result = run_to_end(&manager, repo.id, &SyncRequest::default()).await;
    assert_eq!(result.status, SyncJobStatus::Completed);
    assert_eq!(result.totals.created, 4);
    assert_eq!(result.totals.errors, 0);
    // The limited page is fetched again after the wait, never skipped.
    assert_eq!(source.fetches.load(Ordering::SeqCst), 3);
    assert_eq!(source.boundary_fetches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_rate_limit_wait_budget_exhausted_skips_page() {
    let db = setup_test_db().await;
    let repo = register_target(&db).await;
    let pages = vec![
        vec![issue(101, "OPEN"), issue(102, "OPEN")],
        vec![issue(103, "OPEN"), issue(104, "OPEN")],
        vec![issue(105, "OPEN"), issue(106, "OPEN")],
    ];
    let source = Arc::new(ScriptedSource::new(pages).failing(
        1,
        PlatformError::RateLimited {
            retry_after: Duration::from_secs(120),
        },
        usize::MAX,
    ));
    let config = EngineConfig {
        max_rate_limit_wait_ms: 0,
        ..test_config()
    };
    let manager = SyncJobManager::new(db.clone(), source.clone(), config);

    let result = run_to_end(&manager, repo.id, &SyncRequest::default()).await;
    assert_eq!(result.status, SyncJobStatus::Completed);
    assert!(result.success);
    assert_eq!(result.totals.created, 4);
    assert_eq!(result.totals.errors, 1);
    assert!(
        result.totals.error_messages[0].starts_with("page 2: Rate limit wait budget exhausted")
    );

    // Budget exhaustion is not retried with backoff; the page is stepped over.
    assert_eq!(source.fetches.load(Ordering::SeqCst), 3);
    assert_eq!(source.boundary_fetches.load(Ordering::SeqCst), 1);
    assert!(store::issues::find_by_remote_id(&db, repo.id, 103)
        .await
        .unwrap()
        .is_none());
    issue_row(&db, repo.id, 105).await;

    let row = store::jobs::find_by_id(&db, result.job_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.status, SyncJobStatus::Completed);
    assert_eq!(row.errors, 1);
}

#[tokio::test]
async fn test_auth_failure_aborts_job() {
    let db = setup_test_db().await;
    let repo = register_target(&db).await;
    let source = Arc::new(ScriptedSource::new(two_pages_open()).failing(
        1,
        PlatformError::AuthRequired,
        usize::MAX,
    ));
    let manager = SyncJobManager::new(db.clone(), source.clone(), test_config());

    let result = run_to_end(&manager, repo.id, &SyncRequest::default()).await;
    assert_eq!(result.status, SyncJobStatus::Failed);
    assert!(!result.success);
    assert_eq!(result.fatal.as_deref(), Some("Remote authentication failed"));
    // Only the page before the failure landed; auth errors are not retried.
    assert_eq!((result.totals.created, result.totals.updated), (2, 0));
    assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
    assert_eq!(source.boundary_fetches.load(Ordering::SeqCst), 0);

    let row = store::jobs::find_by_id(&db, result.job_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.status, SyncJobStatus::Failed);
    assert_eq!(row.issues_created, 2);
    assert!(row.completed_at.is_some());
    assert!(row
        .error_details
        .iter()
        .any(|e| e == "Remote authentication failed"));
    assert!(row
        .metadata
        .summary
        .as_deref()
        .is_some_and(|s| s.starts_with("Sync failed: Remote authentication failed.")));
}

#[tokio::test]
async fn test_panic_in_loop_marks_job_failed() {
    let db = setup_test_db().await;
    let repo = register_target(&db).await;
    let source = Arc::new(ScriptedSource::new(two_pages_open()).panicking_on(1));
    let manager = SyncJobManager::new(db.clone(), source, test_config());

    let result = run_to_end(&manager, repo.id, &SyncRequest::default()).await;
    assert_eq!(result.status, SyncJobStatus::Failed);
    assert!(
        result
            .fatal
            .as_deref()
            .is_some_and(|m| m.contains("scripted panic on page 1"))
    );

    let row = store::jobs::find_by_id(&db, result.job_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.status, SyncJobStatus::Failed);
    assert!(row.completed_at.is_some());
    // Progress written before the panic survives.
    assert_eq!(row.issues_created, 2);
    assert!(row.error_details.iter().any(|e| e.contains("panicked")));

    // The running slot is released.
    assert!(store::jobs::find_running(&db, repo.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_job_exceeding_time_limit_fails() {
    let db = setup_test_db().await;
    let repo = register_target(&db).await;
    let config = EngineConfig {
        job_timeout_ms: 100,
        ..test_config()
    };
    let source = Arc::new(ScriptedSource::new(two_pages_open()).stalling(Duration::from_secs(30)));
    let manager = SyncJobManager::new(db.clone(), source, config);

    let result = run_to_end(&manager, repo.id, &SyncRequest::default()).await;
    assert_eq!(result.status, SyncJobStatus::Failed);
    assert!(
        result
            .fatal
            .as_deref()
            .is_some_and(|m| m.contains("time limit"))
    );

    let row = store::jobs::find_by_id(&db, result.job_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.status, SyncJobStatus::Failed);
    assert_eq!(row.issues_processed, 0);
}

#[tokio::test]
async fn test_repository_without_project_fails_configuration() {
    let db = setup_test_db().await;
    let repo = register_target(&db).await;
    let project = store::targets::default_project(&db, repo.id)
        .await
        .unwrap()
        .expect("project");
    issuesync::entity::project::Entity::delete_by_id(project.id)
        .exec(&db)
        .await
        .expect("delete project");

    let manager = SyncJobManager::new(
        db.clone(),
        Arc::new(ScriptedSource::new(two_pages_open())),
        test_config(),
    );
    let result = run_to_end(&manager, repo.id, &SyncRequest::default()).await;
    assert_eq!(result.status, SyncJobStatus::Failed);
    assert!(
        result
            .fatal
            .as_deref()
            .is_some_and(|m| m.starts_with("Configuration error"))
    );
}
