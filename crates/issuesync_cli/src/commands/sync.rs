use std::time::Duration;

use console::{Term, style};
use issuesync::store;
use issuesync::sync::JobStatusView;
use issuesync::{SyncJobStatus, SyncResult, connect_and_migrate};
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::config::Config;
use crate::{StateArg, SyncAction};

/// How often the job row is polled while watching a sync.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Maximum number of error details printed before eliding the rest.
const MAX_ERRORS_SHOWN: usize = 10;

pub(crate) async fn handle_sync(
    action: SyncAction,
    config: &Config,
    database_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let db = connect_and_migrate(database_url).await?;

    match action {
        SyncAction::Start {
            repository_id,
            actor,
            states,
            since,
            batch_size,
            detach,
        } => {
            let request = build_request(&states, since, batch_size);
            start(db, config, repository_id, &request, &actor, detach).await?;
        }
        SyncAction::Status { job_id, json } => {
            let job = store::jobs::find_by_id(&db, job_id)
                .await?
                .ok_or_else(|| format!("No sync job with id {job_id}"))?;
            let view = JobStatusView::from(job);
            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                print_status(&view);
            }
        }
        SyncAction::List {
            repository_id,
            limit,
        } => {
            let jobs = store::jobs::list_by_repository(&db, repository_id, limit).await?;
            if jobs.is_empty() {
                println!("No sync jobs for repository {repository_id}.");
            }
            for job in jobs {
                let view = JobStatusView::from(job);
                println!(
                    "{}  {:<10} {:>5} processed {:>5} created {:>5} updated {:>4} errors  {}",
                    view.job_id,
                    status_label(view.status),
                    view.issues_processed,
                    view.issues_created,
                    view.issues_updated,
                    view.errors,
                    style(view.created_at.format("%Y-%m-%d %H:%M:%S")).dim()
                );
            }
        }
    }

    Ok(())
}

fn build_request(
    states: &[StateArg],
    since: Option<String>,
    batch_size: Option<i64>,
) -> issuesync::SyncRequest {
    issuesync::SyncRequest {
        states: (!states.is_empty())
            .then(|| states.iter().map(|s| s.as_wire().to_string()).collect()),
        since,
        batch_size,
    }
}

#[cfg(not(feature = "github"))]
async fn start(
    _db: DatabaseConnection,
    _config: &Config,
    _repository_id: Uuid,
    _request: &issuesync::SyncRequest,
    _actor: &str,
    _detach: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    Err("issuesync was built without GitHub support; rebuild with --features github".into())
}

#[cfg(feature = "github")]
async fn start(
    db: DatabaseConnection,
    config: &Config,
    repository_id: Uuid,
    request: &issuesync::SyncRequest,
    actor: &str,
    detach: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    use std::sync::Arc;

    use issuesync::{ApiRateLimiter, GitHubClient, SyncError, SyncJobManager};

    let token = config.github_token().ok_or(
        "No GitHub token configured. Set ISSUESYNC_GITHUB__TOKEN or GITHUB_TOKEN, \
         or add [github] token to the config file.",
    )?;
    let mut client = GitHubClient::from_token(token)?
        .with_rate_limiter(ApiRateLimiter::new(config.engine.github_requests_per_second));
    if let Some(api_url) = &config.github.api_url {
        client = client.with_api_url(api_url.clone());
    }

    let manager = SyncJobManager::new(db.clone(), Arc::new(client), config.engine.clone());
    let started = match manager.start(repository_id, request, actor).await {
        Ok(started) => started,
        Err(SyncError::AlreadyRunning { .. }) => {
            let running = store::jobs::find_running(&db, repository_id).await?;
            let hint = running
                .map(|job| format!(" (job {})", job.id))
                .unwrap_or_default();
            return Err(format!("A sync is already running for this repository{hint}").into());
        }
        Err(e) => return Err(e.into()),
    };

    let is_tty = Term::stdout().is_term();
    let job_id = started.job_id;
    if is_tty {
        println!("Started sync job {}", style(job_id).cyan());
        println!("  Status: {}", style(&started.status_poll_url).dim());
    } else {
        tracing::info!(%job_id, status_url = %started.status_poll_url, "Sync job started");
    }

    let result = if detach {
        wait_quietly(&db, job_id, started.handle).await?
    } else {
        watch(&db, job_id, started.handle, is_tty).await?
    };

    print_result(&result, is_tty);
    if result.success {
        Ok(())
    } else {
        Err(format!("Sync job {job_id} failed").into())
    }
}

/// Await the job, polling its row and printing counter changes.
#[cfg(feature = "github")]
async fn watch(
    db: &DatabaseConnection,
    job_id: Uuid,
    mut handle: tokio::task::JoinHandle<SyncResult>,
    is_tty: bool,
) -> Result<SyncResult, Box<dyn std::error::Error>> {
    let term = Term::stdout();
    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    let mut last_seen: Option<(i32, i32)> = None;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            joined = &mut handle => {
                if is_tty {
                    term.clear_line()?;
                }
                return Ok(joined?);
            }
            _ = &mut ctrl_c => {
                interrupt(db, job_id, &handle).await?;
                return Err("Sync interrupted".into());
            }
            _ = ticker.tick() => {
                let Some(job) = store::jobs::find_by_id(db, job_id).await? else {
                    continue;
                };
                let seen = (job.issues_processed, job.errors);
                if last_seen == Some(seen) {
                    continue;
                }
                last_seen = Some(seen);

                if is_tty {
                    term.clear_line()?;
                    term.write_str(&format!(
                        "  Processed {} issues: {} created, {} updated, {} errors",
                        style(job.issues_processed).bold(),
                        job.issues_created,
                        job.issues_updated,
                        job.errors
                    ))?;
                } else {
                    tracing::info!(
                        %job_id,
                        processed = job.issues_processed,
                        created = job.issues_created,
                        updated = job.issues_updated,
                        errors = job.errors,
                        "Sync progress"
                    );
                }
            }
        }
    }
}

/// Await the job without progress output.
#[cfg(feature = "github")]
async fn wait_quietly(
    db: &DatabaseConnection,
    job_id: Uuid,
    mut handle: tokio::task::JoinHandle<SyncResult>,
) -> Result<SyncResult, Box<dyn std::error::Error>> {
    tokio::select! {
        joined = &mut handle => Ok(joined?),
        _ = tokio::signal::ctrl_c() => {
            interrupt(db, job_id, &handle).await?;
            Err("Sync interrupted".into())
        }
    }
}

/// The process is about to exit mid-job: record the job as failed so the
/// repository is not left with a running job nobody drives.
#[cfg(feature = "github")]
async fn interrupt(
    db: &DatabaseConnection,
    job_id: Uuid,
    handle: &tokio::task::JoinHandle<SyncResult>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("\nInterrupted, marking job {job_id} as failed...");
    handle.abort();
    store::jobs::mark_failed(db, job_id, "Interrupted by user").await?;
    Ok(())
}

#[cfg(feature = "github")]
fn print_result(result: &SyncResult, is_tty: bool) {
    if !is_tty {
        tracing::info!(
            job_id = %result.job_id,
            status = %result.status,
            summary = %result.summary,
            "Sync job finished"
        );
        return;
    }

    println!();
    if result.success {
        println!("{} {}", style("✓").green().bold(), result.summary);
    } else {
        println!("{} {}", style("✗").red().bold(), result.summary);
    }
    print_errors(&result.totals.error_messages);
}

fn print_status(view: &JobStatusView) {
    println!("Job:        {}", view.job_id);
    println!("Repository: {}", view.repository_id);
    println!("Status:     {}", status_label(view.status));
    println!("Started by: {}", view.created_by);
    println!(
        "Started:    {}",
        view.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    if let Some(completed_at) = view.completed_at {
        println!(
            "Finished:   {}",
            completed_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
    println!(
        "Counters:   {} processed, {} created, {} updated, {} errors",
        view.issues_processed, view.issues_created, view.issues_updated, view.errors
    );
    if let Some(summary) = &view.summary {
        println!("Summary:    {summary}");
    }
    print_errors(&view.error_details);
}

fn print_errors(errors: &[String]) {
    if errors.is_empty() {
        return;
    }
    eprintln!("{}", style(format!("{} error(s):", errors.len())).yellow());
    for error in errors.iter().take(MAX_ERRORS_SHOWN) {
        eprintln!("  - {error}");
    }
    if errors.len() > MAX_ERRORS_SHOWN {
        eprintln!("  ... and {} more errors", errors.len() - MAX_ERRORS_SHOWN);
    }
}

fn status_label(status: SyncJobStatus) -> console::StyledObject<String> {
    let label = status.to_string();
    match status {
        SyncJobStatus::Completed => style(label).green(),
        SyncJobStatus::Failed => style(label).red(),
        SyncJobStatus::Running => style(label).cyan(),
        SyncJobStatus::Pending => style(label).dim(),
    }
}
