//! Issuesync CLI - trigger and watch issue sync jobs.

mod commands;
mod config;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "issuesync")]
#[command(version)]
#[command(about = "Synchronize remote issues into a local database")]
#[command(
    long_about = "Issuesync pages a repository's issues from the remote tracker into a local \
database. Each sync runs as a job with a status row that can be polled while it runs and \
inspected after it finishes."
)]
#[command(after_long_help = r#"EXAMPLES
    Register a repository and its default project:
        $ issuesync repo add octo/widgets --remote-id 4242 --project Widgets

    Sync open issues, 25 per page, and watch progress:
        $ issuesync sync start <repository-id> --actor me --state open --batch-size 25

    Inspect a job:
        $ issuesync sync status <job-id> --json

CONFIGURATION
    Issuesync reads configuration from:
      1. ~/.config/issuesync/config.toml (or $XDG_CONFIG_HOME/issuesync/config.toml)
      2. ./issuesync.toml
      3. Environment variables (ISSUESYNC_ prefix, `__` between sections)
      4. .env file in current directory

ENVIRONMENT VARIABLES
    ISSUESYNC_DATABASE__URL            Database connection string (default: ~/.local/state/issuesync/issuesync.db)
    ISSUESYNC_GITHUB__TOKEN            GitHub token (GITHUB_TOKEN is used as a fallback)
    ISSUESYNC_GITHUB__API_URL          GraphQL endpoint, for GitHub Enterprise
    ISSUESYNC_ENGINE__JOB_TIMEOUT_MS   Wall-clock limit per sync job
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
    /// Manage sync targets
    Repo {
        #[command(subcommand)]
        action: RepoAction,
    },
    /// Start and inspect sync jobs
    Sync {
        #[command(subcommand)]
        action: SyncAction,
    },
}

#[derive(Subcommand)]
enum MigrateAction {
    /// Apply all pending migrations
    Up,
    /// Rollback the last migration
    Down,
    /// Show migration status
    Status,
    /// Fresh install - drop all tables and reapply migrations
    Fresh,
}

#[derive(Subcommand)]
enum RepoAction {
    /// Register a repository with its default project
    Add {
        /// Repository full name (owner/name)
        full_name: String,

        /// Numeric repository ID on the remote
        #[arg(long)]
        remote_id: i64,

        /// Name of the project synced issues attach to (defaults to the repository name)
        #[arg(short, long)]
        project: Option<String>,
    },
    /// List registered repositories
    List,
}

/// Remote issue states accepted by `--state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum StateArg {
    Open,
    Closed,
}

impl StateArg {
    fn as_wire(self) -> &'static str {
        match self {
            StateArg::Open => "OPEN",
            StateArg::Closed => "CLOSED",
        }
    }
}

#[derive(Subcommand)]
enum SyncAction {
    /// Start a sync job for a repository
    Start {
        /// Repository ID (see `issuesync repo list`)
        repository_id: Uuid,

        /// Who is starting the sync
        #[arg(long)]
        actor: String,

        /// Only sync issues in this state (repeatable; default: all)
        #[arg(short, long = "state", value_enum)]
        states: Vec<StateArg>,

        /// Only sync issues updated at or after this RFC 3339 timestamp
        #[arg(long)]
        since: Option<String>,

        /// Issues per page (1-100)
        #[arg(short, long)]
        batch_size: Option<i64>,

        /// Don't poll and print progress; print the job ID and wait quietly
        #[arg(short, long)]
        detach: bool,
    },
    /// Show the state of a sync job
    Status {
        /// Job ID
        job_id: Uuid,

        /// Print the job as JSON
        #[arg(long)]
        json: bool,
    },
    /// List recent sync jobs for a repository
    List {
        /// Repository ID
        repository_id: Uuid,

        /// Maximum number of jobs to show
        #[arg(short, long, default_value_t = 10)]
        limit: u64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("issuesync=info,issuesync_cli=info"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Load configuration (config files -> env vars -> defaults)
    let config = config::Config::load();

    let cli = Cli::parse();

    let database_url = config
        .database_url()
        .ok_or("Could not determine a database URL; set ISSUESYNC_DATABASE__URL")?;

    // Ensure the database directory exists for SQLite
    if database_url.starts_with("sqlite://") {
        let db_path = database_url.trim_start_matches("sqlite://");
        // Strip query parameters (e.g., ?mode=rwc) before path operations
        let db_path = db_path.split('?').next().unwrap_or(db_path);
        let db_path = std::path::Path::new(db_path);

        if db_path.is_relative() && !db_path.as_os_str().is_empty() {
            tracing::warn!(
                "Database path '{}' is relative - behavior depends on current directory. \
                 Consider using an absolute path.",
                db_path.display()
            );
        }

        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
    }

    match cli.command {
        Commands::Migrate { action } => {
            commands::migrate::handle_migrate(action, &database_url).await?;
        }
        Commands::Repo { action } => {
            commands::repo::handle_repo(action, &database_url).await?;
        }
        Commands::Sync { action } => {
            commands::sync::handle_sync(action, &config, &database_url).await?;
        }
    }

    Ok(())
}
