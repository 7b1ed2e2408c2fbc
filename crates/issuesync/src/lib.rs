//! Issuesync - pages a remote tracker's issues into a local relational store.
//!
//! A sync job is admitted per repository (at most one running at a time),
//! runs detached from the caller, and records its progress and outcome on a
//! `sync_jobs` row that callers poll.
//!
//! # Features
//!
//! - `github` - GitHub GraphQL [`IssueSource`] over a reqwest transport.
//! - `migrate` - Schema migrations and [`connect_and_migrate`].
//! - `sqlite` / `postgres` - database drivers.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use issuesync::{connect_and_migrate, EngineConfig, GitHubClient, SyncJobManager, SyncRequest};
//!
//! let db = connect_and_migrate("sqlite://issuesync.db?mode=rwc").await?;
//! let (repo, _project) = issuesync::store::targets::register(&db, "octo/widgets", 4242, "Widgets").await?;
//!
//! let manager = SyncJobManager::new(db, Arc::new(GitHubClient::from_token(token)?), EngineConfig::default());
//! let started = manager.start(repo.id, &SyncRequest::default(), "user-1").await?;
//! let result = started.handle.await?;
//! println!("{}", result.summary);
//! ```

pub mod config;
pub mod db;
pub mod entity;
pub mod http;
pub mod platform;
pub mod retry;
pub mod store;
pub mod sync;

#[cfg(feature = "github")]
pub mod github;

#[cfg(feature = "migrate")]
pub mod migration;

pub use config::EngineConfig;
pub use db::connect;
#[cfg(feature = "migrate")]
pub use db::connect_and_migrate;
pub use entity::prelude::*;
#[cfg(feature = "github")]
pub use github::GitHubClient;
pub use platform::{
    ApiRateLimiter, IssueQuery, IssueSource, PlatformError, RemoteIssueRecord, RemoteIssueState,
    rate_limits,
};
pub use retry::RetryConfig;
pub use store::StoreError;
pub use sync::{
    JobStatusView, ProgressSink, RateGate, StartedSync, SyncError, SyncJobManager, SyncOptions,
    SyncProgress, SyncRequest, SyncResult,
};
