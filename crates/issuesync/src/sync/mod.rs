//! The synchronization engine.
//!
//! A sync job walks a remote repository's issues page by page and folds each
//! page into the local store:
//!
//! ```text
//! start() ─► RateGate ─► create_if_not_running ─► spawn
//!                                                   │
//!            RemotePager ─► RecordReconciler ─► ProgressSink ─► terminal write
//! ```
//!
//! # Module Structure
//!
//! - [`manager`] - `SyncJobManager`: admission, the detached drive loop, finalization
//! - [`pager`] - `RemotePager`: cursor pagination with rate limit suspension
//! - [`reconcile`] - `RecordReconciler`: insert/update rules for local rows
//! - [`progress`] - `ProgressSink` and the job-row backed implementation
//! - [`rate_gate`] - `RateGate`: per-actor sliding window on job starts
//! - [`types`] - requests, options, progress counters and results
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use issuesync::{EngineConfig, GitHubClient, SyncJobManager, SyncRequest};
//!
//! let source = Arc::new(GitHubClient::from_token(token)?);
//! let manager = SyncJobManager::new(db, source, EngineConfig::default());
//! let started = manager.start(repository_id, &SyncRequest::default(), "user-1").await?;
//! println!("poll {}", started.status_poll_url);
//! ```

mod error;
pub mod manager;
pub mod pager;
pub mod progress;
pub mod rate_gate;
pub mod reconcile;
mod types;

pub use error::{PagerError, Result, SyncError, ValidationError};
pub use manager::{StartedSync, SyncJobManager, status_poll_url};
pub use pager::{RemotePage, RemotePager};
pub use progress::{JobProgressSink, NoopProgressSink, ProgressSink};
pub use rate_gate::RateGate;
pub use reconcile::{ReconcileOutcome, RecordError, RecordReconciler, map_status, merge_status};
pub use types::{JobStatusView, SyncOptions, SyncProgress, SyncRequest, SyncResult};
