//! Sync engine error types.

use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use crate::platform::PlatformError;
use crate::store::StoreError;

/// Rejection of caller-supplied sync options.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid state {0:?}: expected OPEN or CLOSED")]
    InvalidState(String),

    #[error("invalid since {0:?}: expected an RFC 3339 timestamp")]
    InvalidSince(String),

    #[error("batch size {value} out of range 1..={max}")]
    BatchSizeOutOfRange { value: i64, max: u32 },

    #[error("actor id must not be empty")]
    MissingActor,
}

/// Failures surfaced by [`RemotePager`](super::RemotePager).
#[derive(Debug, Clone, Error)]
pub enum PagerError {
    /// Rate limit waits would exceed the pager's cumulative budget.
    #[error("Rate limit wait budget exhausted after {}s", .waited.as_secs())]
    RateLimitExceeded { waited: Duration },

    /// Any other remote failure, unchanged.
    #[error(transparent)]
    Transport(PlatformError),
}

impl PagerError {
    /// Worth retrying the same page after a backoff.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_transient())
    }

    /// Retrying or skipping cannot help; the job must stop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_fatal())
    }
}

/// Errors from job admission and fatal drive loop failures.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A job for this repository is already running.
    #[error("A sync job is already running for repository {repository_id}")]
    AlreadyRunning { repository_id: Uuid },

    /// The actor exceeded the sync start rate.
    #[error("Too many sync requests. Retry after {}s", .retry_after.as_secs())]
    RateLimited { retry_after: Duration },

    #[error("Invalid sync options: {0}")]
    Validation(#[from] ValidationError),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The target cannot be synced as configured (no coordinates, no project).
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Remote authentication failed")]
    Unauthorized,

    #[error("Sync exceeded the {}s time limit", .limit.as_secs())]
    Timeout { limit: Duration },

    #[error("Remote error: {0}")]
    Platform(PlatformError),

    #[error("Store error: {0}")]
    Store(StoreError),
}

impl SyncError {
    /// Whether this error aborts a running job.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::NotFound(_)
            | Self::Configuration(_)
            | Self::Unauthorized
            | Self::Timeout { .. }
            | Self::Store(_) => true,
            Self::Platform(e) => e.is_fatal(),
            Self::AlreadyRunning { .. } | Self::RateLimited { .. } | Self::Validation(_) => false,
        }
    }

    /// Whether this error was raised before a job existed.
    pub fn is_admission(&self) -> bool {
        matches!(
            self,
            Self::AlreadyRunning { .. } | Self::RateLimited { .. } | Self::Validation(_)
        )
    }
}

impl From<PlatformError> for SyncError {
    fn from(err: PlatformError) -> Self {
        match err {
            PlatformError::AuthRequired => Self::Unauthorized,
            PlatformError::NotFound { resource } => Self::NotFound(resource),
            other => Self::Platform(other),
        }
    }
}

impl From<PagerError> for SyncError {
    fn from(err: PagerError) -> Self {
        match err {
            PagerError::RateLimitExceeded { waited } => {
                Self::Platform(PlatformError::RateLimited { retry_after: waited })
            }
            PagerError::Transport(e) => Self::from(e),
        }
    }
}

impl From<StoreError> for SyncError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AlreadyRunning { repository_id } => Self::AlreadyRunning { repository_id },
            StoreError::NotFound { context } => Self::NotFound(context),
            other => Self::Store(other),
        }
    }
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
