use std::time::Duration;

use thiserror::Error;

/// Errors that can occur when talking to the remote issue tracker.
///
/// Variants are classified so callers can decide between waiting, retrying
/// and aborting without inspecting messages.
#[derive(Debug, Clone, Error)]
pub enum PlatformError {
    /// API error from the platform. `status` is the HTTP status when known.
    #[error("API error{}: {message}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
    Api {
        status: Option<u16>,
        message: String,
    },

    /// Rate limit exceeded. `retry_after` is the advertised delay.
    #[error("Rate limit exceeded. Retry after {}s", .retry_after.as_secs())]
    RateLimited { retry_after: Duration },

    /// Authentication required or failed.
    #[error("Authentication required")]
    AuthRequired,

    /// Resource not found (repository, owner).
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    /// Network or connection error.
    #[error("Network error: {message}")]
    Network { message: String },

    /// Unexpected/internal error, such as an undecodable response.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl PlatformError {
    /// Create an API error without a status code.
    #[inline]
    pub fn api(message: impl Into<String>) -> Self {
        Self::Api {
            status: None,
            message: message.into(),
        }
    }

    /// Create an API error carrying the HTTP status.
    #[inline]
    pub fn api_status(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Create a not found error.
    #[inline]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Create a network error.
    #[inline]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create an internal error.
    #[inline]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Check if this error is a rate limit error.
    #[inline]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Errors worth retrying after a backoff: network failures, server-side
    /// (5xx or status-less) API errors and undecodable responses.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network { .. } | Self::Internal { .. } => true,
            Self::Api { status, .. } => status.is_none_or(|s| s >= 500),
            Self::RateLimited { .. } | Self::AuthRequired | Self::NotFound { .. } => false,
        }
    }

    /// Errors that make continuing the job pointless.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::AuthRequired | Self::NotFound { .. } => true,
            Self::Api { status, .. } => matches!(status, Some(400..=499)),
            _ => false,
        }
    }
}

/// Extract a short error message suitable for display.
///
/// Takes the first line of an error message, which keeps job error details
/// readable when an underlying error carries multi-line context.
#[inline]
pub fn short_error_message(e: &impl std::error::Error) -> String {
    let full = e.to_string();
    full.lines().next().unwrap_or(&full).to_string()
}

/// Result type for platform operations.
pub type Result<T> = std::result::Result<T, PlatformError>;
