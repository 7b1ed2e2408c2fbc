//! GitHub API error types.

use std::time::Duration;

use chrono::Utc;
use thiserror::Error;

use crate::http::{HttpError, HttpResponse};
use crate::platform::PlatformError;

use super::types::GraphQlError;

/// Fallback delay when GitHub signals a rate limit without saying for how long.
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);

/// Errors that can occur when interacting with the GitHub API.
#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("GitHub API error ({status}): {message}")]
    Http { status: u16, message: String },

    #[error("GitHub GraphQL error: {0}")]
    GraphQl(String),

    #[error("Rate limit exceeded. Retry after {}s", .retry_after.as_secs())]
    RateLimited { retry_after: Duration },

    #[error("Authentication required")]
    AuthRequired,

    #[error("Repository not found: {0}")]
    RepoNotFound(String),

    #[error("Transport error: {0}")]
    Transport(#[from] HttpError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<GitHubError> for PlatformError {
    fn from(err: GitHubError) -> Self {
        match err {
            GitHubError::Http { status, message } => PlatformError::api_status(status, message),
            GitHubError::GraphQl(message) => PlatformError::api(message),
            GitHubError::RateLimited { retry_after } => PlatformError::RateLimited { retry_after },
            GitHubError::AuthRequired => PlatformError::AuthRequired,
            GitHubError::RepoNotFound(repo) => PlatformError::not_found(format!("repo: {repo}")),
            GitHubError::Transport(e) => PlatformError::network(e.to_string()),
            GitHubError::Internal(msg) => PlatformError::internal(msg),
        }
    }
}

/// Map a non-2xx HTTP response to an error.
///
/// Returns `None` for successful responses. 403 counts as a rate limit only
/// when GitHub says so through `retry-after` or an exhausted
/// `x-ratelimit-remaining`; otherwise it is a permission error.
pub fn classify_response(response: &HttpResponse, repo: &str) -> Option<GitHubError> {
    if response.is_success() {
        return None;
    }

    let status = response.status;
    let message = String::from_utf8_lossy(&response.body)
        .lines()
        .next()
        .unwrap_or_default()
        .to_string();

    Some(match status {
        401 => GitHubError::AuthRequired,
        403 | 429 => match rate_limit_delay(response) {
            Some(retry_after) => GitHubError::RateLimited { retry_after },
            None if status == 429 => GitHubError::RateLimited {
                retry_after: DEFAULT_RETRY_AFTER,
            },
            None => GitHubError::Http { status, message },
        },
        404 => GitHubError::RepoNotFound(repo.to_string()),
        _ => GitHubError::Http { status, message },
    })
}

/// Delay advertised by rate limit headers, if any.
fn rate_limit_delay(response: &HttpResponse) -> Option<Duration> {
    if let Some(secs) = response
        .header("retry-after")
        .and_then(|v| v.trim().parse::<u64>().ok())
    {
        return Some(Duration::from_secs(secs));
    }

    if response.header("x-ratelimit-remaining").map(str::trim) == Some("0") {
        let delay = response
            .header("x-ratelimit-reset")
            .and_then(|v| v.trim().parse::<i64>().ok())
            .map(|reset| Duration::from_secs((reset - Utc::now().timestamp()).max(0) as u64))
            .unwrap_or(DEFAULT_RETRY_AFTER);
        return Some(delay);
    }

    None
}

/// Map GraphQL-level errors returned with a 200 response.
pub(super) fn classify_graphql_errors(
    errors: &[GraphQlError],
    repo: &str,
    retry_after: Option<Duration>,
) -> GitHubError {
    let kind = |k: &str| {
        errors
            .iter()
            .any(|e| e.error_type.as_deref().is_some_and(|t| t.eq_ignore_ascii_case(k)))
    };

    if kind("RATE_LIMITED") {
        return GitHubError::RateLimited {
            retry_after: retry_after.unwrap_or(DEFAULT_RETRY_AFTER),
        };
    }
    if kind("NOT_FOUND") {
        return GitHubError::RepoNotFound(repo.to_string());
    }
    if kind("FORBIDDEN") {
        return GitHubError::AuthRequired;
    }

    let message = errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ");
    GitHubError::GraphQl(message)
}
