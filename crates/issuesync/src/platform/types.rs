use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::Result;

/// Issue state as reported by the remote tracker.
///
/// Only `OPEN` and `CLOSED` are recognized; anything else is rejected at
/// reconciliation time rather than guessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RemoteIssueState {
    Open,
    Closed,
}

impl RemoteIssueState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Closed => "CLOSED",
        }
    }
}

impl fmt::Display for RemoteIssueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a raw state string is not a known issue state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized remote state: {0:?}")]
pub struct UnknownStateError(pub String);

impl FromStr for RemoteIssueState {
    type Err = UnknownStateError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("open") {
            Ok(Self::Open)
        } else if s.eq_ignore_ascii_case("closed") {
            Ok(Self::Closed)
        } else {
            Err(UnknownStateError(s.to_string()))
        }
    }
}

/// State of a pull request linked to an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullRequestState {
    Open,
    Closed,
    Merged,
}

impl PullRequestState {
    /// Parse a remote PR state. Unknown values are treated as closed since
    /// they cannot hold an issue in review.
    pub fn from_remote(s: &str) -> Self {
        if s.eq_ignore_ascii_case("open") {
            Self::Open
        } else if s.eq_ignore_ascii_case("merged") {
            Self::Merged
        } else {
            Self::Closed
        }
    }
}

/// Pull request referenced as closing an issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedPullRequest {
    pub id: i64,
    pub number: i64,
    pub state: PullRequestState,
}

/// One issue as fetched from the remote tracker (platform-agnostic).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteIssueRecord {
    /// Platform-specific numeric ID, stable across renames.
    pub remote_id: i64,
    /// User-facing issue number.
    pub number: i64,
    pub title: String,
    pub body: Option<String>,
    /// Raw state string, validated during reconciliation.
    pub state: String,
    /// First assignee login, if any. Informational only.
    pub assignee: Option<String>,
    pub linked_pull_request: Option<LinkedPullRequest>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

/// Parameters of an issue listing, fixed for the lifetime of a pager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueQuery {
    pub owner: String,
    pub name: String,
    /// State filter. Empty means all recognized states.
    pub states: Vec<RemoteIssueState>,
    /// Only issues updated at or after this instant.
    pub since: Option<DateTime<Utc>>,
    /// Page size requested from the remote.
    pub page_size: u32,
}

impl IssueQuery {
    /// Get the full name (owner/name).
    #[inline]
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// Rate limit hint attached to a successful response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitHint {
    /// Remaining requests in the current window.
    pub remaining: u32,
    /// When the window resets.
    pub reset_at: DateTime<Utc>,
}

impl RateLimitHint {
    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    /// Delay until the window resets, measured from `now`. Zero if already past.
    pub fn delay_from(&self, now: DateTime<Utc>) -> Duration {
        (self.reset_at - now).to_std().unwrap_or(Duration::ZERO)
    }
}

/// One page of issues plus the cursor to the next page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuePage {
    pub records: Vec<RemoteIssueRecord>,
    /// `None` when this was the last page.
    pub next_cursor: Option<String>,
    pub rate_limit: Option<RateLimitHint>,
}

/// Cursor information for a page without its records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageBoundary {
    pub next_cursor: Option<String>,
    pub rate_limit: Option<RateLimitHint>,
}

/// Remote issue listing executor.
///
/// Implementations perform exactly one request per call and classify
/// failures through [`PlatformError`]; waiting and retrying is left to the
/// caller.
#[async_trait]
pub trait IssueSource: Send + Sync {
    /// Fetch the page of issues starting after `cursor` (`None` = first page).
    async fn fetch_issues(&self, query: &IssueQuery, cursor: Option<&str>) -> Result<IssuePage>;

    /// Fetch only the cursor that follows the page starting after `cursor`.
    ///
    /// Used to step over a page whose full fetch keeps failing.
    async fn fetch_page_boundary(
        &self,
        query: &IssueQuery,
        cursor: Option<&str>,
    ) -> Result<PageBoundary>;
}
