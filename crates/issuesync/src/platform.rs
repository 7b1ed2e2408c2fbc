//! Platform-agnostic view of the remote issue tracker.
//!
//! This module defines the [`IssueSource`] trait the sync engine pages
//! through, the records it yields, and the classified [`PlatformError`].
//!
//! # Example
//!
//! ```ignore
//! use issuesync::platform::{IssueQuery, IssueSource};
//!
//! async fn first_page<S: IssueSource>(source: &S, query: &IssueQuery) -> usize {
//!     match source.fetch_issues(query, None).await {
//!         Ok(page) => page.records.len(),
//!         Err(_) => 0,
//!     }
//! }
//! ```

mod errors;
mod rate_limit;
mod types;

pub use errors::{PlatformError, Result, short_error_message};
pub use rate_limit::{ApiRateLimiter, rate_limits};
pub use types::{
    IssuePage, IssueQuery, IssueSource, LinkedPullRequest, PageBoundary, PullRequestState,
    RateLimitHint, RemoteIssueRecord, RemoteIssueState, UnknownStateError,
};
