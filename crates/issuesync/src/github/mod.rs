//! GitHub implementation of [`IssueSource`](crate::platform::IssueSource).
//!
//! Issues are listed through the GraphQL `repository.issues` connection,
//! which is cursor-paginated and reports the caller's rate limit budget in
//! the same response.
//!
//! # Module Structure
//!
//! - [`error`] - GitHub error type and HTTP/GraphQL error classification
//! - [`types`] - GraphQL request documents and response shapes
//! - [`client`] - [`GitHubClient`], the `IssueSource` implementation
//! - [`convert`] - Response node to [`RemoteIssueRecord`](crate::platform::RemoteIssueRecord)
//!
//! ```ignore
//! use issuesync::github::GitHubClient;
//!
//! let client = GitHubClient::from_token(&token)?
//!     .with_rate_limiter(ApiRateLimiter::new(10));
//! let page = client.fetch_issues(&query, None).await?;
//! ```

mod client;
mod convert;
mod error;
mod types;

pub use client::{DEFAULT_GRAPHQL_URL, GitHubClient};
pub use convert::to_remote_record;
pub use error::{GitHubError, classify_response};
pub use types::{BOUNDARY_QUERY, ISSUES_QUERY};
