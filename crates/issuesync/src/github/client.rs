//! GitHub GraphQL client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::json;

use super::convert::to_remote_record;
use super::error::{GitHubError, classify_graphql_errors, classify_response};
use super::types::{
    BOUNDARY_QUERY, BoundaryConnection, GraphQlResponse, ISSUES_QUERY, IssueConnection,
    IssuesData, RateLimitNode,
};
use crate::http::{HttpHeaders, HttpRequest, HttpTransport};
use crate::platform::{
    ApiRateLimiter, IssuePage, IssueQuery, IssueSource, PageBoundary, PlatformError,
    RateLimitHint,
};

/// Public GitHub GraphQL endpoint.
pub const DEFAULT_GRAPHQL_URL: &str = "https://api.github.com/graphql";

/// Default request timeout for the reqwest transport.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// GitHub client implementing [`IssueSource`].
#[derive(Clone)]
pub struct GitHubClient {
    transport: Arc<dyn HttpTransport>,
    token: Arc<String>,
    api_url: String,
    rate_limiter: Option<ApiRateLimiter>,
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("api_url", &self.api_url)
            .field("rate_limited", &self.rate_limiter.is_some())
            .finish_non_exhaustive()
    }
}

impl GitHubClient {
    /// Create a client over an arbitrary transport.
    pub fn new(token: impl Into<String>, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            token: Arc::new(token.into()),
            api_url: DEFAULT_GRAPHQL_URL.to_string(),
            rate_limiter: None,
        }
    }

    /// Create a client backed by reqwest.
    pub fn from_token(token: impl Into<String>) -> Result<Self, GitHubError> {
        use crate::http::reqwest_transport::ReqwestTransport;

        let transport = ReqwestTransport::with_timeout(DEFAULT_TIMEOUT)?;
        Ok(Self::new(token, Arc::new(transport)))
    }

    /// Point the client at a different GraphQL endpoint (GitHub Enterprise).
    #[must_use]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Pace every request through `limiter`.
    #[must_use]
    pub fn with_rate_limiter(mut self, limiter: ApiRateLimiter) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    /// Wait for rate limiter if one is configured.
    async fn wait_for_rate_limit(&self) {
        if let Some(ref limiter) = self.rate_limiter {
            limiter.wait().await;
        }
    }

    fn variables(query: &IssueQuery, cursor: Option<&str>) -> serde_json::Value {
        let states = if query.states.is_empty() {
            serde_json::Value::Null
        } else {
            json!(query.states.iter().map(|s| s.as_str()).collect::<Vec<_>>())
        };

        json!({
            "owner": query.owner,
            "name": query.name,
            "first": query.page_size,
            "after": cursor,
            "states": states,
            "since": query.since.map(|s| s.to_rfc3339()),
        })
    }

    /// Run one GraphQL request and decode the `repository.issues` connection.
    async fn execute<C: DeserializeOwned>(
        &self,
        document: &str,
        query: &IssueQuery,
        cursor: Option<&str>,
    ) -> Result<(C, Option<RateLimitHint>), GitHubError> {
        self.wait_for_rate_limit().await;

        let repo = query.full_name();
        let headers: HttpHeaders = vec![
            ("Authorization".to_string(), format!("Bearer {}", self.token)),
            ("Accept".to_string(), "application/json".to_string()),
        ];
        let body = json!({ "query": document, "variables": Self::variables(query, cursor) });
        let request = HttpRequest::post_json(&self.api_url, headers, &body);

        let response = self.transport.send(request).await?;
        if let Some(err) = classify_response(&response, &repo) {
            return Err(err);
        }

        let envelope: GraphQlResponse<IssuesData<C>> = serde_json::from_slice(&response.body)
            .map_err(|e| GitHubError::Internal(format!("invalid GraphQL response: {e}")))?;

        let rate_limit = envelope
            .data
            .as_ref()
            .and_then(|d| d.rate_limit.as_ref())
            .map(to_hint);

        if !envelope.errors.is_empty() {
            let retry_after = rate_limit
                .as_ref()
                .filter(|h| h.is_exhausted())
                .map(|h| h.delay_from(Utc::now()));
            return Err(classify_graphql_errors(&envelope.errors, &repo, retry_after));
        }

        let issues = envelope
            .data
            .and_then(|d| d.repository)
            .map(|r| r.issues)
            .ok_or(GitHubError::RepoNotFound(repo))?;

        Ok((issues, rate_limit))
    }
}

fn to_hint(node: &RateLimitNode) -> RateLimitHint {
    RateLimitHint {
        remaining: node.remaining,
        reset_at: node.reset_at,
    }
}

#[async_trait]
impl IssueSource for GitHubClient {
    async fn fetch_issues(
        &self,
        query: &IssueQuery,
        cursor: Option<&str>,
    ) -> Result<IssuePage, PlatformError> {
        let (connection, rate_limit): (IssueConnection, _) =
            self.execute(ISSUES_QUERY, query, cursor).await?;

        let mut records = Vec::with_capacity(connection.nodes.len());
        for node in connection.nodes.iter().flatten() {
            match to_remote_record(node) {
                Some(record) => records.push(record),
                None => tracing::warn!(
                    repo = %query.full_name(),
                    number = node.number,
                    "issue without databaseId skipped"
                ),
            }
        }

        tracing::debug!(
            repo = %query.full_name(),
            records = records.len(),
            has_next = connection.page_info.has_next_page,
            "fetched issue page"
        );

        Ok(IssuePage {
            records,
            next_cursor: connection.page_info.next_cursor(),
            rate_limit,
        })
    }

    async fn fetch_page_boundary(
        &self,
        query: &IssueQuery,
        cursor: Option<&str>,
    ) -> Result<PageBoundary, PlatformError> {
        let (connection, rate_limit): (BoundaryConnection, _) =
            self.execute(BOUNDARY_QUERY, query, cursor).await?;

        Ok(PageBoundary {
            next_cursor: connection.page_info.next_cursor(),
            rate_limit,
        })
    }
}
