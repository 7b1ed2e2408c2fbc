//! GraphQL documents and response shapes for issue listing.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Issue page query. `$states: null` lists every state.
pub const ISSUES_QUERY: &str = r#"
query IssuePage($owner: String!, $name: String!, $first: Int!, $after: String, $states: [IssueState!], $since: DateTime) {
  repository(owner: $owner, name: $name) {
    issues(first: $first, after: $after, states: $states, filterBy: {since: $since}, orderBy: {field: UPDATED_AT, direction: ASC}) {
      pageInfo { hasNextPage endCursor }
      nodes {
        databaseId
        number
        title
        body
        state
        createdAt
        updatedAt
        closedAt
        assignees(first: 1) { nodes { login } }
        closedByPullRequestsReferences(first: 1, includeClosedPrs: true) {
          nodes { databaseId number state }
        }
      }
    }
  }
  rateLimit { remaining resetAt }
}
"#;

/// Same connection as [`ISSUES_QUERY`] but only the page cursor.
pub const BOUNDARY_QUERY: &str = r#"
query IssuePageBoundary($owner: String!, $name: String!, $first: Int!, $after: String, $states: [IssueState!], $since: DateTime) {
  repository(owner: $owner, name: $name) {
    issues(first: $first, after: $after, states: $states, filterBy: {since: $since}, orderBy: {field: UPDATED_AT, direction: ASC}) {
      pageInfo { hasNextPage endCursor }
    }
  }
  rateLimit { remaining resetAt }
}
"#;

/// GraphQL response envelope.
#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlError {
    #[serde(rename = "type")]
    pub error_type: Option<String>,
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuesData<C> {
    pub repository: Option<RepositoryNode<C>>,
    pub rate_limit: Option<RateLimitNode>,
}

#[derive(Debug, Deserialize)]
pub struct RepositoryNode<C> {
    pub issues: C,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueConnection {
    pub page_info: PageInfo,
    #[serde(default)]
    pub nodes: Vec<Option<IssueNode>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundaryConnection {
    pub page_info: PageInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

impl PageInfo {
    /// Cursor of the next page, or `None` at the end of the connection.
    pub fn next_cursor(&self) -> Option<String> {
        if self.has_next_page {
            self.end_cursor.clone()
        } else {
            None
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitNode {
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueNode {
    pub database_id: Option<i64>,
    pub number: i64,
    pub title: String,
    pub body: Option<String>,
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub assignees: Option<NodeList<ActorNode>>,
    pub closed_by_pull_requests_references: Option<NodeList<PullRequestNode>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeList<T> {
    #[serde(default = "Vec::new")]
    pub nodes: Vec<Option<T>>,
}

impl<T> NodeList<T> {
    pub fn first(&self) -> Option<&T> {
        self.nodes.iter().flatten().next()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActorNode {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestNode {
    pub database_id: Option<i64>,
    pub number: i64,
    pub state: String,
}
