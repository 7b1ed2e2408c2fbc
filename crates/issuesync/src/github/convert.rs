//! Conversion from GraphQL nodes to platform-agnostic records.

use crate::platform::{LinkedPullRequest, PullRequestState, RemoteIssueRecord};

use super::types::IssueNode;

/// Convert an issue node into a [`RemoteIssueRecord`].
///
/// Returns `None` for nodes without a `databaseId`; such nodes cannot be
/// matched against local rows. The state string is passed through
/// unvalidated.
pub fn to_remote_record(node: &IssueNode) -> Option<RemoteIssueRecord> {
    let remote_id = node.database_id?;

    let linked_pull_request = node
        .closed_by_pull_requests_references
        .as_ref()
        .and_then(|refs| refs.first())
        .and_then(|pr| {
            Some(LinkedPullRequest {
                id: pr.database_id?,
                number: pr.number,
                state: PullRequestState::from_remote(&pr.state),
            })
        });

    Some(RemoteIssueRecord {
        remote_id,
        number: node.number,
        title: node.title.clone(),
        body: node.body.clone().filter(|b| !b.is_empty()),
        state: node.state.clone(),
        assignee: node
            .assignees
            .as_ref()
            .and_then(|a| a.first())
            .map(|a| a.login.clone()),
        linked_pull_request,
        created_at: node.created_at,
        updated_at: node.updated_at,
        closed_at: node.closed_at,
    })
}
