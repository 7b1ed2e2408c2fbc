//! Local workflow status for issues.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Workflow status of a local issue.
///
/// Only `open`, `review` and `completed` are ever derived from remote data;
/// `in_progress` and `cancelled` are set by people.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    #[sea_orm(string_value = "open")]
    #[default]
    Open,
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    #[sea_orm(string_value = "review")]
    Review,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl IssueStatus {
    /// Whether the status ends the issue's workflow.
    pub fn is_terminal(self) -> bool {
        matches!(self, IssueStatus::Completed | IssueStatus::Cancelled)
    }
}

impl std::fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IssueStatus::Open => write!(f, "open"),
            IssueStatus::InProgress => write!(f, "in_progress"),
            IssueStatus::Review => write!(f, "review"),
            IssueStatus::Completed => write!(f, "completed"),
            IssueStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}
