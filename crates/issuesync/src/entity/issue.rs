//! Issue entity - the durable local representation of an issue.
//!
//! Rows synced from the remote forge carry `remote_issue_id`; rows created
//! locally leave it null and are never touched by sync.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::entity::issue_priority::IssuePriority;
use crate::entity::issue_status::IssueStatus;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "issues")]
pub struct Model {
    /// Internal UUID primary key.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    // ─── Ownership ───────────────────────────────────────────────────────────
    pub project_id: Uuid,
    pub repository_id: Uuid,

    // ─── Remote Identity ─────────────────────────────────────────────────────
    /// Issue number on the forge (`#123`).
    pub remote_issue_number: Option<i64>,
    /// Numeric database ID on the forge. Unique per repository when set.
    pub remote_issue_id: Option<i64>,

    // ─── Content ─────────────────────────────────────────────────────────────
    pub title: String,
    /// Human-authored description, mirrored from the remote body.
    #[sea_orm(column_type = "Text", nullable)]
    pub original_description: Option<String>,
    /// Derived/expanded description produced by local enrichment.
    /// Never written by sync.
    #[sea_orm(column_type = "Text", nullable)]
    pub expanded_description: Option<String>,

    // ─── Workflow ────────────────────────────────────────────────────────────
    pub status: IssueStatus,
    pub priority: IssuePriority,
    pub created_by: String,
    pub assigned_to: Option<String>,

    // ─── Linked Pull Request ─────────────────────────────────────────────────
    pub remote_pr_number: Option<i64>,
    pub remote_pr_id: Option<i64>,

    // ─── Timestamps ──────────────────────────────────────────────────────────
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub completed_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::repository::Entity",
        from = "Column::RepositoryId",
        to = "super::repository::Column::Id"
    )]
    Repository,
    #[sea_orm(
        belongs_to = "super::project::Entity",
        from = "Column::ProjectId",
        to = "super::project::Column::Id"
    )]
    Project,
}

impl Related<super::repository::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Repository.def()
    }
}

impl Related<super::project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Project.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Whether this row originated on the remote forge.
    pub fn is_synced(&self) -> bool {
        self.remote_issue_id.is_some()
    }
}
