//! SyncJob entity - one synchronization run against one repository.
//!
//! Callers poll this row to observe progress; the engine is the only writer.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::entity::job_metadata::{ErrorDetails, JobMetadata};
use crate::entity::sync_job_status::{SyncJobStatus, SyncJobType};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sync_jobs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// The repository (target) being synchronized.
    pub repository_id: Uuid,
    pub job_type: SyncJobType,
    pub status: SyncJobStatus,

    // ─── Counters ────────────────────────────────────────────────────────────
    pub issues_processed: i32,
    pub issues_created: i32,
    pub issues_updated: i32,
    pub errors: i32,

    #[sea_orm(column_type = "Json")]
    pub error_details: ErrorDetails,
    #[sea_orm(column_type = "Json")]
    pub metadata: JobMetadata,

    /// Identity of the actor that triggered the job.
    pub created_by: String,
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
}

impl Related<super::repository::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Repository.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
