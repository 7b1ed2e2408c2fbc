//! Repository entity - the sync target.
//!
//! A repository row links the local workspace to one repository on the remote
//! forge. Its coordinates (`owner`/`name`) are what the sync engine sends to
//! the remote API.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Repository model - one remote repository tracked locally.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "repositories")]
pub struct Model {
    /// Internal UUID primary key.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Numeric ID of the repository on the remote forge.
    pub remote_id: i64,

    /// Owner login (user or organization). May be absent on older rows,
    /// in which case it is derived from `full_name`.
    pub owner: Option<String>,
    /// Repository name (URL-safe slug).
    pub name: String,
    /// Full `owner/name` as reported by the forge.
    pub full_name: String,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::project::Entity")]
    Projects,
    #[sea_orm(has_many = "super::issue::Entity")]
    Issues,
    #[sea_orm(has_many = "super::sync_job::Entity")]
    SyncJobs,
}

impl Related<super::project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Projects.def()
    }
}

impl Related<super::issue::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Issues.def()
    }
}

impl Related<super::sync_job::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SyncJobs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Resolve the remote `(owner, name)` coordinates.
    ///
    /// Prefers the explicit `owner`/`name` columns and falls back to splitting
    /// `full_name`. Returns `None` when neither source yields two non-empty
    /// segments.
    pub fn remote_coordinates(&self) -> Option<(String, String)> {
        let (full_owner, full_name) = match self.full_name.split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() => {
                (Some(owner), Some(name))
            }
            _ => (None, None),
        };

        let owner = self
            .owner
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(full_owner)?;
        let name = Some(self.name.as_str())
            .filter(|s| !s.is_empty())
            .or(full_name)?;

        Some((owner.to_string(), name.to_string()))
    }
}
