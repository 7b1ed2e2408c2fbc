//! Local issue rows.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder,
};
use uuid::Uuid;

use crate::entity::issue::{ActiveModel, Column, Entity as Issue, Model};

use super::errors::{Result, StoreError};

/// Insert a new issue row.
pub async fn insert(db: &DatabaseConnection, model: ActiveModel) -> Result<Model> {
    model.insert(db).await.map_err(StoreError::from)
}

/// Update an existing issue row. Only columns marked `Set` are written.
pub async fn update(db: &DatabaseConnection, model: ActiveModel) -> Result<Model> {
    model.update(db).await.map_err(StoreError::from)
}

/// Find the local row mirroring a remote issue.
pub async fn find_by_remote_id(
    db: &DatabaseConnection,
    repository_id: Uuid,
    remote_issue_id: i64,
) -> Result<Option<Model>> {
    Issue::find()
        .filter(Column::RepositoryId.eq(repository_id))
        .filter(Column::RemoteIssueId.eq(remote_issue_id))
        .one(db)
        .await
        .map_err(StoreError::from)
}

/// List a repository's issues, synced ones first by remote number.
pub async fn list_by_repository(db: &DatabaseConnection, repository_id: Uuid) -> Result<Vec<Model>> {
    Issue::find()
        .filter(Column::RepositoryId.eq(repository_id))
        .order_by_asc(Column::RemoteIssueNumber)
        .order_by_asc(Column::CreatedAt)
        .all(db)
        .await
        .map_err(StoreError::from)
}

/// Count a repository's issues.
pub async fn count_by_repository(db: &DatabaseConnection, repository_id: Uuid) -> Result<u64> {
    Issue::find()
        .filter(Column::RepositoryId.eq(repository_id))
        .count(db)
        .await
        .map_err(StoreError::from)
}
