//! Repositories (sync targets) and their projects.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use uuid::Uuid;

use crate::entity::project::{
    ActiveModel as ProjectActiveModel, Column as ProjectColumn, Entity as Project,
    Model as ProjectModel,
};
use crate::entity::repository::{
    ActiveModel as RepositoryActiveModel, Column as RepositoryColumn, Entity as Repository,
    Model as RepositoryModel,
};

use super::errors::{Result, StoreError};

// ─── Repositories ────────────────────────────────────────────────────────────

/// Find a repository by its UUID.
pub async fn find_repository(db: &DatabaseConnection, id: Uuid) -> Result<Option<RepositoryModel>> {
    Repository::find_by_id(id)
        .one(db)
        .await
        .map_err(StoreError::from)
}

/// Find a repository by `owner/name`.
pub async fn find_repository_by_full_name(
    db: &DatabaseConnection,
    full_name: &str,
) -> Result<Option<RepositoryModel>> {
    Repository::find()
        .filter(RepositoryColumn::FullName.eq(full_name))
        .one(db)
        .await
        .map_err(StoreError::from)
}

/// List all repositories ordered by full name.
pub async fn list_repositories(db: &DatabaseConnection) -> Result<Vec<RepositoryModel>> {
    Repository::find()
        .order_by_asc(RepositoryColumn::FullName)
        .all(db)
        .await
        .map_err(StoreError::from)
}

/// Split `owner/name`, rejecting empty segments and extra slashes.
fn split_full_name(full_name: &str) -> Result<(&str, &str)> {
    match full_name.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
            Ok((owner, name))
        }
        _ => Err(StoreError::invalid_input(format!(
            "expected owner/name, got {full_name:?}"
        ))),
    }
}

fn repository_model(full_name: &str, remote_id: i64) -> Result<RepositoryActiveModel> {
    let (owner, name) = split_full_name(full_name)?;
    let now = Utc::now().fixed_offset();
    Ok(RepositoryActiveModel {
        id: Set(Uuid::new_v4()),
        remote_id: Set(remote_id),
        owner: Set(Some(owner.to_string())),
        name: Set(name.to_string()),
        full_name: Set(full_name.to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    })
}

// ─── Projects ────────────────────────────────────────────────────────────────

/// The project synced issues attach to: the repository's oldest project.
pub async fn default_project(
    db: &DatabaseConnection,
    repository_id: Uuid,
) -> Result<Option<ProjectModel>> {
    Project::find()
        .filter(ProjectColumn::RepositoryId.eq(repository_id))
        .order_by_asc(ProjectColumn::CreatedAt)
        .order_by_asc(ProjectColumn::Id)
        .one(db)
        .await
        .map_err(StoreError::from)
}

fn project_model(repository_id: Uuid, name: &str) -> Result<ProjectActiveModel> {
    let name = name.trim();
    if name.is_empty() {
        return Err(StoreError::invalid_input("project name must not be empty"));
    }
    Ok(ProjectActiveModel {
        id: Set(Uuid::new_v4()),
        repository_id: Set(repository_id),
        name: Set(name.to_string()),
        created_at: Set(Utc::now().fixed_offset()),
    })
}

/// Add a project to an existing repository.
pub async fn insert_project(
    db: &DatabaseConnection,
    repository_id: Uuid,
    name: &str,
) -> Result<ProjectModel> {
    if find_repository(db, repository_id).await?.is_none() {
        return Err(StoreError::repository_not_found(repository_id));
    }
    project_model(repository_id, name)?
        .insert(db)
        .await
        .map_err(StoreError::from)
}

/// Register a repository together with its first project, atomically.
///
/// # Errors
/// `InvalidInput` for a malformed `full_name` or empty project name;
/// `Database` if the remote id is already registered.
pub async fn register(
    db: &DatabaseConnection,
    full_name: &str,
    remote_id: i64,
    project_name: &str,
) -> Result<(RepositoryModel, ProjectModel)> {
    let repository = repository_model(full_name, remote_id)?;
    let txn = db.begin().await?;

    let repository = repository.insert(&txn).await?;
    let project = project_model(repository.id, project_name)?
        .insert(&txn)
        .await?;

    txn.commit().await?;
    tracing::debug!(repo = %repository.full_name, project = %project.name, "registered repository");
    Ok((repository, project))
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn split_full_name_accepts_owner_name() {
        assert_eq!(split_full_name("octo/widgets").ok(), Some(("octo", "widgets")));
    }

    #[test]
    fn split_full_name_rejects_malformed_input() {
        for bad in ["octo", "/widgets", "octo/", "a/b/c", ""] {
            assert!(
                matches!(split_full_name(bad), Err(StoreError::InvalidInput { .. })),
                "{bad:?} should be rejected"
            );
        }
    }
}
