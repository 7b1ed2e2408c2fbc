//! Initial migration: repositories, projects and issues.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        self.create_repositories(manager).await?;
        self.create_projects(manager).await?;
        self.create_issues(manager).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Issues::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Projects::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Repositories::Table).to_owned())
            .await?;
        Ok(())
    }
}

impl Migration {
    async fn create_repositories(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Repositories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Repositories::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Repositories::RemoteId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Repositories::Owner).string().null())
                    .col(ColumnDef::new(Repositories::Name).string().not_null())
                    .col(ColumnDef::new(Repositories::FullName).string().not_null())
                    .col(
                        ColumnDef::new(Repositories::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Repositories::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_repositories_remote_id")
                    .table(Repositories::Table)
                    .col(Repositories::RemoteId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn create_projects(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Projects::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Projects::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Projects::RepositoryId).uuid().not_null())
                    .col(ColumnDef::new(Projects::Name).string().not_null())
                    .col(
                        ColumnDef::new(Projects::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_projects_repository")
                            .from(Projects::Table, Projects::RepositoryId)
                            .to(Repositories::Table, Repositories::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_projects_repository")
                    .table(Projects::Table)
                    .col(Projects::RepositoryId)
                    .col(Projects::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn create_issues(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Issues::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Issues::Id).uuid().not_null().primary_key())
                    // Ownership
                    .col(ColumnDef::new(Issues::ProjectId).uuid().not_null())
                    .col(ColumnDef::new(Issues::RepositoryId).uuid().not_null())
                    // Remote identity
                    .col(
                        ColumnDef::new(Issues::RemoteIssueNumber)
                            .big_integer()
                            .null(),
                    )
                    .col(ColumnDef::new(Issues::RemoteIssueId).big_integer().null())
                    // Content
                    .col(ColumnDef::new(Issues::Title).string().not_null())
                    .col(ColumnDef::new(Issues::OriginalDescription).text().null())
                    .col(ColumnDef::new(Issues::ExpandedDescription).text().null())
                    // Workflow
                    .col(
                        ColumnDef::new(Issues::Status)
                            .string()
                            .not_null()
                            .default("open"),
                    )
                    .col(
                        ColumnDef::new(Issues::Priority)
                            .string()
                            .not_null()
                            .default("medium"),
                    )
                    .col(ColumnDef::new(Issues::CreatedBy).string().not_null())
                    .col(ColumnDef::new(Issues::AssignedTo).string().null())
                    // Linked pull request
                    .col(ColumnDef::new(Issues::RemotePrNumber).big_integer().null())
                    .col(ColumnDef::new(Issues::RemotePrId).big_integer().null())
                    // Timestamps
                    .col(
                        ColumnDef::new(Issues::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Issues::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Issues::CompletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_issues_repository")
                            .from(Issues::Table, Issues::RepositoryId)
                            .to(Repositories::Table, Repositories::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_issues_project")
                            .from(Issues::Table, Issues::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // A remote issue maps to at most one local row per repository.
        // Local-only rows (NULL remote id) are exempt since NULLs never collide.
        manager
            .create_index(
                Index::create()
                    .name("idx_issues_repository_remote_id")
                    .table(Issues::Table)
                    .col(Issues::RepositoryId)
                    .col(Issues::RemoteIssueId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_issues_project")
                    .table(Issues::Table)
                    .col(Issues::ProjectId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
pub(super) enum Repositories {
    Table,
    Id,
    RemoteId,
    Owner,
    Name,
    FullName,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Projects {
    Table,
    Id,
    RepositoryId,
    Name,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Issues {
    Table,
    Id,
    ProjectId,
    RepositoryId,
    RemoteIssueNumber,
    RemoteIssueId,
    Title,
    OriginalDescription,
    ExpandedDescription,
    Status,
    Priority,
    CreatedBy,
    AssignedTo,
    RemotePrNumber,
    RemotePrId,
    CreatedAt,
    UpdatedAt,
    CompletedAt,
}
