//! Sync job table and the one-running-job-per-repository guard.

use sea_orm_migration::prelude::*;

use super::m20261018_000001_create_schema::Repositories;

/// Partial unique index backing atomic job admission: inserting a second
/// `running` row for the same repository fails with a unique violation.
const RUNNING_JOB_INDEX: &str = "idx_sync_jobs_one_running_per_repository";

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SyncJobs::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(SyncJobs::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(SyncJobs::RepositoryId).uuid().not_null())
                    .col(
                        ColumnDef::new(SyncJobs::JobType)
                            .string()
                            .not_null()
                            .default("issues"),
                    )
                    .col(
                        ColumnDef::new(SyncJobs::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(SyncJobs::IssuesProcessed)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SyncJobs::IssuesCreated)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SyncJobs::IssuesUpdated)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SyncJobs::Errors)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SyncJobs::ErrorDetails)
                            .json()
                            .not_null()
                            .default(Expr::cust("'[]'")),
                    )
                    .col(
                        ColumnDef::new(SyncJobs::Metadata)
                            .json()
                            .not_null()
                            .default(Expr::cust("'{}'")),
                    )
                    .col(ColumnDef::new(SyncJobs::CreatedBy).string().not_null())
                    .col(
                        ColumnDef::new(SyncJobs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(SyncJobs::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(SyncJobs::CompletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sync_jobs_repository")
                            .from(SyncJobs::Table, SyncJobs::RepositoryId)
                            .to(Repositories::Table, Repositories::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sync_jobs_repository_created")
                    .table(SyncJobs::Table)
                    .col(SyncJobs::RepositoryId)
                    .col((SyncJobs::CreatedAt, IndexOrder::Desc))
                    .to_owned(),
            )
            .await?;

        // Partial indexes are not expressible through the index builder;
        // both SQLite and Postgres accept this statement verbatim.
        let db = manager.get_connection();
        db.execute_unprepared(&format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS {RUNNING_JOB_INDEX} \
             ON sync_jobs (repository_id) WHERE status = 'running'"
        ))
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(&format!("DROP INDEX IF EXISTS {RUNNING_JOB_INDEX}"))
            .await?;
        manager
            .drop_table(Table::drop().table(SyncJobs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum SyncJobs {
    Table,
    Id,
    RepositoryId,
    JobType,
    Status,
    IssuesProcessed,
    IssuesCreated,
    IssuesUpdated,
    Errors,
    ErrorDetails,
    Metadata,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
    CompletedAt,
}
