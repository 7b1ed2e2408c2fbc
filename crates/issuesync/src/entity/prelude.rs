//! Common re-exports for convenient entity usage.

pub use super::issue::{
    ActiveModel as IssueActiveModel, Column as IssueColumn, Entity as Issue, Model as IssueModel,
};
pub use super::issue_priority::IssuePriority;
pub use super::issue_status::IssueStatus;
pub use super::job_metadata::{ErrorDetails, JobMetadata};
pub use super::project::{
    ActiveModel as ProjectActiveModel, Column as ProjectColumn, Entity as Project,
    Model as ProjectModel,
};
pub use super::repository::{
    ActiveModel as RepositoryActiveModel, Column as RepositoryColumn, Entity as Repository,
    Model as RepositoryModel,
};
pub use super::sync_job::{
    ActiveModel as SyncJobActiveModel, Column as SyncJobColumn, Entity as SyncJob,
    Model as SyncJobModel,
};
pub use super::sync_job_status::{SyncJobStatus, SyncJobType};
