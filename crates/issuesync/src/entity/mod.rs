//! SeaORM entity definitions for the issuesync database schema.

pub mod issue;
pub mod issue_priority;
pub mod issue_status;
pub mod job_metadata;
pub mod prelude;
pub mod project;
pub mod repository;
pub mod sync_job;
pub mod sync_job_status;
