//! Persistence operations over the issuesync entities.
//!
//! Free functions taking a [`DatabaseConnection`](sea_orm::DatabaseConnection),
//! grouped by table family:
//!
//! - [`targets`] - repositories and their projects
//! - [`issues`] - local issue rows
//! - [`jobs`] - sync jobs, including atomic admission

mod errors;
pub mod issues;
pub mod jobs;
pub mod targets;

pub use errors::{Result, StoreError};
