use sea_orm::{DbErr, SqlErr};
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from sea-orm.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// Row not found.
    #[error("Not found: {context}")]
    NotFound { context: String },

    /// A running job already exists for the repository.
    #[error("A sync job is already running for repository {repository_id}")]
    AlreadyRunning { repository_id: Uuid },

    /// Invalid input data.
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },
}

impl StoreError {
    pub fn repository_not_found(id: Uuid) -> Self {
        Self::NotFound {
            context: format!("repository id={id}"),
        }
    }

    pub fn job_not_found(id: Uuid) -> Self {
        Self::NotFound {
            context: format!("sync job id={id}"),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Whether the failure is worth retrying (lock contention, dropped
    /// connections).
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Database(db_err) => is_retryable_db_error(db_err),
            _ => false,
        }
    }

    /// Whether the failure is a unique constraint violation.
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            Self::Database(db_err) if matches!(db_err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
        )
    }
}

fn is_retryable_db_error(err: &DbErr) -> bool {
    match err {
        DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => true,
        DbErr::Exec(_) | DbErr::Query(_) => {
            let err_str = err.to_string().to_lowercase();
            // SQLite: database is locked, busy
            // PostgreSQL: connection refused, too many connections
            err_str.contains("locked")
                || err_str.contains("busy")
                || err_str.contains("timeout")
                || err_str.contains("connection")
                || err_str.contains("temporarily unavailable")
        }
        _ => false,
    }
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
