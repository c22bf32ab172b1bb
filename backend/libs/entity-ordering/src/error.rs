//! Error types for the entity ordering library.

use thiserror::Error;

/// Result type alias for ordering operations.
pub type OrderingResult<T> = Result<T, OrderingError>;

/// Errors that can occur while maintaining an order column.
#[derive(Error, Debug)]
pub enum OrderingError {
    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Order column name is not a plain SQL identifier
    #[error("Invalid order column: {0}")]
    InvalidColumn(String),

    /// Entity referenced by a reorder request does not exist
    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    /// Non-SQL storage backend failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// No runtime or queue is available to accept a job
    #[error("Scheduler unavailable: {0}")]
    SchedulerUnavailable(String),

    /// Generic error with context
    #[error("Ordering error: {0}")]
    Other(#[from] anyhow::Error),
}

impl OrderingError {
    /// Operation label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            OrderingError::Database(_) => "database",
            OrderingError::InvalidColumn(_) => "invalid_column",
            OrderingError::EntityNotFound(_) => "not_found",
            OrderingError::Storage(_) => "storage",
            OrderingError::SchedulerUnavailable(_) => "scheduler",
            OrderingError::Other(_) => "other",
        }
    }
}
