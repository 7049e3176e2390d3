/// Unified error types for the moderation analytics core
use thiserror::Error;

/// Main error type for the analytics core
#[derive(Error, Debug)]
pub enum ModError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Validation errors, raised before any I/O is attempted
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for analytics operations
pub type ModResult<T> = Result<T, ModError>;
