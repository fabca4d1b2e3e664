//! Error types for minerva-store

use thiserror::Error;

/// Store error type
#[derive(Debug, Error)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Invalid input rejected before reaching the database
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Serialization of a persisted column failed
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error (filesystem, pool setup)
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
