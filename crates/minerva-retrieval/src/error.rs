//! Error types for minerva-retrieval

use thiserror::Error;

/// Retrieval error type
#[derive(Debug, Error)]
pub enum Error {
    /// Index backend unreachable or not initialized
    #[error("index unavailable: {0}")]
    Unavailable(String),

    /// Network error talking to the index backend
    #[error("network error: {0}")]
    Network(String),

    /// Index backend returned an error
    #[error("index error: {0}")]
    Api(String),

    /// Response could not be decoded
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
