//! Error types for minerva-tools
//!
//! These never cross back into the orchestrator: the dispatcher converts
//! every variant into a structured tool result.

use thiserror::Error;

/// Tool error type
#[derive(Debug, Error)]
pub enum Error {
    /// Underlying record store failed
    #[error("store error: {0}")]
    Store(#[from] minerva_store::Error),

    /// Arguments did not match the tool's schema
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
