//! Error types for minerva-core

use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// Caller supplied an empty message list
    #[error("messages cannot be empty")]
    EmptyConversation,

    /// Identity operation failed (token encoding, store access)
    #[error("auth error: {0}")]
    Auth(String),

    /// Record store failure surfaced at the request boundary
    #[error("store error: {0}")]
    Store(#[from] minerva_store::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
