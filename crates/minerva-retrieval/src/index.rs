//! The vector-index capability consumed by the retriever.

use crate::error::Result;
use std::collections::HashMap;

/// A raw hit as returned by the index backend, before similarity
/// normalization.
#[derive(Debug, Clone)]
pub struct RawHit {
    /// Document text
    pub content: String,
    /// Backend distance (metric-specific; lower = closer)
    pub distance: f32,
    /// Document metadata (source_file, document_type, ...)
    pub metadata: HashMap<String, String>,
}

/// Capability trait for a vector index holding named collections.
///
/// Implementations must be safe for concurrent reads; the retriever
/// issues one query per known collection per turn.
#[async_trait::async_trait]
pub trait VectorIndex: Send + Sync {
    /// Loaded collection names, in a stable order.
    fn collections(&self) -> Vec<String>;

    /// Query one collection. Implementations should bound the call with a
    /// timeout; errors are isolated per collection by the retriever.
    async fn query(
        &self,
        collection: &str,
        text: &str,
        top_k: usize,
        filter: Option<&serde_json::Value>,
    ) -> Result<Vec<RawHit>>;
}
