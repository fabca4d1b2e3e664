//! Retrieval result types. Hits live for a single request; only the
//! deduplicated source labels are persisted.

use serde::{Deserialize, Serialize};

/// One grounding snippet with its provenance and normalized similarity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalHit {
    /// Snippet text
    pub content: String,
    /// Collection the hit came from
    pub collection: String,
    /// Originating file, when the metadata carries one
    pub source_file: Option<String>,
    /// Document-type label, when the metadata carries one
    pub document_type: Option<String>,
    /// Similarity in [0, 1], 1.0 = exact match, comparable across collections
    pub similarity: f32,
}

impl RetrievalHit {
    /// The most specific available source label:
    /// source file, else document type, else collection name.
    #[must_use]
    pub fn source_label(&self) -> &str {
        self.source_file
            .as_deref()
            .or(self.document_type.as_deref())
            .unwrap_or(&self.collection)
    }
}

/// Aggregated grounding for one query.
#[derive(Debug, Clone, Default)]
pub struct RetrievalContext {
    /// Rendered context block for the prompt; `None` when nothing was found
    pub block: Option<String>,
    /// Deduplicated source labels, first-occurrence order
    pub sources: Vec<String>,
}

impl RetrievalContext {
    /// Whether any grounding was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.block.is_none()
    }
}
