//! Retriever - cross-collection search and aggregation.
//!
//! Aggregation policy: flatten all per-collection hits, sort by
//! similarity descending (ties broken by collection order, then original
//! rank), take the top-K overall, and deduplicate the derived source
//! label preserving first occurrence. The deduplicated label list is what
//! callers surface and persist; the hit list itself is request-scoped.

use crate::error::Result;
use crate::index::VectorIndex;
use crate::types::{RetrievalContext, RetrievalHit};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Default number of grounding snippets per turn.
pub const DEFAULT_TOP_K: usize = 4;

/// Document collections the assistant grounds against.
pub const KNOWN_COLLECTIONS: &[&str] = &[
    "college_courses",
    "faculty_info",
    "policies_procedures",
    "campus_facilities",
];

/// Cross-collection retriever over a vector-index capability.
pub struct Retriever {
    index: Arc<dyn VectorIndex>,
}

impl Retriever {
    /// Create a retriever over an index.
    #[must_use]
    pub fn new(index: Arc<dyn VectorIndex>) -> Self {
        Self { index }
    }

    /// Search one collection. An absent collection yields an empty list,
    /// not an error: callers treat empty as "no grounding available".
    #[instrument(skip(self, query, filter))]
    pub async fn search_collection(
        &self,
        query: &str,
        collection: &str,
        top_k: usize,
        filter: Option<&serde_json::Value>,
    ) -> Result<Vec<RetrievalHit>> {
        if !self.index.collections().iter().any(|c| c == collection) {
            debug!(collection, "Collection not loaded, returning no hits");
            return Ok(Vec::new());
        }

        let raw = self.index.query(collection, query, top_k, filter).await?;

        Ok(raw
            .into_iter()
            .map(|hit| RetrievalHit {
                similarity: normalize_similarity(hit.distance),
                source_file: hit.metadata.get("source_file").cloned(),
                document_type: hit.metadata.get("document_type").cloned(),
                content: hit.content,
                collection: collection.to_string(),
            })
            .collect())
    }

    /// Search every known collection. One collection's failure is logged
    /// and skipped; the rest proceed. Returns (collection, hits) pairs in
    /// collection order.
    #[instrument(skip(self, query))]
    pub async fn search_all(
        &self,
        query: &str,
        top_k: usize,
    ) -> Vec<(String, Vec<RetrievalHit>)> {
        let mut results = Vec::new();
        for collection in self.index.collections() {
            match self.search_collection(query, &collection, top_k, None).await {
                Ok(hits) => results.push((collection, hits)),
                Err(e) => {
                    warn!(collection = %collection, error = %e, "Collection search failed, skipping");
                }
            }
        }
        results
    }

    /// Build the grounding context for a query: top-K hits across all
    /// collections rendered as a prompt block, plus deduplicated sources.
    pub async fn build_context(&self, query: &str, top_k: usize) -> RetrievalContext {
        let per_collection = self.search_all(query, top_k).await;
        aggregate(per_collection, top_k)
    }
}

/// Map a backend distance to a similarity in [0, 1], 1.0 = exact match.
/// The same transform applies to every collection so cross-collection
/// ranking stays meaningful.
fn normalize_similarity(distance: f32) -> f32 {
    (1.0 - distance / 2.0).clamp(0.0, 1.0)
}

/// Flatten, rank, truncate, and dedup sources.
fn aggregate(per_collection: Vec<(String, Vec<RetrievalHit>)>, top_k: usize) -> RetrievalContext {
    // (collection index, original rank) carried for deterministic ties
    let mut flattened: Vec<(usize, usize, RetrievalHit)> = Vec::new();
    for (coll_idx, (_, hits)) in per_collection.into_iter().enumerate() {
        for (rank, hit) in hits.into_iter().enumerate() {
            flattened.push((coll_idx, rank, hit));
        }
    }

    if flattened.is_empty() {
        return RetrievalContext::default();
    }

    flattened.sort_by(|a, b| {
        b.2.similarity
            .partial_cmp(&a.2.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
            .then_with(|| a.1.cmp(&b.1))
    });
    flattened.truncate(top_k);

    let mut sources = Vec::new();
    let mut chunks = Vec::with_capacity(flattened.len());
    for (_, _, hit) in &flattened {
        let source = hit.source_label().to_string();
        if !sources.contains(&source) {
            sources.push(source.clone());
        }
        chunks.push(format!(
            "[Collection: {} | Source: {} | Sim: {:.3}]\n{}",
            hit.collection, source, hit.similarity, hit.content
        ));
    }

    RetrievalContext {
        block: Some(chunks.join("\n\n")),
        sources,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::index::RawHit;
    use std::collections::HashMap;

    /// Scripted index: fixed collections with fixed hits, optional
    /// per-collection failure.
    struct FakeIndex {
        collections: Vec<String>,
        hits: HashMap<String, Vec<RawHit>>,
        failing: Vec<String>,
    }

    impl FakeIndex {
        fn new() -> Self {
            Self {
                collections: Vec::new(),
                hits: HashMap::new(),
                failing: Vec::new(),
            }
        }

        fn with_collection(mut self, name: &str, hits: Vec<RawHit>) -> Self {
            self.collections.push(name.to_string());
            self.hits.insert(name.to_string(), hits);
            self
        }

        fn with_failing(mut self, name: &str) -> Self {
            self.collections.push(name.to_string());
            self.failing.push(name.to_string());
            self
        }
    }

    #[async_trait::async_trait]
    impl VectorIndex for FakeIndex {
        fn collections(&self) -> Vec<String> {
            self.collections.clone()
        }

        async fn query(
            &self,
            collection: &str,
            _text: &str,
            top_k: usize,
            _filter: Option<&serde_json::Value>,
        ) -> Result<Vec<RawHit>> {
            if self.failing.iter().any(|c| c == collection) {
                return Err(Error::Api("backend exploded".into()));
            }
            let mut hits = self.hits.get(collection).cloned().unwrap_or_default();
            hits.truncate(top_k);
            Ok(hits)
        }
    }

    fn raw(content: &str, distance: f32, source_file: Option<&str>) -> RawHit {
        let mut metadata = HashMap::new();
        if let Some(file) = source_file {
            metadata.insert("source_file".to_string(), file.to_string());
        }
        RawHit {
            content: content.to_string(),
            distance,
            metadata,
        }
    }

    #[test]
    fn test_similarity_normalization() {
        assert!((normalize_similarity(0.0) - 1.0).abs() < f32::EPSILON);
        assert!((normalize_similarity(2.0)).abs() < f32::EPSILON);
        // Out-of-range distances clamp instead of escaping [0, 1]
        assert!((normalize_similarity(4.0)).abs() < f32::EPSILON);
        assert!((normalize_similarity(-1.0) - 1.0).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_absent_collection_is_empty_not_error() {
        let retriever = Retriever::new(Arc::new(FakeIndex::new()));
        let hits = retriever
            .search_collection("anything", "college_courses", 4, None)
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_failing_collection_is_isolated() {
        let index = FakeIndex::new()
            .with_failing("college_courses")
            .with_collection("faculty_info", vec![raw("Dr. Rao teaches CS101", 0.2, None)]);
        let retriever = Retriever::new(Arc::new(index));

        let results = retriever.search_all("who teaches CS101", 4).await;
        // Failing collection skipped, surviving one present
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, "faculty_info");
        assert_eq!(results[0].1.len(), 1);
    }

    #[tokio::test]
    async fn test_aggregation_ranks_across_collections() {
        let index = FakeIndex::new()
            .with_collection(
                "college_courses",
                vec![
                    raw("course A", 0.8, Some("catalog.csv")),
                    raw("course B", 1.2, Some("catalog.csv")),
                ],
            )
            .with_collection(
                "policies_procedures",
                vec![raw("policy X", 0.2, Some("handbook.pdf"))],
            );
        let retriever = Retriever::new(Arc::new(index));

        let context = retriever.build_context("registration", 2).await;
        let block = context.block.unwrap();

        // Best hit first: policy X (sim 0.9) over course A (sim 0.6)
        let policy_pos = block.find("policy X").unwrap();
        let course_pos = block.find("course A").unwrap();
        assert!(policy_pos < course_pos);
        // course B (sim 0.4) truncated by top_k = 2
        assert!(!block.contains("course B"));

        assert_eq!(
            context.sources,
            vec!["handbook.pdf".to_string(), "catalog.csv".to_string()]
        );
    }

    #[tokio::test]
    async fn test_sources_dedup_preserves_first_occurrence() {
        let index = FakeIndex::new().with_collection(
            "college_courses",
            vec![
                raw("chunk 1", 0.2, Some("catalog.csv")),
                raw("chunk 2", 0.4, Some("catalog.csv")),
                raw("chunk 3", 0.6, Some("other.csv")),
            ],
        );
        let retriever = Retriever::new(Arc::new(index));

        let context = retriever.build_context("courses", 3).await;
        assert_eq!(
            context.sources,
            vec!["catalog.csv".to_string(), "other.csv".to_string()]
        );
    }

    #[tokio::test]
    async fn test_tie_breaks_follow_collection_then_rank() {
        let index = FakeIndex::new()
            .with_collection(
                "college_courses",
                vec![raw("first collection hit", 0.5, None)],
            )
            .with_collection(
                "faculty_info",
                vec![raw("second collection hit", 0.5, None)],
            );
        let retriever = Retriever::new(Arc::new(index));

        let context = retriever.build_context("tie", 2).await;
        let block = context.block.unwrap();
        let first = block.find("first collection hit").unwrap();
        let second = block.find("second collection hit").unwrap();
        assert!(first < second);
    }

    #[tokio::test]
    async fn test_empty_index_degrades_to_no_context() {
        let retriever = Retriever::new(Arc::new(FakeIndex::new()));
        let context = retriever.build_context("anything", 4).await;
        assert!(context.is_empty());
        assert!(context.sources.is_empty());
    }

    #[tokio::test]
    async fn test_missing_metadata_falls_back_to_collection_label() {
        let index = FakeIndex::new()
            .with_collection("campus_facilities", vec![raw("library hours", 0.3, None)]);
        let retriever = Retriever::new(Arc::new(index));

        let context = retriever.build_context("library", 4).await;
        assert_eq!(context.sources, vec!["campus_facilities".to_string()]);
    }
}
