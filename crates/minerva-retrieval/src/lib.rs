//! Minerva Retrieval - semantic search over institutional documents
//!
//! The vector index is an external collaborator behind the `VectorIndex`
//! capability trait (one concrete impl: the Chroma HTTP client). This
//! crate owns the aggregation logic: per-collection search, similarity
//! normalization, cross-collection ranking, and source deduplication.
//!
//! Retrieval never fails a chat turn. An absent collection yields an
//! empty list, a failing collection is skipped, and an empty index
//! degrades to "no documents found".

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod chroma;
pub mod error;
pub mod index;
pub mod retriever;
pub mod types;

pub use chroma::ChromaIndex;
pub use error::{Error, Result};
pub use index::{RawHit, VectorIndex};
pub use retriever::{Retriever, DEFAULT_TOP_K, KNOWN_COLLECTIONS};
pub use types::{RetrievalContext, RetrievalHit};
