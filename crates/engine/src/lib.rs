//! Vector store engine for vectormap
//!
//! This crate turns a partitioned key-value map into a similarity store:
//! - DocumentStore: documents persisted in the map, index kept in step
//! - VectorIndex: flat / binary / HNSW candidate generation
//! - search: exact re-scoring, threshold, ordering and truncation
//! - VectorStore: the caller-facing facade (embedding, filters, batches)
//!
//! The map is the only source of truth. Indexes live in process memory and
//! are rebuilt from a map scan whenever a store is opened.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod distance;
pub mod error;
pub mod index;
pub mod record;
pub mod search;
pub mod store;
pub mod vector_store;

pub use distance::{normalize, score, similarity};
pub use error::{VectorStoreError, VectorStoreResult};
pub use index::VectorIndex;
pub use record::StoredDocument;
pub use search::{
    search, SearchOptions, SearchQuery, SearchRequest, SimilarityThreshold, DEFAULT_TOP_K,
};
pub use store::DocumentStore;
pub use vector_store::VectorStore;
