//! vectormap - metadata-filterable vector similarity store
//!
//! Documents (id, text, scalar metadata) are embedded by an
//! [`EmbeddingModel`], stored in a named partitioned key-value map and
//! searched by similarity, optionally restricted by a filter expression over
//! their metadata.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use vectormap::{Document, HashingEmbedding, SearchRequest, Session, StoreConfig, VectorStore};
//!
//! let session = Session::new();
//! let store = VectorStore::open(
//!     &session,
//!     Arc::new(HashingEmbedding::default()),
//!     StoreConfig::default(),
//! )?;
//!
//! store.add(&[
//!     Document::with_id("1", "Spring AI rocks!").with_metadata("country", "BG"),
//!     Document::with_id("2", "The World is Big").with_metadata("country", "NL"),
//! ])?;
//!
//! let hits = store.similarity_search(
//!     &SearchRequest::query("The World")
//!         .with_top_k(5)
//!         .with_filter_expression("country == 'NL'"),
//! )?;
//! assert_eq!(hits.len(), 1);
//! assert_eq!(hits[0].id.as_str(), "2");
//! # Ok::<(), vectormap::VectorStoreError>(())
//! ```
//!
//! # Architecture
//!
//! - `vectormap-core`: document model, configuration, embedding seam
//! - `vectormap-filter`: filter expression language and parse cache
//! - `vectormap-storage`: the partitioned map contract and in-process map
//! - `vectormap-engine`: indexes, search and the [`VectorStore`] facade

pub use vectormap_core::{
    ConfigError, DistanceType, Document, DocumentId, EmbeddingError, EmbeddingModel,
    HashingEmbedding, HnswParams, IndexType, Metadata, MetadataValue, StoreConfig,
    DISTANCE_METADATA_KEY,
};
pub use vectormap_engine::{
    SearchRequest, SimilarityThreshold, VectorStore, VectorStoreError, VectorStoreResult,
    DEFAULT_TOP_K,
};
pub use vectormap_filter::{FilterExpression, FilterParseError};
pub use vectormap_storage::{KvMap, MapError, PartitionedMap, Session};
