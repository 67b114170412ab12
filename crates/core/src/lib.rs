//! Core types for vectormap
//!
//! This crate defines the foundational types used throughout the system:
//! - DocumentId / Document / MetadataValue: the document model
//! - DistanceType / IndexType / StoreConfig: store configuration (TOML)
//! - EmbeddingModel: the seam to an external embedding model
//! - HashingEmbedding: deterministic feature-hashing model for tests and offline use

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod embedding;
pub mod tokenizer;
pub mod types;

pub use config::{
    ConfigError, DistanceType, HnswParams, IndexType, StoreConfig, CONFIG_FILE_NAME,
    DEFAULT_MAP_NAME,
};
pub use embedding::{EmbeddingError, EmbeddingModel, HashingEmbedding};
pub use types::{Document, DocumentId, Metadata, MetadataValue, DISTANCE_METADATA_KEY};
