//! Vector store errors
//!
//! Every failure of a store operation surfaces as a [`VectorStoreError`].
//! Lower layers keep their own error types (`FilterParseError`, `MapError`,
//! `EmbeddingError`, `ConfigError`) and convert here.

use thiserror::Error;
use vectormap_core::ConfigError;
use vectormap_filter::FilterParseError;
use vectormap_storage::MapError;

/// Errors raised by the vector store
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VectorStoreError {
    /// The filter expression text is malformed
    #[error("Invalid filter expression: {0}")]
    FilterParse(#[from] FilterParseError),

    /// Two vectors of different lengths were compared
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Length of the left-hand vector
        expected: usize,
        /// Length of the right-hand vector
        got: usize,
    },

    /// A document's embedding does not have the store dimension
    #[error("Document '{id}' embedding dimension mismatch: expected {expected}, got {got}")]
    EmbeddingDimension {
        /// Document id (`<query>` for a search vector)
        id: String,
        /// Store dimension
        expected: usize,
        /// Embedding length
        got: usize,
    },

    /// An embedding holds NaN or infinite values
    #[error("Document '{id}' has an invalid embedding: {reason}")]
    InvalidEmbedding {
        /// Document id (`<query>` for a search vector)
        id: String,
        /// What is wrong with it
        reason: String,
    },

    /// The embedding model failed for a document
    #[error("Embedding failed for '{id}': {reason}")]
    Embedding {
        /// Document id (`<query>` for a search text)
        id: String,
        /// Model error
        reason: String,
    },

    /// The underlying map could not serve the request
    #[error("Storage unavailable for map '{map}': {reason}")]
    StorageUnavailable {
        /// Map name
        map: String,
        /// What failed, including the document id when there is one
        reason: String,
    },

    /// A stored value could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The store configuration is invalid
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl VectorStoreError {
    /// Whether the caller can fix this by changing its input
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            VectorStoreError::FilterParse(_)
                | VectorStoreError::DimensionMismatch { .. }
                | VectorStoreError::EmbeddingDimension { .. }
                | VectorStoreError::InvalidEmbedding { .. }
                | VectorStoreError::InvalidConfig(_)
        )
    }

    /// Whether the failure came from the map or the stored bytes
    pub fn is_storage_error(&self) -> bool {
        matches!(
            self,
            VectorStoreError::StorageUnavailable { .. } | VectorStoreError::Serialization(_)
        )
    }

    /// Attach the document id a map failure happened on
    pub(crate) fn storage_for(err: MapError, id: &str) -> Self {
        match err {
            MapError::Unavailable { map, reason } => VectorStoreError::StorageUnavailable {
                map,
                reason: format!("{} (document '{}')", reason, id),
            },
        }
    }
}

impl From<MapError> for VectorStoreError {
    fn from(err: MapError) -> Self {
        match err {
            MapError::Unavailable { map, reason } => {
                VectorStoreError::StorageUnavailable { map, reason }
            }
        }
    }
}

impl From<ConfigError> for VectorStoreError {
    fn from(err: ConfigError) -> Self {
        VectorStoreError::InvalidConfig(err.to_string())
    }
}

impl From<rmp_serde::encode::Error> for VectorStoreError {
    fn from(err: rmp_serde::encode::Error) -> Self {
        VectorStoreError::Serialization(err.to_string())
    }
}

impl From<rmp_serde::decode::Error> for VectorStoreError {
    fn from(err: rmp_serde::decode::Error) -> Self {
        VectorStoreError::Serialization(err.to_string())
    }
}

/// Result type alias for vector store operations
pub type VectorStoreResult<T> = Result<T, VectorStoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_error_keeps_position() {
        let err: VectorStoreError = vectormap_filter::parse("country == NL").unwrap_err().into();
        assert!(err.is_user_error());
        assert!(!err.is_storage_error());
        assert!(err
            .to_string()
            .contains("Line: 1:17, Error: no viable alternative at input 'NL'"));
    }

    #[test]
    fn test_storage_error_names_document() {
        let err = VectorStoreError::storage_for(MapError::unavailable("docs", "released"), "doc-7");
        assert!(err.is_storage_error());
        assert!(err.to_string().contains("doc-7"));
        assert!(err.to_string().contains("docs"));
    }

    #[test]
    fn test_embedding_error_is_neither() {
        let err = VectorStoreError::Embedding {
            id: "a".into(),
            reason: "boom".into(),
        };
        assert!(!err.is_user_error());
        assert!(!err.is_storage_error());
    }
}
