//! Map value encoding
//!
//! Each document is stored under its id as a MessagePack-encoded
//! [`StoredDocument`].

use chrono::Utc;
use serde::{Deserialize, Serialize};
use vectormap_core::{Document, DocumentId, Metadata};

use crate::error::VectorStoreResult;

/// Document as persisted in the map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    /// Document id (also the map key)
    pub id: DocumentId,
    /// Text payload
    pub content: String,
    /// Scalar metadata
    pub metadata: Metadata,
    /// Embedding, already normalized when the store forces normalization
    pub embedding: Vec<f32>,
    /// 1 on first write, +1 on every replacement of the same id
    pub version: u64,
    /// Microseconds since the Unix epoch of the last write
    pub updated_at: i64,
}

impl StoredDocument {
    /// Build the first version of a record
    pub fn new(id: DocumentId, content: String, metadata: Metadata, embedding: Vec<f32>) -> Self {
        Self {
            id,
            content,
            metadata,
            embedding,
            version: 1,
            updated_at: Utc::now().timestamp_micros(),
        }
    }

    /// Continue the version sequence of `previous`
    pub fn succeeding(mut self, previous: &StoredDocument) -> Self {
        self.version = previous.version + 1;
        self
    }

    /// Encode for the map
    pub fn encode(&self) -> VectorStoreResult<Vec<u8>> {
        Ok(rmp_serde::to_vec(self)?)
    }

    /// Decode a map value
    pub fn decode(bytes: &[u8]) -> VectorStoreResult<Self> {
        Ok(rmp_serde::from_slice(bytes)?)
    }

    /// Caller-facing document without the embedding
    pub fn to_document(&self) -> Document {
        Document {
            id: self.id.clone(),
            content: self.content.clone(),
            metadata: self.metadata.clone(),
            embedding: None,
        }
    }
}
