//! Document model for vectormap
//!
//! This module defines the foundational types:
//! - DocumentId: Stable identity of a stored document
//! - MetadataValue: Scalar metadata value (string, integer, float, bool)
//! - Metadata: Key -> scalar mapping attached to every document
//! - Document: Content + metadata + optional caller-supplied embedding

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Metadata key under which search results carry their distance score.
pub const DISTANCE_METADATA_KEY: &str = "distance";

/// Unique identifier for a document
///
/// Caller-supplied identifiers are kept verbatim. When a document is created
/// without one, a random UUID v4 string is assigned.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Create a new random DocumentId using UUID v4
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Borrow the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the identifier, returning the owned string
    pub fn into_string(self) -> String {
        self.0
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::random()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for DocumentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<Uuid> for DocumentId {
    fn from(id: Uuid) -> Self {
        Self(id.to_string())
    }
}

impl AsRef<str> for DocumentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for DocumentId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Scalar metadata value
///
/// Integers and floats are distinct variants but compare numerically with
/// each other, so `year == 2020` matches both `Integer(2020)` and
/// `Float(2020.0)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MetadataValue {
    /// UTF-8 string
    String(String),
    /// Signed 64-bit integer
    Integer(i64),
    /// 64-bit float
    Float(f64),
    /// Boolean
    Bool(bool),
}

impl MetadataValue {
    /// Numeric view of the value, if it is a number
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetadataValue::Integer(i) => Some(*i as f64),
            MetadataValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// String view of the value, if it is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Boolean view of the value, if it is a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MetadataValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Name of the variant, for diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            MetadataValue::String(_) => "string",
            MetadataValue::Integer(_) => "integer",
            MetadataValue::Float(_) => "float",
            MetadataValue::Bool(_) => "bool",
        }
    }

    /// Compare two values of compatible types
    ///
    /// Numbers compare numerically across Integer/Float, strings
    /// lexicographically, booleans with `false < true`. Returns `None` for
    /// mismatched types and for NaN.
    pub fn compare(&self, other: &MetadataValue) -> Option<Ordering> {
        match (self, other) {
            (MetadataValue::Integer(a), MetadataValue::Integer(b)) => Some(a.cmp(b)),
            (MetadataValue::String(a), MetadataValue::String(b)) => Some(a.cmp(b)),
            (MetadataValue::Bool(a), MetadataValue::Bool(b)) => Some(a.cmp(b)),
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => None,
            },
        }
    }
}

impl PartialEq for MetadataValue {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::String(s) => write!(f, "'{}'", s.replace('\'', "\\'")),
            MetadataValue::Integer(i) => write!(f, "{}", i),
            MetadataValue::Float(v) => write!(f, "{:?}", v),
            MetadataValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        MetadataValue::String(s.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        MetadataValue::String(s)
    }
}

impl From<i64> for MetadataValue {
    fn from(i: i64) -> Self {
        MetadataValue::Integer(i)
    }
}

impl From<i32> for MetadataValue {
    fn from(i: i32) -> Self {
        MetadataValue::Integer(i as i64)
    }
}

impl From<u32> for MetadataValue {
    fn from(i: u32) -> Self {
        MetadataValue::Integer(i as i64)
    }
}

impl From<f64> for MetadataValue {
    fn from(f: f64) -> Self {
        MetadataValue::Float(f)
    }
}

impl From<f32> for MetadataValue {
    fn from(f: f32) -> Self {
        MetadataValue::Float(f as f64)
    }
}

impl From<bool> for MetadataValue {
    fn from(b: bool) -> Self {
        MetadataValue::Bool(b)
    }
}

/// Document metadata: string keys to scalar values
pub type Metadata = BTreeMap<String, MetadataValue>;

/// A document as seen by callers of the vector store
///
/// `embedding` is optional on input: when absent the store computes it from
/// `content` with the configured embedding model. Search results never carry
/// embeddings back; they carry a `distance` metadata entry instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Stable identifier
    pub id: DocumentId,
    /// Text payload
    pub content: String,
    /// Scalar metadata
    pub metadata: Metadata,
    /// Precomputed embedding, if the caller has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl Document {
    /// Create a document with a random id and no metadata
    pub fn new(content: impl Into<String>) -> Self {
        Self::with_id(DocumentId::random(), content)
    }

    /// Create a document with an explicit id
    pub fn with_id(id: impl Into<DocumentId>, content: impl Into<String>) -> Self {
        Document {
            id: id.into(),
            content: content.into(),
            metadata: Metadata::new(),
            embedding: None,
        }
    }

    /// Builder: add one metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Builder: replace all metadata
    pub fn with_metadata_map(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Builder: attach a precomputed embedding
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// The `distance` annotation on a search result, if present
    pub fn distance(&self) -> Option<f64> {
        self.metadata
            .get(DISTANCE_METADATA_KEY)
            .and_then(MetadataValue::as_f64)
    }
}
