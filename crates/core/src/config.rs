//! Store configuration via TOML
//!
//! A `StoreConfig` selects the map a store lives in, the scoring formula,
//! the index strategy and whether vectors are normalized before storage.
//! It can be built in code or read from a `vectormap.toml` file.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = "vectormap.toml";

/// Default name of the map documents are stored in.
pub const DEFAULT_MAP_NAME: &str = "vectormap-documents";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A field holds a value outside its valid range
    #[error("Invalid config value for '{field}': {reason}")]
    InvalidValue {
        /// Offending field
        field: &'static str,
        /// Why it was rejected
        reason: String,
    },

    /// The config file could not be read or written
    #[error("Config file '{path}': {reason}")]
    File {
        /// File path
        path: String,
        /// Underlying failure
        reason: String,
    },

    /// The TOML text could not be parsed
    #[error("Failed to parse config: {0}")]
    Parse(String),
}

/// Distance metric used to score a query against stored embeddings
///
/// Every metric is oriented so that a smaller distance means more similar.
///
/// Names are read case-insensitively through [`DistanceType::parse`] and
/// written in their canonical upper-case form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum DistanceType {
    /// `1 - cosine_similarity`, range [0, 2]
    #[default]
    #[serde(rename = "COSINE")]
    Cosine,

    /// Euclidean (L2) distance
    #[serde(rename = "L2")]
    L2,

    /// Negative inner product
    ///
    /// Only meaningful on normalized vectors; pair it with forced
    /// normalization unless the embeddings are already unit length.
    #[serde(rename = "IP")]
    Ip,
}

impl DistanceType {
    /// All metrics, in declaration order
    pub const ALL: [DistanceType; 3] = [DistanceType::Cosine, DistanceType::L2, DistanceType::Ip];

    /// Canonical upper-case name
    pub fn name(&self) -> &'static str {
        match self {
            DistanceType::Cosine => "COSINE",
            DistanceType::L2 => "L2",
            DistanceType::Ip => "IP",
        }
    }

    /// Parse from string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "cosine" => Some(DistanceType::Cosine),
            "l2" | "euclidean" => Some(DistanceType::L2),
            "ip" | "dot" | "dot_product" | "inner_product" => Some(DistanceType::Ip),
            _ => None,
        }
    }

    /// Whether stored and query vectors should be normalized for this metric
    ///
    /// Cosine and inner product both reduce to a dot product over unit
    /// vectors; Euclidean distances are meaningful on raw vectors.
    pub fn prefers_normalization(&self) -> bool {
        matches!(self, DistanceType::Cosine | DistanceType::Ip)
    }
}

impl fmt::Display for DistanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DistanceType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DistanceType::parse(s).ok_or_else(|| ConfigError::InvalidValue {
            field: "distance_type",
            reason: format!("unknown distance type '{}'", s),
        })
    }
}

impl TryFrom<String> for DistanceType {
    type Error = ConfigError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Index strategy used to produce search candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum IndexType {
    /// No index: every partition is scanned linearly
    #[default]
    #[serde(rename = "NONE")]
    None,

    /// Sign-bit quantized codes ranked by Hamming distance
    #[serde(rename = "BINARY")]
    Binary,

    /// Hierarchical navigable small world graph
    #[serde(rename = "HNSW")]
    Hnsw,
}

impl IndexType {
    /// All index strategies, in declaration order
    pub const ALL: [IndexType; 3] = [IndexType::None, IndexType::Binary, IndexType::Hnsw];

    /// Canonical upper-case name
    pub fn name(&self) -> &'static str {
        match self {
            IndexType::None => "NONE",
            IndexType::Binary => "BINARY",
            IndexType::Hnsw => "HNSW",
        }
    }

    /// Parse from string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "none" | "flat" => Some(IndexType::None),
            "binary" => Some(IndexType::Binary),
            "hnsw" => Some(IndexType::Hnsw),
            _ => None,
        }
    }
}

impl fmt::Display for IndexType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for IndexType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IndexType::parse(s).ok_or_else(|| ConfigError::InvalidValue {
            field: "index_type",
            reason: format!("unknown index type '{}'", s),
        })
    }
}

impl TryFrom<String> for IndexType {
    type Error = ConfigError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// HNSW graph parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HnswParams {
    /// Max connections per node on layers > 0 (layer 0 allows 2*m)
    #[serde(default = "default_hnsw_m")]
    pub m: usize,
    /// Build-time beam width
    #[serde(default = "default_ef_construction")]
    pub ef_construction: usize,
    /// Search-time beam width
    #[serde(default = "default_ef_search")]
    pub ef_search: usize,
}

fn default_hnsw_m() -> usize {
    16
}

fn default_ef_construction() -> usize {
    200
}

fn default_ef_search() -> usize {
    64
}

impl Default for HnswParams {
    fn default() -> Self {
        Self {
            m: default_hnsw_m(),
            ef_construction: default_ef_construction(),
            ef_search: default_ef_search(),
        }
    }
}

fn default_map_name() -> String {
    DEFAULT_MAP_NAME.to_string()
}

fn default_binary_oversample() -> usize {
    8
}

fn default_filter_cache_capacity() -> usize {
    1024
}

/// Store configuration loaded from `vectormap.toml` or built in code.
///
/// # Example
///
/// ```toml
/// map_name = "vectormap-documents"
/// distance_type = "COSINE"
/// index_type = "HNSW"
/// forced_normalization = true
///
/// [hnsw]
/// m = 16
/// ef_construction = 200
/// ef_search = 64
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Name of the map documents are stored in
    #[serde(default = "default_map_name")]
    pub map_name: String,
    /// Embedding dimension; taken from the embedding model when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimension: Option<usize>,
    /// Scoring formula
    #[serde(default)]
    pub distance_type: DistanceType,
    /// Candidate generation strategy
    #[serde(default)]
    pub index_type: IndexType,
    /// L2-normalize stored and query vectors
    #[serde(default)]
    pub forced_normalization: bool,
    /// Candidate multiplier for the binary index
    #[serde(default = "default_binary_oversample")]
    pub binary_oversample: usize,
    /// Max cached parsed filter expressions
    #[serde(default = "default_filter_cache_capacity")]
    pub filter_cache_capacity: usize,
    /// HNSW parameters (used when `index_type = "HNSW"`)
    #[serde(default)]
    pub hnsw: HnswParams,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            map_name: default_map_name(),
            dimension: None,
            distance_type: DistanceType::default(),
            index_type: IndexType::default(),
            forced_normalization: false,
            binary_oversample: default_binary_oversample(),
            filter_cache_capacity: default_filter_cache_capacity(),
            hnsw: HnswParams::default(),
        }
    }
}

impl StoreConfig {
    /// Builder: map name
    pub fn with_map_name(mut self, name: impl Into<String>) -> Self {
        self.map_name = name.into();
        self
    }

    /// Builder: fixed embedding dimension
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = Some(dimension);
        self
    }

    /// Builder: distance metric
    pub fn with_distance_type(mut self, distance_type: DistanceType) -> Self {
        self.distance_type = distance_type;
        self
    }

    /// Builder: index strategy
    pub fn with_index_type(mut self, index_type: IndexType) -> Self {
        self.index_type = index_type;
        self
    }

    /// Builder: forced normalization
    pub fn with_forced_normalization(mut self, forced: bool) -> Self {
        self.forced_normalization = forced;
        self
    }

    /// Builder: HNSW parameters
    pub fn with_hnsw(mut self, hnsw: HnswParams) -> Self {
        self.hnsw = hnsw;
        self
    }

    /// Check every field is within its valid range
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.map_name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "map_name",
                reason: "must not be empty".to_string(),
            });
        }
        if self.dimension == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "dimension",
                reason: "must be > 0".to_string(),
            });
        }
        if self.hnsw.m < 2 {
            return Err(ConfigError::InvalidValue {
                field: "hnsw.m",
                reason: format!("{} (must be >= 2)", self.hnsw.m),
            });
        }
        if self.hnsw.ef_construction == 0 || self.hnsw.ef_search == 0 {
            return Err(ConfigError::InvalidValue {
                field: "hnsw.ef",
                reason: "ef_construction and ef_search must be > 0".to_string(),
            });
        }
        if self.binary_oversample == 0 {
            return Err(ConfigError::InvalidValue {
                field: "binary_oversample",
                reason: "must be >= 1".to_string(),
            });
        }
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# vectormap store configuration
#
# Map the documents live in.
map_name = "vectormap-documents"

# Embedding dimension. Omit to use the embedding model's dimension.
# dimension = 384

# Distance: "COSINE" (default), "L2" or "IP"
distance_type = "COSINE"

# Index: "NONE" (linear scan, default), "BINARY" or "HNSW"
index_type = "NONE"

# Normalize stored and query vectors to unit length.
# Recommended for COSINE and IP.
forced_normalization = false

# Candidate multiplier for the BINARY index.
binary_oversample = 8

# Parsed filter expressions kept in the cache.
filter_cache_capacity = 1024

[hnsw]
m = 16
ef_construction = 200
ef_search = 64
"#
    }

    /// Parse and validate config from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: StoreConfig =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::File {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| ConfigError::File {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }
}
