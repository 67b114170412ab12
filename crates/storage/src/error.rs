//! Map errors

use thiserror::Error;

/// Failure of the underlying key-value map
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    /// The map can no longer serve requests (released, disconnected)
    #[error("Map '{map}' unavailable: {reason}")]
    Unavailable {
        /// Map name
        map: String,
        /// What made it unavailable
        reason: String,
    },
}

impl MapError {
    /// Create an unavailable error for `map`
    pub fn unavailable(map: impl Into<String>, reason: impl Into<String>) -> Self {
        MapError::Unavailable {
            map: map.into(),
            reason: reason.into(),
        }
    }

    /// Name of the map that failed
    pub fn map_name(&self) -> &str {
        match self {
            MapError::Unavailable { map, .. } => map,
        }
    }
}

/// Result type alias for map operations
pub type MapResult<T> = Result<T, MapError>;
