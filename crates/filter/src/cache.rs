//! Parsed-filter cache
//!
//! Filter texts repeat across searches, so parse results are memoized by
//! exact text. Failed parses are cached too: the same malformed text always
//! yields an equal error without re-running the parser.

use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::OnceCell;
use tracing::debug;

use crate::ast::FilterExpression;
use crate::error::FilterParseError;
use crate::parser::parse;

/// Default maximum number of cached filter texts
pub const DEFAULT_FILTER_CACHE_CAPACITY: usize = 1024;

type CachedParse = Result<Arc<FilterExpression>, FilterParseError>;

static GLOBAL: OnceCell<FilterCache> = OnceCell::new();

/// Concurrent text -> parse result map
///
/// Once `capacity` distinct texts are cached, further texts are parsed on
/// every call but not stored. Entries are never evicted.
pub struct FilterCache {
    entries: DashMap<String, CachedParse>,
    capacity: usize,
}

impl FilterCache {
    /// Create an empty cache holding at most `capacity` texts
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            capacity,
        }
    }

    /// Process-wide cache shared by all stores
    ///
    /// Created with [`DEFAULT_FILTER_CACHE_CAPACITY`] unless
    /// [`FilterCache::global_with_capacity`] ran first.
    pub fn global() -> &'static FilterCache {
        Self::global_with_capacity(DEFAULT_FILTER_CACHE_CAPACITY)
    }

    /// Process-wide cache, created with `capacity` if this is the first use
    ///
    /// The first caller fixes the capacity; later calls return the existing
    /// cache unchanged.
    pub fn global_with_capacity(capacity: usize) -> &'static FilterCache {
        GLOBAL.get_or_init(|| FilterCache::new(capacity))
    }

    /// Maximum number of cached texts
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Return the cached parse of `text`, parsing it on first use
    pub fn get_or_parse(&self, text: &str) -> Result<Arc<FilterExpression>, FilterParseError> {
        if let Some(hit) = self.entries.get(text) {
            return hit.value().clone();
        }

        if self.entries.len() >= self.capacity {
            return parse(text).map(Arc::new);
        }

        // entry() holds the shard lock, so concurrent callers parse once
        self.entries
            .entry(text.to_string())
            .or_insert_with(|| {
                let parsed = parse(text).map(Arc::new);
                if let Err(e) = &parsed {
                    debug!(target: "vectormap::filter", filter = text, error = %e, "Cached filter parse error");
                }
                parsed
            })
            .value()
            .clone()
    }

    /// Number of cached texts
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is cached
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every cached entry
    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl Default for FilterCache {
    fn default() -> Self {
        Self::new(DEFAULT_FILTER_CACHE_CAPACITY)
    }
}

impl std::fmt::Debug for FilterCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterCache")
            .field("len", &self.entries.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}
