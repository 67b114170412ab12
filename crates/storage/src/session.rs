//! Named-map registry
//!
//! A session hands out maps by name, creating them on first use. Every
//! store opened on the same name through the same session shares one map.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::partitioned::{PartitionedMap, DEFAULT_PARTITION_COUNT};

/// Registry of [`PartitionedMap`]s keyed by name
#[derive(Debug)]
pub struct Session {
    maps: DashMap<String, Arc<PartitionedMap>>,
    partition_count: usize,
}

impl Session {
    /// Create a session whose maps use [`DEFAULT_PARTITION_COUNT`] partitions
    pub fn new() -> Self {
        Self::with_partition_count(DEFAULT_PARTITION_COUNT)
    }

    /// Create a session whose maps use `partition_count` partitions
    pub fn with_partition_count(partition_count: usize) -> Self {
        Self {
            maps: DashMap::new(),
            partition_count: partition_count.max(1),
        }
    }

    /// Get the map named `name`, creating it when absent
    pub fn get_map(&self, name: &str) -> Arc<PartitionedMap> {
        if let Some(map) = self.maps.get(name) {
            return Arc::clone(map.value());
        }
        Arc::clone(
            self.maps
                .entry(name.to_string())
                .or_insert_with(|| {
                    debug!(target: "vectormap::storage", map = name, partitions = self.partition_count, "Map created");
                    Arc::new(PartitionedMap::with_partitions(name, self.partition_count))
                })
                .value(),
        )
    }

    /// Release and forget the map named `name`
    ///
    /// Handles obtained earlier fail from now on; a later
    /// [`Session::get_map`] creates a fresh, empty map. Returns whether a
    /// map was registered under `name`.
    pub fn release_map(&self, name: &str) -> bool {
        match self.maps.remove(name) {
            Some((_, map)) => {
                map.release();
                true
            }
            None => false,
        }
    }

    /// Names of the registered maps, sorted
    pub fn map_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.maps.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
