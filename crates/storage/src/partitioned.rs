//! In-process partitioned map
//!
//! A fixed vector of partitions, each a `BTreeMap` behind a
//! `parking_lot::RwLock`. Keys are routed to a partition by `FxHasher`, so
//! writers to different partitions never contend and scans take one read
//! lock at a time.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::RwLock;
use rustc_hash::FxHasher;
use tracing::{debug, info};

use crate::error::{MapError, MapResult};
use crate::map::KvMap;

/// Default number of partitions
pub const DEFAULT_PARTITION_COUNT: usize = 16;

type Partition = BTreeMap<String, Vec<u8>>;

/// Partitioned in-memory [`KvMap`]
pub struct PartitionedMap {
    name: String,
    partitions: Vec<RwLock<Partition>>,
    /// Bumped on every mutation
    version: AtomicU64,
    released: AtomicBool,
}

impl PartitionedMap {
    /// Create an empty map with [`DEFAULT_PARTITION_COUNT`] partitions
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_partitions(name, DEFAULT_PARTITION_COUNT)
    }

    /// Create an empty map with `count` partitions (at least one)
    pub fn with_partitions(name: impl Into<String>, count: usize) -> Self {
        let count = count.max(1);
        Self {
            name: name.into(),
            partitions: (0..count).map(|_| RwLock::new(BTreeMap::new())).collect(),
            version: AtomicU64::new(0),
            released: AtomicBool::new(false),
        }
    }

    /// Partition owning `key`
    #[inline]
    pub fn partition_of(&self, key: &str) -> usize {
        let mut hasher = FxHasher::default();
        key.hash(&mut hasher);
        (hasher.finish() % self.partitions.len() as u64) as usize
    }

    /// Mutation counter
    #[inline]
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Release the map: its data is dropped and every later call fails
    /// with [`MapError::Unavailable`]
    pub fn release(&self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }
        for partition in &self.partitions {
            partition.write().clear();
        }
        info!(target: "vectormap::storage", map = %self.name, "Map released");
    }

    /// Whether [`PartitionedMap::release`] has been called
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    fn ensure_active(&self) -> MapResult<()> {
        if self.is_released() {
            return Err(MapError::unavailable(&self.name, "map has been released"));
        }
        Ok(())
    }

    fn bump(&self) {
        self.version.fetch_add(1, Ordering::AcqRel);
    }
}

impl KvMap for PartitionedMap {
    fn name(&self) -> &str {
        &self.name
    }

    fn put(&self, key: &str, value: Vec<u8>) -> MapResult<Option<Vec<u8>>> {
        self.ensure_active()?;
        let previous = self.partitions[self.partition_of(key)]
            .write()
            .insert(key.to_string(), value);
        self.bump();
        Ok(previous)
    }

    fn get(&self, key: &str) -> MapResult<Option<Vec<u8>>> {
        self.ensure_active()?;
        Ok(self.partitions[self.partition_of(key)].read().get(key).cloned())
    }

    fn remove(&self, key: &str) -> MapResult<Option<Vec<u8>>> {
        self.ensure_active()?;
        let removed = self.partitions[self.partition_of(key)].write().remove(key);
        if removed.is_some() {
            self.bump();
        }
        Ok(removed)
    }

    fn truncate(&self) -> MapResult<()> {
        self.ensure_active()?;
        let mut cleared = 0;
        for partition in &self.partitions {
            let mut guard = partition.write();
            cleared += guard.len();
            guard.clear();
        }
        self.bump();
        debug!(target: "vectormap::storage", map = %self.name, cleared, "Map truncated");
        Ok(())
    }

    fn len(&self) -> MapResult<usize> {
        self.ensure_active()?;
        Ok(self.partitions.iter().map(|p| p.read().len()).sum())
    }

    fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    fn scan_partition(&self, partition: usize) -> MapResult<Vec<(String, Vec<u8>)>> {
        self.ensure_active()?;
        Ok(self
            .partitions
            .get(partition)
            .map(|p| {
                p.read()
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }
}

impl std::fmt::Debug for PartitionedMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartitionedMap")
            .field("name", &self.name)
            .field("partitions", &self.partitions.len())
            .field("version", &self.version())
            .field("released", &self.is_released())
            .finish()
    }
}
