//! The key-value map contract
//!
//! The vector store persists documents through this trait only. A map is
//! split into a fixed number of partitions; every key lives in exactly one
//! of them, and each `put`/`remove` is atomic for its key.

use crate::error::MapResult;

/// Named, partitioned map from string keys to opaque byte values
pub trait KvMap: Send + Sync {
    /// Map name
    fn name(&self) -> &str;

    /// Insert or replace the value under `key`, returning the previous value
    fn put(&self, key: &str, value: Vec<u8>) -> MapResult<Option<Vec<u8>>>;

    /// Read the value under `key`
    fn get(&self, key: &str) -> MapResult<Option<Vec<u8>>>;

    /// Remove `key`, returning the removed value
    fn remove(&self, key: &str) -> MapResult<Option<Vec<u8>>>;

    /// Remove every entry
    fn truncate(&self) -> MapResult<()>;

    /// Number of entries
    fn len(&self) -> MapResult<usize>;

    /// Whether the map holds no entries
    fn is_empty(&self) -> MapResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Number of partitions; always at least 1
    fn partition_count(&self) -> usize;

    /// Snapshot of one partition's entries in key order
    ///
    /// `partition` must be below [`KvMap::partition_count`]; an out of range
    /// partition yields an empty snapshot.
    fn scan_partition(&self, partition: usize) -> MapResult<Vec<(String, Vec<u8>)>>;
}
