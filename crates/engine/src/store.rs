//! Document Store
//!
//! Persists [`StoredDocument`]s in a [`KvMap`] keyed by document id and keeps
//! the in-process [`VectorIndex`] in step with it. The map is the source of
//! truth: the index is updated after each successful map write and can be
//! rebuilt from a full scan at any time.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use rayon::prelude::*;
use tracing::{debug, info};
use vectormap_core::DocumentId;
use vectormap_filter::FilterExpression;
use vectormap_storage::KvMap;

use crate::error::{VectorStoreError, VectorStoreResult};
use crate::index::VectorIndex;
use crate::record::StoredDocument;

/// Map-backed document storage plus its candidate index
pub struct DocumentStore {
    map: Arc<dyn KvMap>,
    index: RwLock<VectorIndex>,
    dimension: usize,
}

impl DocumentStore {
    /// Wrap `map`; the index starts empty (see [`DocumentStore::rebuild_index`])
    pub fn new(map: Arc<dyn KvMap>, index: VectorIndex, dimension: usize) -> Self {
        Self {
            map,
            index: RwLock::new(index),
            dimension,
        }
    }

    /// Name of the underlying map
    pub fn map_name(&self) -> &str {
        self.map.name()
    }

    /// Embedding dimension every record must have
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Upsert one record
    ///
    /// Replacing an existing id continues its version sequence. Returns the
    /// version written.
    pub fn put(&self, record: StoredDocument) -> VectorStoreResult<u64> {
        if record.embedding.len() != self.dimension {
            return Err(VectorStoreError::EmbeddingDimension {
                id: record.id.to_string(),
                expected: self.dimension,
                got: record.embedding.len(),
            });
        }

        let record = match self.get(record.id.as_str())? {
            Some(previous) => record.succeeding(&previous),
            None => record,
        };
        let bytes = record.encode()?;
        self.map
            .put(record.id.as_str(), bytes)
            .map_err(|e| VectorStoreError::storage_for(e, record.id.as_str()))?;

        self.index.write().upsert(&record.id, &record.embedding)?;
        Ok(record.version)
    }

    /// Upsert records in order, stopping at the first failure
    ///
    /// Records written before the failure stay written.
    pub fn add(&self, records: Vec<StoredDocument>) -> VectorStoreResult<usize> {
        let start = Instant::now();
        let mut written = 0;
        for record in records {
            self.put(record)?;
            written += 1;
        }
        debug!(
            target: "vectormap::store",
            map = self.map_name(),
            count = written,
            duration_us = start.elapsed().as_micros() as u64,
            "Documents written"
        );
        Ok(written)
    }

    /// Remove documents by id; missing ids are ignored
    ///
    /// Returns how many documents existed. Stops at the first map failure.
    pub fn delete<I: AsRef<str>>(&self, ids: &[I]) -> VectorStoreResult<usize> {
        let mut removed = 0;
        for id in ids {
            let id = id.as_ref();
            let existed = self
                .map
                .remove(id)
                .map_err(|e| VectorStoreError::storage_for(e, id))?
                .is_some();
            self.index.write().remove(id);
            if existed {
                removed += 1;
            }
        }
        debug!(
            target: "vectormap::store",
            map = self.map_name(),
            requested = ids.len(),
            removed,
            "Documents deleted"
        );
        Ok(removed)
    }

    /// Read one record
    pub fn get(&self, id: &str) -> VectorStoreResult<Option<StoredDocument>> {
        match self.map.get(id).map_err(|e| VectorStoreError::storage_for(e, id))? {
            Some(bytes) => Ok(Some(StoredDocument::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Every record accepted by `filter` (all records when `None`)
    ///
    /// Partitions are scanned in parallel; the result lists partition 0
    /// first, then 1, and so on, each in key order.
    pub fn scan(&self, filter: Option<&FilterExpression>) -> VectorStoreResult<Vec<StoredDocument>> {
        let start = Instant::now();
        let partitions = (0..self.map.partition_count())
            .into_par_iter()
            .map(|p| self.scan_partition(p, filter))
            .collect::<VectorStoreResult<Vec<_>>>()?;
        let records: Vec<StoredDocument> = partitions.into_iter().flatten().collect();
        debug!(
            target: "vectormap::store",
            map = self.map_name(),
            matched = records.len(),
            filtered = filter.is_some(),
            duration_us = start.elapsed().as_micros() as u64,
            "Map scanned"
        );
        Ok(records)
    }

    fn scan_partition(
        &self,
        partition: usize,
        filter: Option<&FilterExpression>,
    ) -> VectorStoreResult<Vec<StoredDocument>> {
        let entries = self.map.scan_partition(partition)?;
        let mut records = Vec::with_capacity(entries.len());
        for (_, bytes) in entries {
            let record = StoredDocument::decode(&bytes)?;
            if filter.map_or(true, |f| f.evaluate(&record.metadata)) {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Number of stored documents
    pub fn len(&self) -> VectorStoreResult<usize> {
        Ok(self.map.len()?)
    }

    /// Whether the map is empty
    pub fn is_empty(&self) -> VectorStoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Remove every document and reset the index
    pub fn truncate(&self) -> VectorStoreResult<()> {
        self.map.truncate()?;
        self.index.write().clear();
        info!(target: "vectormap::store", map = self.map_name(), "Store truncated");
        Ok(())
    }

    /// Re-index every record currently in the map
    ///
    /// Returns the number of records indexed.
    pub fn rebuild_index(&self) -> VectorStoreResult<usize> {
        let records = self.scan(None)?;
        let mut index = self.index.write();
        index.clear();
        if index.is_linear() {
            return Ok(0);
        }
        for record in &records {
            index.upsert(&record.id, &record.embedding)?;
        }
        info!(
            target: "vectormap::store",
            map = self.map_name(),
            index = %index.index_type(),
            indexed = records.len(),
            "Index rebuilt"
        );
        Ok(records.len())
    }

    /// Index proposal for `query`; `None` when the store has no index
    pub fn index_candidates(&self, query: &[f32], n: usize) -> Option<Vec<DocumentId>> {
        self.index.read().candidates(query, n)
    }

    /// Number of indexed documents
    pub fn index_len(&self) -> usize {
        self.index.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vectormap_core::{DistanceType, IndexType, Metadata, MetadataValue, StoreConfig};
    use vectormap_storage::PartitionedMap;

    fn store_with(index_type: IndexType) -> (Arc<PartitionedMap>, DocumentStore) {
        let map = Arc::new(PartitionedMap::with_partitions("docs", 4));
        let index = VectorIndex::new(index_type, 2, DistanceType::L2, &StoreConfig::default());
        let store = DocumentStore::new(map.clone(), index, 2);
        (map, store)
    }

    fn record(id: &str, country: &str, embedding: Vec<f32>) -> StoredDocument {
        let mut metadata = Metadata::new();
        metadata.insert("country".into(), country.into());
        StoredDocument::new(id.into(), format!("content {id}"), metadata, embedding)
    }

    #[test]
    fn test_put_get_and_versioning() {
        let (_, store) = store_with(IndexType::None);
        assert_eq!(store.put(record("a", "BG", vec![1.0, 0.0])).unwrap(), 1);
        assert_eq!(store.put(record("a", "NL", vec![0.0, 1.0])).unwrap(), 2);

        let got = store.get("a").unwrap().unwrap();
        assert_eq!(got.version, 2);
        assert_eq!(got.metadata["country"], MetadataValue::from("NL"));
        assert_eq!(store.len().unwrap(), 1);
        assert!(store.get("missing").unwrap().is_none());
    }

    #[test]
    fn test_dimension_is_enforced() {
        let (_, store) = store_with(IndexType::None);
        let err = store.put(record("a", "BG", vec![1.0])).unwrap_err();
        assert_eq!(
            err,
            VectorStoreError::EmbeddingDimension {
                id: "a".into(),
                expected: 2,
                got: 1
            }
        );
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_scan_with_filter() {
        let (_, store) = store_with(IndexType::None);
        store
            .add(vec![
                record("a", "BG", vec![1.0, 0.0]),
                record("b", "NL", vec![0.0, 1.0]),
                record("c", "BG", vec![1.0, 1.0]),
            ])
            .unwrap();

        assert_eq!(store.scan(None).unwrap().len(), 3);
        let bg = vectormap_filter::parse("country == 'BG'").unwrap();
        let mut ids: Vec<String> = store
            .scan(Some(&bg))
            .unwrap()
            .into_iter()
            .map(|r| r.id.into_string())
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_scan_order_is_stable() {
        let (_, store) = store_with(IndexType::None);
        for i in 0..20 {
            store.put(record(&format!("d{i}"), "BG", vec![i as f32, 0.0])).unwrap();
        }
        let first: Vec<_> = store.scan(None).unwrap().into_iter().map(|r| r.id).collect();
        let second: Vec<_> = store.scan(None).unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_delete_ignores_missing() {
        let (_, store) = store_with(IndexType::Hnsw);
        store.put(record("a", "BG", vec![1.0, 0.0])).unwrap();
        assert_eq!(store.delete(&["a", "missing"]).unwrap(), 1);
        assert!(store.is_empty().unwrap());
        assert_eq!(store.index_len(), 0);
    }

    #[test]
    fn test_index_follows_writes() {
        let (_, store) = store_with(IndexType::Binary);
        store.put(record("a", "BG", vec![1.0, 1.0])).unwrap();
        store.put(record("b", "BG", vec![-1.0, -1.0])).unwrap();
        assert_eq!(store.index_len(), 2);
        let ids = store.index_candidates(&[1.0, 1.0], 1).unwrap();
        assert_eq!(ids, vec![DocumentId::from("a")]);

        store.truncate().unwrap();
        assert_eq!(store.index_len(), 0);
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_rebuild_index_from_existing_map() {
        let (map, first) = store_with(IndexType::Hnsw);
        first.put(record("a", "BG", vec![1.0, 0.0])).unwrap();
        first.put(record("b", "NL", vec![0.0, 1.0])).unwrap();

        let index = VectorIndex::new(IndexType::Hnsw, 2, DistanceType::L2, &StoreConfig::default());
        let second = DocumentStore::new(map, index, 2);
        assert_eq!(second.index_len(), 0);
        assert_eq!(second.rebuild_index().unwrap(), 2);
        assert_eq!(second.index_len(), 2);
    }

    #[test]
    fn test_released_map_names_document() {
        let (map, store) = store_with(IndexType::None);
        map.release();
        let err = store.put(record("doc-9", "BG", vec![1.0, 0.0])).unwrap_err();
        assert!(err.is_storage_error());
        assert!(err.to_string().contains("doc-9"));
        assert!(store.scan(None).unwrap_err().is_storage_error());
    }
}
