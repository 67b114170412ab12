//! In-process candidate indexes
//!
//! The map is the source of truth for documents; an index only proposes
//! which ids to read and re-score. [`VectorIndex`] maps document ids to
//! slots and dispatches to the configured strategy:
//! - `None`: no index, searches scan every partition
//! - `Binary`: sign-bit codes ranked by Hamming distance
//! - `Hnsw`: hierarchical navigable small world graph

pub mod binary;
pub mod heap;
pub mod hnsw;

use std::collections::{BTreeMap, HashMap};

use vectormap_core::{DistanceType, DocumentId, IndexType, StoreConfig};

use crate::error::VectorStoreResult;
use binary::BinaryIndex;
use heap::SlotId;
use hnsw::HnswIndex;

enum Strategy {
    None,
    Binary(BinaryIndex),
    Hnsw(HnswIndex),
}

/// Document id -> slot bookkeeping plus the strategy that ranks slots
pub struct VectorIndex {
    index_type: IndexType,
    strategy: Strategy,
    slots: HashMap<DocumentId, SlotId>,
    ids: BTreeMap<SlotId, DocumentId>,
    /// Never decremented, so slots are never reused
    next_slot: u64,
}

impl VectorIndex {
    /// Create an empty index of `index_type`
    pub fn new(
        index_type: IndexType,
        dimension: usize,
        metric: DistanceType,
        config: &StoreConfig,
    ) -> Self {
        let strategy = match index_type {
            IndexType::None => Strategy::None,
            IndexType::Binary => Strategy::Binary(BinaryIndex::new()),
            IndexType::Hnsw => Strategy::Hnsw(HnswIndex::new(dimension, metric, config.hnsw)),
        };
        Self {
            index_type,
            strategy,
            slots: HashMap::new(),
            ids: BTreeMap::new(),
            next_slot: 1,
        }
    }

    /// Configured index type
    pub fn index_type(&self) -> IndexType {
        self.index_type
    }

    /// Whether searches must scan the map instead of asking the index
    pub fn is_linear(&self) -> bool {
        matches!(self.strategy, Strategy::None)
    }

    /// Number of indexed documents (always 0 for a linear index)
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether nothing is indexed
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Index or re-index `id` with `embedding`
    ///
    /// A re-indexed id retires its old slot and takes a fresh one, so graph
    /// neighbors of the old vector keep their links through it.
    pub fn upsert(&mut self, id: &DocumentId, embedding: &[f32]) -> VectorStoreResult<()> {
        if self.is_linear() {
            return Ok(());
        }
        self.remove(id.as_str());
        let slot = SlotId(self.next_slot);
        self.next_slot += 1;
        match &mut self.strategy {
            Strategy::None => {}
            Strategy::Binary(index) => index.upsert(slot, embedding),
            Strategy::Hnsw(index) => index.upsert(slot, embedding)?,
        }
        self.slots.insert(id.clone(), slot);
        self.ids.insert(slot, id.clone());
        Ok(())
    }

    /// Remove `id`; returns whether it was indexed
    pub fn remove(&mut self, id: &str) -> bool {
        let slot = match self.slots.remove(id) {
            Some(slot) => slot,
            None => return false,
        };
        self.ids.remove(&slot);
        match &mut self.strategy {
            Strategy::None => false,
            Strategy::Binary(index) => index.delete(slot),
            Strategy::Hnsw(index) => index.delete(slot),
        }
    }

    /// Drop every entry; slot numbering continues
    pub fn clear(&mut self) {
        self.slots.clear();
        self.ids.clear();
        match &mut self.strategy {
            Strategy::None => {}
            Strategy::Binary(index) => index.clear(),
            Strategy::Hnsw(index) => index.clear(),
        }
    }

    /// Up to `n` document ids ranked by approximate distance to `query`
    ///
    /// Returns `None` for a linear index: the caller must scan.
    pub fn candidates(&self, query: &[f32], n: usize) -> Option<Vec<DocumentId>> {
        let slots: Vec<SlotId> = match &self.strategy {
            Strategy::None => return None,
            Strategy::Binary(index) => index.search(query, n).into_iter().map(|(s, _)| s).collect(),
            Strategy::Hnsw(index) => index.search(query, n).into_iter().map(|(s, _)| s).collect(),
        };
        Some(
            slots
                .into_iter()
                .filter_map(|slot| self.ids.get(&slot).cloned())
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(index_type: IndexType) -> VectorIndex {
        VectorIndex::new(index_type, 2, DistanceType::L2, &StoreConfig::default())
    }

    #[test]
    fn test_linear_index_defers_to_scan() {
        let mut idx = index(IndexType::None);
        idx.upsert(&"a".into(), &[1.0, 0.0]).unwrap();
        assert!(idx.is_linear());
        assert!(idx.is_empty());
        assert!(idx.candidates(&[1.0, 0.0], 4).is_none());
        assert!(!idx.remove("a"));
    }

    #[test]
    fn test_candidates_map_back_to_ids() {
        for index_type in [IndexType::Binary, IndexType::Hnsw] {
            let mut idx = index(index_type);
            idx.upsert(&"east".into(), &[1.0, 0.0]).unwrap();
            idx.upsert(&"west".into(), &[-1.0, 0.0]).unwrap();
            assert_eq!(idx.len(), 2);
            let ids = idx.candidates(&[0.9, 0.1], 1).unwrap();
            assert_eq!(ids, vec![DocumentId::from("east")], "{index_type}");
        }
    }

    #[test]
    fn test_upsert_replaces_and_remove_forgets() {
        for index_type in [IndexType::Binary, IndexType::Hnsw] {
            let mut idx = index(index_type);
            let id = DocumentId::from("doc");
            idx.upsert(&id, &[1.0, 0.0]).unwrap();
            idx.upsert(&id, &[-1.0, 0.0]).unwrap();
            assert_eq!(idx.len(), 1);
            assert_eq!(idx.candidates(&[-1.0, 0.0], 5).unwrap(), vec![id.clone()]);

            assert!(idx.remove("doc"));
            assert!(idx.is_empty());
            assert!(idx.candidates(&[-1.0, 0.0], 5).unwrap().is_empty());
        }
    }

    /// Deterministic vector in [-1, 1]^dimension
    fn lcg_vector(dimension: usize, state: &mut u64) -> Vec<f32> {
        (0..dimension)
            .map(|_| {
                *state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                ((*state >> 40) as f32 / (1u64 << 24) as f32) * 2.0 - 1.0
            })
            .collect()
    }

    #[test]
    fn test_self_recall_survives_repeated_updates() {
        for index_type in [IndexType::Binary, IndexType::Hnsw] {
            let mut idx = VectorIndex::new(index_type, 8, DistanceType::L2, &StoreConfig::default());
            let ids: Vec<DocumentId> = (0..300).map(|i| DocumentId::from(format!("v{i}"))).collect();
            let mut state = 7u64;
            let mut round = |idx: &mut VectorIndex| -> Vec<Vec<f32>> {
                let vectors: Vec<Vec<f32>> = ids.iter().map(|_| lcg_vector(8, &mut state)).collect();
                for (id, v) in ids.iter().zip(&vectors) {
                    idx.upsert(id, v).unwrap();
                }
                vectors
            };
            for _ in 0..3 {
                round(&mut idx);
            }
            let latest = round(&mut idx);
            assert_eq!(idx.len(), 300);

            // 8-bit sign codes collide, so the binary index needs a window
            let window = if index_type == IndexType::Hnsw { 1 } else { 64 };

            let misses = ids
                .iter()
                .zip(&latest)
                .filter(|(id, v)| {
                    let found = idx.candidates(v, window).unwrap();
                    match index_type {
                        IndexType::Hnsw => found.first() != Some(*id),
                        _ => !found.contains(*id),
                    }
                })
                .count();
            assert_eq!(misses, 0, "{index_type}");
        }
    }

    #[test]
    fn test_clear() {
        let mut idx = index(IndexType::Hnsw);
        idx.upsert(&"a".into(), &[1.0, 0.0]).unwrap();
        idx.clear();
        assert!(idx.is_empty());
        assert_eq!(idx.index_type(), IndexType::Hnsw);
    }
}
