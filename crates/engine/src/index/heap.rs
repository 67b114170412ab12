//! Contiguous embedding storage for graph indexes
//!
//! Embeddings live in one `Vec<f32>`, `dimension` floats per slot. Deleted
//! slots go on a free list and are reused by later inserts.

use std::collections::BTreeMap;

use crate::error::{VectorStoreError, VectorStoreResult};

/// Index-internal vector handle
///
/// Slot ids are allocated monotonically by the owning index and never
/// reused, even after deletes; storage offsets are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotId(pub u64);

/// Embedding heap keyed by [`SlotId`]
pub struct VectorHeap {
    dimension: usize,
    /// Layout: [v0_dim0, .., v0_dimN, v1_dim0, ..]
    data: Vec<f32>,
    /// Sole source of truth for live slots; BTreeMap keeps iteration ordered
    id_to_offset: BTreeMap<SlotId, usize>,
    free_offsets: Vec<usize>,
}

impl VectorHeap {
    /// Create an empty heap for vectors of `dimension` floats
    pub fn new(dimension: usize) -> Self {
        VectorHeap {
            dimension,
            data: Vec::new(),
            id_to_offset: BTreeMap::new(),
            free_offsets: Vec::new(),
        }
    }

    /// Vector length
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of live vectors
    pub fn len(&self) -> usize {
        self.id_to_offset.len()
    }

    /// Whether no vector is stored
    pub fn is_empty(&self) -> bool {
        self.id_to_offset.is_empty()
    }

    /// Insert or overwrite the vector stored under `id`
    pub fn upsert(&mut self, id: SlotId, embedding: &[f32]) -> VectorStoreResult<()> {
        if embedding.len() != self.dimension {
            return Err(VectorStoreError::DimensionMismatch {
                expected: self.dimension,
                got: embedding.len(),
            });
        }

        if let Some(&offset) = self.id_to_offset.get(&id) {
            self.data[offset..offset + self.dimension].copy_from_slice(embedding);
            return Ok(());
        }

        let offset = match self.free_offsets.pop() {
            Some(offset) => {
                self.data[offset..offset + self.dimension].copy_from_slice(embedding);
                offset
            }
            None => {
                let offset = self.data.len();
                self.data.extend_from_slice(embedding);
                offset
            }
        };
        self.id_to_offset.insert(id, offset);
        Ok(())
    }

    /// Remove `id`; returns whether it was present
    pub fn delete(&mut self, id: SlotId) -> bool {
        match self.id_to_offset.remove(&id) {
            Some(offset) => {
                self.data[offset..offset + self.dimension].fill(0.0);
                self.free_offsets.push(offset);
                true
            }
            None => false,
        }
    }

    /// Drop every vector
    pub fn clear(&mut self) {
        self.data.clear();
        self.id_to_offset.clear();
        self.free_offsets.clear();
    }

    /// Vector stored under `id`
    pub fn get(&self, id: SlotId) -> Option<&[f32]> {
        let offset = *self.id_to_offset.get(&id)?;
        Some(&self.data[offset..offset + self.dimension])
    }

    /// Whether `id` is live
    pub fn contains(&self, id: SlotId) -> bool {
        self.id_to_offset.contains_key(&id)
    }

    /// Live slot ids in ascending order
    pub fn ids(&self) -> impl Iterator<Item = SlotId> + '_ {
        self.id_to_offset.keys().copied()
    }
}
