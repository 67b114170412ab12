//! Sign-bit quantized candidate index
//!
//! Each embedding is reduced to one bit per dimension (1 when the component
//! is >= 0) packed into `u64` words. Candidates are ranked by Hamming
//! distance between codes; callers re-score them exactly.

use std::collections::BTreeMap;

use super::heap::SlotId;

/// Pack the sign bits of `v`, least significant bit first
pub fn sign_code(v: &[f32]) -> Vec<u64> {
    let mut words = vec![0u64; v.len().div_ceil(64)];
    for (i, &x) in v.iter().enumerate() {
        if x >= 0.0 {
            words[i / 64] |= 1u64 << (i % 64);
        }
    }
    words
}

/// Number of differing bits
#[inline]
pub fn hamming_distance(a: &[u64], b: &[u64]) -> u32 {
    debug_assert_eq!(a.len(), b.len(), "codes must have same length");
    a.iter().zip(b).map(|(x, y)| (x ^ y).count_ones()).sum()
}

/// Binary codes keyed by slot
#[derive(Debug, Default)]
pub struct BinaryIndex {
    codes: BTreeMap<SlotId, Vec<u64>>,
}

impl BinaryIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Store or replace the code of `id`
    pub fn upsert(&mut self, id: SlotId, embedding: &[f32]) {
        self.codes.insert(id, sign_code(embedding));
    }

    /// Forget `id`
    pub fn delete(&mut self, id: SlotId) -> bool {
        self.codes.remove(&id).is_some()
    }

    /// Drop every code
    pub fn clear(&mut self) {
        self.codes.clear();
    }

    /// Number of indexed slots
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Whether nothing is indexed
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Up to `n` slots nearest to `query` in Hamming distance
    ///
    /// Ties are broken by slot id, so insertion order wins.
    pub fn search(&self, query: &[f32], n: usize) -> Vec<(SlotId, u32)> {
        if n == 0 {
            return Vec::new();
        }
        let query_code = sign_code(query);
        let mut ranked: Vec<(SlotId, u32)> = self
            .codes
            .iter()
            .filter(|(_, code)| code.len() == query_code.len())
            .map(|(id, code)| (*id, hamming_distance(&query_code, code)))
            .collect();
        ranked.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(n);
        ranked
    }
}
