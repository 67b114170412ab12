//! HNSW (Hierarchical Navigable Small World) index
//!
//! Approximate nearest neighbor search over a multi-layer proximity graph:
//! - Layer 0 holds every node with up to 2*M connections
//! - Higher layers hold a geometrically shrinking subset with up to M
//! - Search descends greedily from the top layer, then beam-searches layer 0
//!
//! Deletes are soft: the node stays as a traversal waypoint until more than
//! half of the graph is deleted, at which point the graph is rebuilt from the
//! live vectors. Updating a slot in place rebuilds the graph; callers that
//! update often should retire the slot and insert under a fresh one.
//!
//! Level assignment uses a fixed-seed SplitMix64 sequence and neighbor lists
//! are `BTreeSet`s, so identical insert sequences build identical graphs.

use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

use tracing::debug;
use vectormap_core::{DistanceType, HnswParams};

use super::heap::{SlotId, VectorHeap};
use crate::distance::raw_score;
use crate::error::VectorStoreResult;

const RNG_SEED: u64 = 42;

#[derive(Debug, Clone)]
struct HnswNode {
    /// neighbors[layer]
    neighbors: Vec<BTreeSet<SlotId>>,
    max_layer: usize,
    deleted: bool,
}

impl HnswNode {
    fn new(max_layer: usize) -> Self {
        Self {
            neighbors: (0..=max_layer).map(|_| BTreeSet::new()).collect(),
            max_layer,
            deleted: false,
        }
    }
}

/// Candidate ordered so that the closer one is Greater
#[derive(Debug, Clone, PartialEq)]
struct Scored {
    distance: f32,
    id: SlotId,
}

impl Eq for Scored {}

impl PartialOrd for Scored {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scored {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap<Scored> pops the nearest; BinaryHeap<Reverse<Scored>> the farthest
        other
            .distance
            .partial_cmp(&self.distance)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.id.cmp(&self.id))
    }
}

fn sort_nearest_first(v: &mut [Scored]) {
    v.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// HNSW graph plus the embeddings it navigates
pub struct HnswIndex {
    params: HnswParams,
    metric: DistanceType,
    /// Level multiplier: 1/ln(m)
    ml: f64,
    heap: VectorHeap,
    nodes: BTreeMap<SlotId, HnswNode>,
    entry_point: Option<SlotId>,
    max_level: usize,
    rng_counter: u64,
    deleted: usize,
}

impl HnswIndex {
    /// Create an empty index
    pub fn new(dimension: usize, metric: DistanceType, params: HnswParams) -> Self {
        Self {
            ml: 1.0 / (params.m.max(2) as f64).ln(),
            params,
            metric,
            heap: VectorHeap::new(dimension),
            nodes: BTreeMap::new(),
            entry_point: None,
            max_level: 0,
            rng_counter: 0,
            deleted: 0,
        }
    }

    /// Number of live vectors
    pub fn len(&self) -> usize {
        self.nodes.len() - self.deleted
    }

    /// Whether no live vector is indexed
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `id` is live
    pub fn contains(&self, id: SlotId) -> bool {
        self.nodes.get(&id).is_some_and(|n| !n.deleted)
    }

    /// Insert `id`, or replace its vector and rebuild the graph
    pub fn upsert(&mut self, id: SlotId, embedding: &[f32]) -> VectorStoreResult<()> {
        self.heap.upsert(id, embedding)?;
        match self.nodes.get_mut(&id) {
            None => self.insert_into_graph(id, embedding),
            Some(node) => {
                if node.deleted {
                    node.deleted = false;
                    self.deleted -= 1;
                }
                self.rebuild();
            }
        }
        Ok(())
    }

    /// Soft-delete `id`; returns whether it was live
    pub fn delete(&mut self, id: SlotId) -> bool {
        let was_live = match self.nodes.get_mut(&id) {
            Some(node) if !node.deleted => {
                node.deleted = true;
                true
            }
            _ => false,
        };
        if !was_live {
            return false;
        }
        self.deleted += 1;

        if self.entry_point == Some(id) {
            self.entry_point = self
                .nodes
                .iter()
                .filter(|(_, n)| !n.deleted)
                .max_by_key(|(_, n)| n.max_layer)
                .map(|(id, _)| *id);
            self.max_level = self
                .entry_point
                .and_then(|ep| self.nodes.get(&ep))
                .map_or(0, |n| n.max_layer);
        }

        if self.deleted * 2 > self.nodes.len() {
            self.rebuild();
        }
        true
    }

    /// Drop everything
    pub fn clear(&mut self) {
        self.heap.clear();
        self.nodes.clear();
        self.entry_point = None;
        self.max_level = 0;
        self.rng_counter = 0;
        self.deleted = 0;
    }

    /// Rebuild the graph from the live vectors, in slot order
    pub fn rebuild(&mut self) {
        let dead: Vec<SlotId> = self
            .nodes
            .iter()
            .filter(|(_, n)| n.deleted)
            .map(|(id, _)| *id)
            .collect();
        for id in &dead {
            self.heap.delete(*id);
        }
        let before = self.nodes.len();

        self.nodes.clear();
        self.entry_point = None;
        self.max_level = 0;
        self.rng_counter = 0;
        self.deleted = 0;

        let ids: Vec<SlotId> = self.heap.ids().collect();
        for id in ids {
            let embedding = match self.heap.get(id) {
                Some(e) => e.to_vec(),
                None => continue,
            };
            self.insert_into_graph(id, &embedding);
        }
        debug!(
            target: "vectormap::search",
            before,
            after = self.nodes.len(),
            "HNSW graph rebuilt"
        );
    }

    /// Up to `k` live slots nearest to `query`, nearest first
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(SlotId, f32)> {
        if k == 0 || self.is_empty() || query.len() != self.heap.dimension() {
            return Vec::new();
        }
        let entry_id = match self.entry_point {
            Some(id) => id,
            None => return Vec::new(),
        };

        let mut current = entry_id;
        if self.max_level > 0 {
            current = self.greedy_search_to_layer(query, entry_id, self.max_level, 1);
        }

        let ef = self.params.ef_search.max(k);
        self.search_layer(query, current, ef, 0)
            .into_iter()
            .filter(|s| self.contains(s.id))
            .take(k)
            .map(|s| (s.id, s.distance))
            .collect()
    }

    fn distance_to(&self, query: &[f32], id: SlotId) -> Option<f32> {
        self.heap.get(id).map(|e| raw_score(query, e, self.metric))
    }

    fn is_deleted(&self, id: SlotId) -> bool {
        self.nodes.get(&id).map_or(false, |n| n.deleted)
    }

    fn assign_level(&mut self) -> usize {
        self.rng_counter += 1;
        let hash = splitmix64(RNG_SEED.wrapping_add(self.rng_counter));
        let uniform = ((hash as f64) / (u64::MAX as f64)).max(1e-15);
        (-uniform.ln() * self.ml) as usize
    }

    /// Beam search within one layer
    ///
    /// Returns up to `ef` live nodes, nearest first. Deleted nodes are
    /// traversed but never returned.
    fn search_layer(&self, query: &[f32], entry_id: SlotId, ef: usize, layer: usize) -> Vec<Scored> {
        let entry_distance = match self.distance_to(query, entry_id) {
            Some(d) => d,
            None => return Vec::new(),
        };

        let mut visited = BTreeSet::new();
        visited.insert(entry_id);

        let mut candidates = BinaryHeap::new();
        candidates.push(Scored {
            distance: entry_distance,
            id: entry_id,
        });

        let mut results: BinaryHeap<Reverse<Scored>> = BinaryHeap::new();
        if !self.is_deleted(entry_id) {
            results.push(Reverse(Scored {
                distance: entry_distance,
                id: entry_id,
            }));
        }

        while let Some(nearest) = candidates.pop() {
            let worst = results.peek().map_or(f32::INFINITY, |r| r.0.distance);
            if nearest.distance > worst && results.len() >= ef {
                break;
            }

            let node = match self.nodes.get(&nearest.id) {
                Some(n) if layer < n.neighbors.len() => n,
                _ => continue,
            };
            for &neighbor_id in &node.neighbors[layer] {
                if !visited.insert(neighbor_id) {
                    continue;
                }
                let distance = match self.distance_to(query, neighbor_id) {
                    Some(d) => d,
                    None => continue,
                };
                let worst = results.peek().map_or(f32::INFINITY, |r| r.0.distance);
                if results.len() < ef || distance < worst {
                    candidates.push(Scored {
                        distance,
                        id: neighbor_id,
                    });
                    if !self.is_deleted(neighbor_id) {
                        results.push(Reverse(Scored {
                            distance,
                            id: neighbor_id,
                        }));
                        if results.len() > ef {
                            results.pop();
                        }
                    }
                }
            }
        }

        let mut out: Vec<Scored> = results.into_iter().map(|r| r.0).collect();
        sort_nearest_first(&mut out);
        out
    }

    /// Greedy descent from `from_layer` down to `to_layer`
    fn greedy_search_to_layer(
        &self,
        query: &[f32],
        entry_id: SlotId,
        from_layer: usize,
        to_layer: usize,
    ) -> SlotId {
        let mut current = entry_id;
        for layer in (to_layer..=from_layer).rev() {
            loop {
                let mut best_distance = match self.distance_to(query, current) {
                    Some(d) => d,
                    None => break,
                };
                let mut best_id = current;
                if let Some(node) = self.nodes.get(&current) {
                    if layer < node.neighbors.len() {
                        for &neighbor_id in &node.neighbors[layer] {
                            if let Some(d) = self.distance_to(query, neighbor_id) {
                                if d < best_distance || (d == best_distance && neighbor_id < best_id) {
                                    best_distance = d;
                                    best_id = neighbor_id;
                                }
                            }
                        }
                    }
                }
                if best_id == current {
                    break;
                }
                current = best_id;
            }
        }
        current
    }

    fn max_connections(&self, layer: usize) -> usize {
        if layer == 0 {
            self.params.m * 2
        } else {
            self.params.m
        }
    }

    fn prune_neighbors_for(&mut self, id: SlotId, layer: usize, max_connections: usize) {
        let embedding = match self.heap.get(id) {
            Some(e) => e.to_vec(),
            None => return,
        };
        let neighbors: Vec<SlotId> = match self.nodes.get(&id) {
            Some(node) if layer < node.neighbors.len() => {
                node.neighbors[layer].iter().copied().collect()
            }
            _ => return,
        };

        let mut scored: Vec<Scored> = neighbors
            .into_iter()
            .filter_map(|nid| {
                self.distance_to(&embedding, nid)
                    .map(|distance| Scored { distance, id: nid })
            })
            .collect();
        sort_nearest_first(&mut scored);
        let keep: BTreeSet<SlotId> = scored.iter().take(max_connections).map(|s| s.id).collect();

        if let Some(node) = self.nodes.get_mut(&id) {
            node.neighbors[layer] = keep;
        }
    }

    fn insert_into_graph(&mut self, id: SlotId, embedding: &[f32]) {
        let level = self.assign_level();
        self.nodes.insert(id, HnswNode::new(level));

        let entry_id = match self.entry_point {
            Some(ep) => ep,
            None => {
                self.entry_point = Some(id);
                self.max_level = level;
                return;
            }
        };

        let mut current = entry_id;
        if self.max_level > level {
            current = self.greedy_search_to_layer(embedding, entry_id, self.max_level, level + 1);
        }

        for layer in (0..=level.min(self.max_level)).rev() {
            let candidates = self.search_layer(embedding, current, self.params.ef_construction, layer);
            let selected: Vec<SlotId> = candidates
                .iter()
                .filter(|s| s.id != id)
                .take(self.params.m)
                .map(|s| s.id)
                .collect();

            if let Some(node) = self.nodes.get_mut(&id) {
                node.neighbors[layer].extend(selected.iter().copied());
            }

            let max_conn = self.max_connections(layer);
            for &neighbor_id in &selected {
                let needs_prune = match self.nodes.get_mut(&neighbor_id) {
                    Some(n) if layer < n.neighbors.len() => {
                        n.neighbors[layer].insert(id);
                        n.neighbors[layer].len() > max_conn
                    }
                    _ => false,
                };
                if needs_prune {
                    self.prune_neighbors_for(neighbor_id, layer, max_conn);
                }
            }

            if let Some(closest) = candidates.first() {
                current = closest.id;
            }
        }

        if level > self.max_level {
            self.entry_point = Some(id);
            self.max_level = level;
        }
    }
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9e3779b97f4a7c15);
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d049bb133111eb);
    x ^ (x >> 31)
}
