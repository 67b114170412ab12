//! Shared test utilities for the integration suite.
//!
//! Import via `mod common;`.

#![allow(dead_code)]

use std::sync::{Arc, Once};

use vectormap::{
    DistanceType, Document, HashingEmbedding, IndexType, Session, StoreConfig, VectorStore,
};

static INIT_TRACING: Once = Once::new();

/// Route `tracing` output to the test writer (`RUST_LOG` selects levels)
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Every metric x index combination
pub fn distance_and_index() -> Vec<(DistanceType, IndexType)> {
    let mut combos = Vec::new();
    for distance in DistanceType::ALL {
        for index in IndexType::ALL {
            combos.push((distance, index));
        }
    }
    combos
}

/// Store configuration for one combination
///
/// The hashing model does not emit unit vectors, so every combination
/// normalizes; rankings then agree across metrics.
pub fn config(distance: DistanceType, index: IndexType) -> StoreConfig {
    StoreConfig::default()
        .with_map_name(format!("it-{}-{}", distance, index))
        .with_distance_type(distance)
        .with_index_type(index)
        .with_forced_normalization(true)
}

/// A fresh session plus a store opened on it
pub fn open_store(distance: DistanceType, index: IndexType) -> (Session, VectorStore) {
    init_tracing();
    let session = Session::new();
    let store = VectorStore::open(
        &session,
        Arc::new(HashingEmbedding::default()),
        config(distance, index),
    )
    .expect("open store");
    (session, store)
}

/// The three fixture documents: spring.ai, time.shelter, great.depression
pub fn fixture_documents() -> Vec<Document> {
    vec![
        Document::new(include_str!("../data/spring.ai.txt")).with_metadata("meta1", "meta1"),
        Document::new(include_str!("../data/time.shelter.txt")),
        Document::new(include_str!("../data/great.depression.txt")).with_metadata("meta2", "meta2"),
    ]
}

/// Distances in result order
pub fn distances(results: &[Document]) -> Vec<f64> {
    results
        .iter()
        .map(|d| d.distance().expect("distance metadata"))
        .collect()
}

/// Whether distances never decrease along `results`
pub fn is_sorted_by_distance(results: &[Document]) -> bool {
    distances(results).windows(2).all(|w| w[0] <= w[1])
}
