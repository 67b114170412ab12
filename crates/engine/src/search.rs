//! Similarity Search Orchestrator
//!
//! A search runs in five steps:
//! 1. Candidates: a filtered scan of every partition, or the index's
//!    proposal re-read from the map and filtered
//! 2. Exact distance of each candidate, attached as `distance` metadata
//! 3. Similarity threshold (`1 - distance >= threshold`)
//! 4. Stable ascending sort by distance
//! 5. Truncation to `top_k`

use std::time::Instant;

use tracing::{debug, warn};
use vectormap_core::{DistanceType, Document, MetadataValue, DISTANCE_METADATA_KEY};
use vectormap_filter::FilterExpression;

use crate::distance::{score, similarity};
use crate::error::VectorStoreResult;
use crate::record::StoredDocument;
use crate::store::DocumentStore;

/// Number of results returned when the request does not say
pub const DEFAULT_TOP_K: usize = 4;

/// Lower bound on similarity for a result to be returned
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SimilarityThreshold {
    /// Accept every candidate
    #[default]
    All,
    /// Accept candidates with `1 - distance >= t`
    AtLeast(f64),
}

impl SimilarityThreshold {
    /// Threshold from a raw value; values `<= 0.0` accept everything
    pub fn new(threshold: f64) -> Self {
        if threshold <= 0.0 {
            SimilarityThreshold::All
        } else {
            SimilarityThreshold::AtLeast(threshold)
        }
    }

    /// Whether a candidate at `distance` passes
    pub fn admits(&self, distance: f32) -> bool {
        match self {
            SimilarityThreshold::All => true,
            SimilarityThreshold::AtLeast(t) => similarity(distance) >= *t,
        }
    }
}

/// What to search with
#[derive(Debug, Clone, PartialEq)]
pub enum SearchQuery {
    /// Text embedded with the store's model
    Text(String),
    /// Ready-made query vector
    Vector(Vec<f32>),
}

/// Caller-facing search request
///
/// # Example
///
/// ```
/// use vectormap_engine::SearchRequest;
///
/// let request = SearchRequest::query("The World")
///     .with_top_k(5)
///     .with_similarity_threshold(0.5)
///     .with_filter_expression("country == 'NL' && year >= 2020");
/// assert_eq!(request.top_k(), 5);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    query: SearchQuery,
    top_k: usize,
    threshold: SimilarityThreshold,
    filter_expression: Option<String>,
}

impl SearchRequest {
    /// Search by text
    pub fn query(text: impl Into<String>) -> Self {
        Self::new(SearchQuery::Text(text.into()))
    }

    /// Search by vector
    pub fn vector(vector: Vec<f32>) -> Self {
        Self::new(SearchQuery::Vector(vector))
    }

    fn new(query: SearchQuery) -> Self {
        Self {
            query,
            top_k: DEFAULT_TOP_K,
            threshold: SimilarityThreshold::All,
            filter_expression: None,
        }
    }

    /// Maximum number of results
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Minimum similarity; `<= 0.0` accepts everything
    pub fn with_similarity_threshold(mut self, threshold: f64) -> Self {
        self.threshold = SimilarityThreshold::new(threshold);
        self
    }

    /// Accept every similarity
    pub fn with_similarity_threshold_all(mut self) -> Self {
        self.threshold = SimilarityThreshold::All;
        self
    }

    /// Restrict results to documents whose metadata matches `expression`
    pub fn with_filter_expression(mut self, expression: impl Into<String>) -> Self {
        self.filter_expression = Some(expression.into());
        self
    }

    /// Query input
    pub fn search_query(&self) -> &SearchQuery {
        &self.query
    }

    /// Maximum number of results
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Similarity threshold
    pub fn similarity_threshold(&self) -> SimilarityThreshold {
        self.threshold
    }

    /// Filter text, if any
    pub fn filter_expression(&self) -> Option<&str> {
        self.filter_expression.as_deref()
    }
}

/// Resolved search parameters
#[derive(Debug, Clone, Copy)]
pub struct SearchOptions<'a> {
    /// Maximum number of results
    pub top_k: usize,
    /// Similarity threshold
    pub threshold: SimilarityThreshold,
    /// Parsed filter
    pub filter: Option<&'a FilterExpression>,
    /// Distance metric
    pub metric: DistanceType,
    /// Index window multiplier over `top_k`
    pub oversample: usize,
    /// Minimum index window
    pub min_window: usize,
}

/// Run a similarity search against `store`
pub fn search(
    store: &DocumentStore,
    query: &[f32],
    options: &SearchOptions<'_>,
) -> VectorStoreResult<Vec<Document>> {
    if options.top_k == 0 {
        return Ok(Vec::new());
    }
    let start = Instant::now();

    let candidates = candidates(store, query, options)?;
    let considered = candidates.len();

    let mut scored = Vec::with_capacity(candidates.len());
    for record in candidates {
        let distance = score(query, &record.embedding, options.metric)?;
        if options.threshold.admits(distance) {
            scored.push((distance, record));
        }
    }
    // sort_by is stable: equal distances keep candidate order; NaN sorts last
    scored.sort_by(|a, b| {
        a.0.is_nan()
            .cmp(&b.0.is_nan())
            .then_with(|| a.0.total_cmp(&b.0))
    });
    scored.truncate(options.top_k);

    let results: Vec<Document> = scored
        .into_iter()
        .map(|(distance, record)| {
            let mut doc = record.to_document();
            doc.metadata.insert(
                DISTANCE_METADATA_KEY.to_string(),
                MetadataValue::Float(distance as f64),
            );
            doc
        })
        .collect();

    debug!(
        target: "vectormap::search",
        map = store.map_name(),
        top_k = options.top_k,
        considered,
        results = results.len(),
        filtered = options.filter.is_some(),
        duration_us = start.elapsed().as_micros() as u64,
        "Similarity search completed"
    );
    Ok(results)
}

fn candidates(
    store: &DocumentStore,
    query: &[f32],
    options: &SearchOptions<'_>,
) -> VectorStoreResult<Vec<StoredDocument>> {
    let window = options
        .top_k
        .saturating_mul(options.oversample.max(1))
        .max(options.min_window);

    let ids = match store.index_candidates(query, window) {
        Some(ids) => ids,
        None => return store.scan(options.filter),
    };
    let full_window = ids.len() >= window;

    let mut records = Vec::with_capacity(ids.len());
    let mut stale = 0usize;
    for id in &ids {
        match store.get(id.as_str())? {
            Some(record) => {
                if options.filter.map_or(true, |f| f.evaluate(&record.metadata)) {
                    records.push(record);
                }
            }
            None => stale += 1,
        }
    }
    if stale > 0 {
        warn!(
            target: "vectormap::search",
            map = store.map_name(),
            stale,
            "Index proposed ids missing from the map"
        );
    }

    if records.len() < options.top_k && full_window {
        warn!(
            target: "vectormap::search",
            map = store.map_name(),
            window,
            matched = records.len(),
            top_k = options.top_k,
            "Index window starved by filter, falling back to scan"
        );
        return store.scan(options.filter);
    }
    Ok(records)
}
