//! VectorStore facade
//!
//! Ties the embedding model, the document store and the filter cache
//! together behind the caller-facing API.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};
use vectormap_core::{Document, EmbeddingModel, StoreConfig};
use vectormap_filter::{FilterCache, FilterExpression};
use vectormap_storage::{KvMap, Session};

use crate::distance::normalize;
use crate::error::{VectorStoreError, VectorStoreResult};
use crate::index::VectorIndex;
use crate::record::StoredDocument;
use crate::search::{search, SearchOptions, SearchQuery, SearchRequest};
use crate::store::DocumentStore;

/// Id reported in errors about the search input
const QUERY_ID: &str = "<query>";

/// Metadata-filterable similarity store over one named map
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use vectormap_core::{Document, HashingEmbedding, StoreConfig};
/// use vectormap_engine::{SearchRequest, VectorStore};
/// use vectormap_storage::Session;
///
/// let session = Session::new();
/// let store = VectorStore::open(
///     &session,
///     Arc::new(HashingEmbedding::new(64)),
///     StoreConfig::default().with_map_name("docs"),
/// )
/// .unwrap();
///
/// store
///     .add(&[Document::with_id("1", "hello world").with_metadata("lang", "en")])
///     .unwrap();
/// let hits = store
///     .similarity_search(&SearchRequest::query("hello").with_filter_expression("lang == 'en'"))
///     .unwrap();
/// assert_eq!(hits[0].id.as_str(), "1");
/// ```
pub struct VectorStore {
    config: StoreConfig,
    model: Arc<dyn EmbeddingModel>,
    store: DocumentStore,
    filters: &'static FilterCache,
}

impl VectorStore {
    /// Attach to `config.map_name` in `session`
    ///
    /// Documents already in the map are indexed before this returns.
    pub fn open(
        session: &Session,
        model: Arc<dyn EmbeddingModel>,
        config: StoreConfig,
    ) -> VectorStoreResult<Self> {
        config.validate()?;
        let dimension = config.dimension.unwrap_or_else(|| model.dimensions());
        if dimension == 0 {
            return Err(VectorStoreError::InvalidConfig(
                "embedding model reports dimension 0".to_string(),
            ));
        }

        let map: Arc<dyn KvMap> = session.get_map(&config.map_name);
        let index = VectorIndex::new(config.index_type, dimension, config.distance_type, &config);
        let store = DocumentStore::new(map, index, dimension);
        let indexed = store.rebuild_index()?;

        info!(
            target: "vectormap::store",
            map = %config.map_name,
            dimension,
            distance = %config.distance_type,
            index = %config.index_type,
            indexed,
            "Vector store opened"
        );

        Ok(Self {
            filters: FilterCache::global_with_capacity(config.filter_cache_capacity),
            config,
            model,
            store,
        })
    }

    /// Name of the backing map
    pub fn map_name(&self) -> &str {
        &self.config.map_name
    }

    /// Configuration this store was opened with
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Embedding dimension
    pub fn dimension(&self) -> usize {
        self.store.dimension()
    }

    /// Number of stored documents
    pub fn len(&self) -> VectorStoreResult<usize> {
        self.store.len()
    }

    /// Whether the map holds no documents
    pub fn is_empty(&self) -> VectorStoreResult<bool> {
        self.store.is_empty()
    }

    /// Upsert documents
    ///
    /// Every document is embedded and validated before anything is written;
    /// a failure there writes nothing. Returns the number written.
    pub fn add(&self, documents: &[Document]) -> VectorStoreResult<usize> {
        if documents.is_empty() {
            return Ok(0);
        }
        let start = Instant::now();

        let embeddings = self.embed_missing(documents)?;
        let mut records = Vec::with_capacity(documents.len());
        for (doc, embedding) in documents.iter().zip(embeddings) {
            let embedding = self.prepare(doc.id.as_str(), embedding)?;
            records.push(StoredDocument::new(
                doc.id.clone(),
                doc.content.clone(),
                doc.metadata.clone(),
                embedding,
            ));
        }

        let written = self.store.add(records)?;
        debug!(
            target: "vectormap::store",
            map = self.map_name(),
            count = written,
            duration_us = start.elapsed().as_micros() as u64,
            "Documents added"
        );
        Ok(written)
    }

    /// One embedding per document, calling the model only for documents
    /// without a caller-supplied vector
    fn embed_missing(&self, documents: &[Document]) -> VectorStoreResult<Vec<Vec<f32>>> {
        let texts: Vec<&str> = documents
            .iter()
            .filter(|d| d.embedding.is_none())
            .map(|d| d.content.as_str())
            .collect();
        let mut computed = self.model.embed_batch(&texts).into_iter();

        let mut embeddings = Vec::with_capacity(documents.len());
        for doc in documents {
            let embedding = match &doc.embedding {
                Some(e) => e.clone(),
                None => match computed.next() {
                    Some(result) => result.map_err(|e| VectorStoreError::Embedding {
                        id: doc.id.to_string(),
                        reason: e.to_string(),
                    })?,
                    None => {
                        return Err(VectorStoreError::Embedding {
                            id: doc.id.to_string(),
                            reason: "embedding model returned too few vectors".to_string(),
                        })
                    }
                },
            };
            embeddings.push(embedding);
        }
        Ok(embeddings)
    }

    /// Check the dimension and values, then apply forced normalization
    fn prepare(&self, id: &str, mut embedding: Vec<f32>) -> VectorStoreResult<Vec<f32>> {
        if embedding.len() != self.dimension() {
            return Err(VectorStoreError::EmbeddingDimension {
                id: id.to_string(),
                expected: self.dimension(),
                got: embedding.len(),
            });
        }
        if embedding.iter().any(|v| !v.is_finite()) {
            return Err(VectorStoreError::InvalidEmbedding {
                id: id.to_string(),
                reason: "embedding contains NaN or Infinity values".to_string(),
            });
        }
        if self.config.forced_normalization {
            normalize(&mut embedding);
        }
        Ok(embedding)
    }

    /// Remove documents by id; missing ids are ignored
    ///
    /// Returns how many documents existed.
    pub fn delete<I: AsRef<str>>(&self, ids: &[I]) -> VectorStoreResult<usize> {
        self.store.delete(ids)
    }

    /// Documents most similar to the request's query
    ///
    /// Results are ordered by ascending distance and each carries a
    /// `distance` metadata entry.
    pub fn similarity_search(&self, request: &SearchRequest) -> VectorStoreResult<Vec<Document>> {
        let filter: Option<Arc<FilterExpression>> = match request.filter_expression() {
            Some(text) => Some(self.filters.get_or_parse(text)?),
            None => None,
        };
        if request.top_k() == 0 {
            return Ok(Vec::new());
        }

        let query = match request.search_query() {
            SearchQuery::Text(text) => {
                self.model
                    .embed(text)
                    .map_err(|e| VectorStoreError::Embedding {
                        id: QUERY_ID.to_string(),
                        reason: e.to_string(),
                    })?
            }
            SearchQuery::Vector(vector) => vector.clone(),
        };
        let query = self.prepare(QUERY_ID, query)?;

        let options = SearchOptions {
            top_k: request.top_k(),
            threshold: request.similarity_threshold(),
            filter: filter.as_deref(),
            metric: self.config.distance_type,
            oversample: self.config.binary_oversample,
            min_window: self.config.hnsw.ef_search,
        };
        search(&self.store, &query, &options)
    }

    /// Remove every document
    pub fn truncate(&self) -> VectorStoreResult<()> {
        self.store.truncate()
    }

    /// Re-index every document in the map; returns the number indexed
    pub fn rebuild_index(&self) -> VectorStoreResult<usize> {
        self.store.rebuild_index()
    }
}

impl std::fmt::Debug for VectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorStore")
            .field("map_name", &self.config.map_name)
            .field("dimension", &self.store.dimension())
            .field("distance_type", &self.config.distance_type)
            .field("index_type", &self.config.index_type)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vectormap_core::{DistanceType, EmbeddingError, HashingEmbedding, IndexType};

    /// Fails on any text containing "poison"
    struct FlakyModel(HashingEmbedding);

    impl EmbeddingModel for FlakyModel {
        fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            if text.contains("poison") {
                return Err(EmbeddingError::Model("refused".into()));
            }
            self.0.embed(text)
        }

        fn dimensions(&self) -> usize {
            self.0.dimensions()
        }
    }

    fn open(session: &Session, config: StoreConfig) -> VectorStore {
        VectorStore::open(session, Arc::new(HashingEmbedding::new(32)), config).unwrap()
    }

    #[test]
    fn test_dimension_from_model_or_config() {
        let session = Session::new();
        let store = open(&session, StoreConfig::default().with_map_name("a"));
        assert_eq!(store.dimension(), 32);
        let store = open(&session, StoreConfig::default().with_map_name("b").with_dimension(3));
        assert_eq!(store.dimension(), 3);
        assert_eq!(store.map_name(), "b");
    }

    #[test]
    fn test_invalid_config_rejected() {
        let session = Session::new();
        let err = VectorStore::open(
            &session,
            Arc::new(HashingEmbedding::new(8)),
            StoreConfig::default().with_map_name(" "),
        )
        .unwrap_err();
        assert!(matches!(err, VectorStoreError::InvalidConfig(_)));
    }

    #[test]
    fn test_add_and_search_by_text() {
        let session = Session::new();
        let store = open(&session, StoreConfig::default().with_map_name("docs"));
        store
            .add(&[
                Document::with_id("rust", "rust borrow checker ownership"),
                Document::with_id("bread", "sourdough bread baking"),
            ])
            .unwrap();
        assert_eq!(store.len().unwrap(), 2);

        let hits = store
            .similarity_search(&SearchRequest::query("ownership in rust").with_top_k(1))
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id.as_str(), "rust");
        assert!(hits[0].distance().is_some());
    }

    #[test]
    fn test_phase_one_failure_writes_nothing() {
        let session = Session::new();
        let store = VectorStore::open(
            &session,
            Arc::new(FlakyModel(HashingEmbedding::new(16))),
            StoreConfig::default().with_map_name("flaky"),
        )
        .unwrap();
        let err = store
            .add(&[
                Document::with_id("ok", "fine text"),
                Document::with_id("bad", "poison text"),
            ])
            .unwrap_err();
        assert_eq!(
            err,
            VectorStoreError::Embedding {
                id: "bad".into(),
                reason: "Embedding model failed: refused".into()
            }
        );
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_supplied_embedding_dimension_checked() {
        let session = Session::new();
        let store = open(&session, StoreConfig::default().with_dimension(2));
        let err = store
            .add(&[Document::with_id("v", "text").with_embedding(vec![1.0, 2.0, 3.0])])
            .unwrap_err();
        assert_eq!(
            err,
            VectorStoreError::EmbeddingDimension {
                id: "v".into(),
                expected: 2,
                got: 3
            }
        );

        let err = store
            .similarity_search(&SearchRequest::vector(vec![1.0]))
            .unwrap_err();
        assert!(matches!(err, VectorStoreError::EmbeddingDimension { ref id, .. } if id == QUERY_ID));
    }

    #[test]
    fn test_non_finite_embeddings_rejected() {
        let session = Session::new();
        let store = open(&session, StoreConfig::default().with_dimension(2));
        for bad in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            let err = store
                .add(&[
                    Document::with_id("ok", "text").with_embedding(vec![1.0, 0.0]),
                    Document::with_id("bad", "text").with_embedding(vec![bad, 0.0]),
                ])
                .unwrap_err();
            assert!(matches!(err, VectorStoreError::InvalidEmbedding { ref id, .. } if id == "bad"));
            assert!(err.is_user_error());
            assert!(store.is_empty().unwrap());

            let err = store
                .similarity_search(&SearchRequest::vector(vec![0.0, bad]))
                .unwrap_err();
            assert!(matches!(err, VectorStoreError::InvalidEmbedding { ref id, .. } if id == QUERY_ID));
        }
    }

    #[test]
    fn test_forced_normalization_on_stored_vectors() {
        let session = Session::new();
        let store = open(
            &session,
            StoreConfig::default()
                .with_map_name("norm")
                .with_dimension(2)
                .with_distance_type(DistanceType::L2)
                .with_forced_normalization(true),
        );
        store
            .add(&[Document::with_id("v", "text").with_embedding(vec![3.0, 4.0])])
            .unwrap();
        let hits = store
            .similarity_search(&SearchRequest::vector(vec![6.0, 8.0]))
            .unwrap();
        assert!(hits[0].distance().unwrap().abs() < 1e-6);
    }

    #[test]
    fn test_bad_filter_is_user_error() {
        let session = Session::new();
        let store = open(&session, StoreConfig::default().with_map_name("f"));
        let err = store
            .similarity_search(&SearchRequest::query("x").with_filter_expression("country == NL"))
            .unwrap_err();
        assert!(err.is_user_error());
        assert!(matches!(err, VectorStoreError::FilterParse(_)));
    }

    #[test]
    fn test_reopen_indexes_existing_documents() {
        let session = Session::new();
        let config = StoreConfig::default()
            .with_map_name("shared")
            .with_index_type(IndexType::Hnsw);
        let first = open(&session, config.clone());
        first
            .add(&[Document::with_id("a", "alpha beta"), Document::with_id("b", "gamma delta")])
            .unwrap();

        let second = open(&session, config);
        assert_eq!(second.len().unwrap(), 2);
        let hits = second
            .similarity_search(&SearchRequest::query("alpha beta").with_top_k(1))
            .unwrap();
        assert_eq!(hits[0].id.as_str(), "a");
    }

    #[test]
    fn test_released_map_is_storage_error() {
        let session = Session::new();
        let store = open(&session, StoreConfig::default().with_map_name("gone"));
        assert!(session.release_map("gone"));
        let err = store.add(&[Document::with_id("d1", "text")]).unwrap_err();
        assert!(err.is_storage_error());
        assert!(err.to_string().contains("d1"));
    }
}
