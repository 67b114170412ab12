//! Embedding seam
//!
//! The store never computes embeddings itself; it calls an
//! [`EmbeddingModel`]. [`HashingEmbedding`] is a deterministic, dependency
//! free model based on feature hashing, used by tests and for offline
//! operation where no real model is available.

use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64_with_seed;

use crate::tokenizer::{tokenize, trigrams};

/// Errors raised by an embedding model
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmbeddingError {
    /// The model could not produce a vector for this input
    #[error("Embedding model failed: {0}")]
    Model(String),

    /// The input was rejected by the model
    #[error("Invalid embedding input: {0}")]
    InvalidInput(String),
}

/// Text -> fixed-length vector
///
/// Implementations must return vectors of exactly `dimensions()` elements.
/// The store validates this and rejects documents whose vectors disagree.
pub trait EmbeddingModel: Send + Sync {
    /// Embed one text
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Output dimension
    fn dimensions(&self) -> usize;

    /// Embed many texts; one result per input, in order
    fn embed_batch(&self, texts: &[&str]) -> Vec<Result<Vec<f32>, EmbeddingError>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

/// Seed for word features
const WORD_SEED: u64 = 0x5eed_0001;
/// Seed for trigram features
const TRIGRAM_SEED: u64 = 0x5eed_0003;
/// Trigram features count half as much as whole words
const TRIGRAM_WEIGHT: f32 = 0.5;

/// Deterministic feature-hashing embedder
///
/// Every lower-cased word token and each of its character trigrams is
/// hashed (xxh3) to a bucket in `[0, dimension)` with a hash-derived sign.
/// Texts sharing words land close together under cosine distance; texts
/// without shared features are close to orthogonal.
#[derive(Debug, Clone)]
pub struct HashingEmbedding {
    dimension: usize,
}

impl HashingEmbedding {
    /// Default output dimension
    pub const DEFAULT_DIMENSION: usize = 384;

    /// Create an embedder with the given output dimension
    ///
    /// # Panics
    ///
    /// Panics if `dimension` is 0.
    pub fn new(dimension: usize) -> Self {
        assert!(dimension > 0, "embedding dimension must be > 0");
        Self { dimension }
    }

    fn accumulate(&self, out: &mut [f32], feature: &str, seed: u64, weight: f32) {
        let hash = xxh3_64_with_seed(feature.as_bytes(), seed);
        let bucket = (hash % self.dimension as u64) as usize;
        let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
        out[bucket] += sign * weight;
    }
}

impl Default for HashingEmbedding {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DIMENSION)
    }
}

impl EmbeddingModel for HashingEmbedding {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut out = vec![0.0f32; self.dimension];
        for token in tokenize(text) {
            self.accumulate(&mut out, &token, WORD_SEED, 1.0);
            for gram in trigrams(&token) {
                self.accumulate(&mut out, &gram, TRIGRAM_SEED, TRIGRAM_WEIGHT);
            }
        }
        Ok(out)
    }

    fn dimensions(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        dot / (na * nb)
    }

    #[test]
    fn test_output_has_configured_dimension() {
        let model = HashingEmbedding::new(64);
        assert_eq!(model.dimensions(), 64);
        assert_eq!(model.embed("hello world").unwrap().len(), 64);
    }

    #[test]
    fn test_deterministic() {
        let model = HashingEmbedding::default();
        assert_eq!(
            model.embed("The World is Big").unwrap(),
            model.embed("The World is Big").unwrap()
        );
    }

    #[test]
    fn test_case_insensitive() {
        let model = HashingEmbedding::default();
        assert_eq!(
            model.embed("Great Depression").unwrap(),
            model.embed("great depression").unwrap()
        );
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let model = HashingEmbedding::new(16);
        assert!(model.embed("").unwrap().iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_shared_words_are_closer() {
        let model = HashingEmbedding::default();
        let query = model.embed("great depression").unwrap();
        let related = model.embed("the great depression of the thirties").unwrap();
        let unrelated = model.embed("spring framework for artificial intelligence").unwrap();
        assert!(cosine(&query, &related) > cosine(&query, &unrelated));
    }

    #[test]
    fn test_embed_batch_preserves_order() {
        let model = HashingEmbedding::new(32);
        let batch = model.embed_batch(&["a text", "another text"]);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].as_ref().unwrap(), &model.embed("a text").unwrap());
        assert_eq!(batch[1].as_ref().unwrap(), &model.embed("another text").unwrap());
    }

    #[test]
    #[should_panic(expected = "dimension must be > 0")]
    fn test_zero_dimension_panics() {
        let _ = HashingEmbedding::new(0);
    }
}
