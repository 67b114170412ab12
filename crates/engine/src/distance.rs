//! Distance functions for vector similarity
//!
//! All scores are distances: lower = more similar. Thresholds are expressed
//! as similarities, `1 - distance`.

use vectormap_core::DistanceType;

use crate::error::{VectorStoreError, VectorStoreResult};

/// Distance between `a` and `b` under `metric`
///
/// Fails with [`VectorStoreError::DimensionMismatch`] when the lengths
/// differ.
pub fn score(a: &[f32], b: &[f32], metric: DistanceType) -> VectorStoreResult<f32> {
    if a.len() != b.len() {
        return Err(VectorStoreError::DimensionMismatch {
            expected: a.len(),
            got: b.len(),
        });
    }
    Ok(raw_score(a, b, metric))
}

/// [`score`] without the length check, for callers that validated dimensions
#[inline]
pub(crate) fn raw_score(a: &[f32], b: &[f32], metric: DistanceType) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "Dimension mismatch in distance computation");
    match metric {
        DistanceType::Cosine => 1.0 - cosine_similarity(a, b),
        DistanceType::L2 => euclidean_distance(a, b),
        DistanceType::Ip => -dot_product(a, b),
    }
}

/// Similarity used for thresholds
#[inline]
pub fn similarity(distance: f32) -> f64 {
    1.0 - distance as f64
}

/// Scale `v` to unit L2 norm in place; zero vectors are left untouched
pub fn normalize(v: &mut [f32]) {
    let norm = l2_norm(v);
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
}

/// Cosine similarity: dot(a,b) / (||a|| * ||b||)
///
/// Returns 0.0 if either vector has zero norm
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let norm_a = l2_norm(a);
    let norm_b = l2_norm(b);
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot_product(a, b) / (norm_a * norm_b)
    }
}

/// Dot product (inner product)
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f32>()
        .sqrt()
}
