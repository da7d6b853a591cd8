//! Similarity scoring over the full corpus.
//!
//! The dominant per-request cost: one O(N×D) matrix-vector product per
//! active method (e.g. 364,047 items × 50 dims ≈ 18M multiply-adds). Both
//! sides are pre-normalized, so the product is the cosine similarity
//! directly, with no per-item loop and no per-request normalization.

use ndarray::{Array1, Array2};

use crate::services::strategy::MethodWeights;

/// Cosine similarity of the profile against every item.
///
/// `normalized` must be the row-wise L2-normalized corpus and `profile`
/// unit-length; both invariants are established at load/profile-build time.
pub fn cosine_scores(profile: &Array1<f32>, normalized: &Array2<f32>) -> Array1<f32> {
    normalized.dot(profile)
}

/// Weighted merge of per-method score vectors, only over methods that
/// produced scores. At least one side must be present.
pub fn combine_scores(
    content: Option<&Array1<f32>>,
    collaborative: Option<&Array1<f32>>,
    weights: MethodWeights,
) -> Array1<f32> {
    match (content, collaborative) {
        (Some(c), Some(f)) => c * weights.content + f * weights.collaborative,
        (Some(c), None) => c * weights.content,
        (None, Some(f)) => f * weights.collaborative,
        (None, None) => unreachable!("combine_scores called with no score vectors"),
    }
}
