//! User profile construction from click history.

use ndarray::Array1;

use crate::models::ItemId;
use crate::services::embedding_store::EmbeddingStore;

/// Profile norms below this are treated as empty (avoids division by ~0).
const MIN_PROFILE_NORM: f32 = 1e-8;

/// Build the content profile: the L2-normalized arithmetic mean of the
/// embedding vectors of every known item in the history.
///
/// Unknown ids are silently dropped (tolerance for stale or foreign ids);
/// duplicates are kept, so repeated clicks strengthen the profile. Returns
/// `None` when no known item remains or the mean has ~zero norm; the
/// caller falls back to the other method or the popularity default.
pub fn build_content_profile(history: &[ItemId], store: &EmbeddingStore) -> Option<Array1<f32>> {
    let rows: Vec<usize> = history.iter().filter_map(|&id| store.row_of(id)).collect();
    if rows.is_empty() {
        return None;
    }

    let mut profile = Array1::<f32>::zeros(store.dim());
    for &row in &rows {
        profile += &store.vectors().row(row);
    }
    profile /= rows.len() as f32;

    let norm = profile.dot(&profile).sqrt();
    if norm < MIN_PROFILE_NORM {
        return None;
    }
    profile.mapv_inplace(|v| v / norm);

    Some(profile)
}
