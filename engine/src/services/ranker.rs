//! Deterministic top-N selection with seen-item exclusion.

use ndarray::Array1;
use std::cmp::Ordering;
use std::collections::HashSet;

use crate::models::{ItemId, RankedArticle};

/// Select the `top_n` highest-scoring items, never surfacing an excluded
/// row.
///
/// Excluded rows (the user's own history) are forced to the minimum
/// possible score before selection. Ties break on the lower item id so the
/// ordering is reproducible, which cache correctness and tests rely on.
/// `top_n` is clamped to the number of non-excluded rows; asking for more
/// than available returns all available items.
pub fn rank(
    mut scores: Array1<f32>,
    exclude_rows: &HashSet<usize>,
    top_n: usize,
    ids: &[ItemId],
) -> Vec<RankedArticle> {
    let excluded = exclude_rows.iter().filter(|&&row| row < scores.len()).count();
    for &row in exclude_rows {
        if row < scores.len() {
            scores[row] = f32::NEG_INFINITY;
        }
    }

    let take = top_n.min(scores.len() - excluded);
    if take == 0 {
        return Vec::new();
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_unstable_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(Ordering::Equal)
            .then_with(|| ids[a].cmp(&ids[b]))
    });

    order
        .into_iter()
        .take(take)
        .enumerate()
        .map(|(i, row)| RankedArticle {
            rank: i + 1,
            article_id: ids[row],
            score: scores[row],
        })
        .collect()
}
