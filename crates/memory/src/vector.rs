//! Vector similarity utilities.

use merlin_core::memory::{VectorMatch, VectorRecord};

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal, -1 = opposite.
/// Returns 0.0 if the lengths differ or either vector is empty or zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// Rank one user's records by cosine similarity to a query embedding.
///
/// Records owned by other users are never scored. Ties keep insertion order.
pub fn nearest<'a>(
    records: impl IntoIterator<Item = &'a VectorRecord>,
    query: &[f32],
    user_id: &str,
    top_k: usize,
) -> Vec<VectorMatch> {
    let mut scored: Vec<VectorMatch> = records
        .into_iter()
        .filter(|r| r.metadata.user_id == user_id)
        .map(|r| VectorMatch {
            id: r.id.clone(),
            score: cosine_similarity(&r.values, query),
            values: r.values.clone(),
            metadata: r.metadata.clone(),
        })
        .collect();

    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(top_k);
    scored
}
