//! Score fusion and ranking.
//!
//! Keyword mode ranks purely by BM25. Hybrid mode bounds the expensive
//! part of fusion to a candidate set — the union of the top-K items by
//! BM25 and the top-K by cosine — then min-max normalizes each signal
//! independently across exactly that set and combines them with
//! configured weights. Sorting is stable throughout: ties keep original
//! discovery order, so re-running with an identical cache and corpus
//! yields an identical ranked order.

use std::cmp::Ordering;

use crate::models::RankedResult;

/// Fusion tuning. Defaults mirror `[retrieval]` config defaults.
#[derive(Debug, Clone, Copy)]
pub struct FusionParams {
    pub keyword_weight: f64,
    pub semantic_weight: f64,
    pub candidate_window: usize,
}

impl Default for FusionParams {
    fn default() -> Self {
        Self {
            keyword_weight: 0.45,
            semantic_weight: 0.55,
            candidate_window: 80,
        }
    }
}

/// Rank every item by BM25 descending. Zero scores sort last; filtering
/// them from display is the caller's concern, not the ranking's.
pub fn rank_keyword(bm25: &[f64]) -> Vec<RankedResult> {
    let mut results: Vec<RankedResult> = bm25
        .iter()
        .enumerate()
        .map(|(i, &s)| RankedResult {
            item_idx: i,
            bm25: s,
            cosine: None,
            combined: None,
        })
        .collect();

    results.sort_by(|a, b| b.bm25.partial_cmp(&a.bm25).unwrap_or(Ordering::Equal));
    results
}

/// Fuse BM25 and cosine signals over a bounded candidate set.
///
/// `bm25` and `cosine` are parallel arrays indexed by item. Only the
/// candidate union is returned, sorted by combined score descending.
pub fn rank_hybrid(bm25: &[f64], cosine: &[f64], params: FusionParams) -> Vec<RankedResult> {
    debug_assert_eq!(bm25.len(), cosine.len());

    let mut candidates = top_k(bm25, params.candidate_window);
    for idx in top_k(cosine, params.candidate_window) {
        if !candidates.contains(&idx) {
            candidates.push(idx);
        }
    }
    // Ascending item order so that stable sort breaks score ties by
    // discovery order.
    candidates.sort_unstable();

    let cand_bm25: Vec<f64> = candidates.iter().map(|&i| bm25[i]).collect();
    let cand_cosine: Vec<f64> = candidates.iter().map(|&i| cosine[i]).collect();
    let norm_bm25 = min_max_normalize(&cand_bm25);
    let norm_cosine = min_max_normalize(&cand_cosine);

    let mut results: Vec<RankedResult> = candidates
        .iter()
        .enumerate()
        .map(|(j, &i)| RankedResult {
            item_idx: i,
            bm25: bm25[i],
            cosine: Some(cosine[i]),
            combined: Some(
                params.keyword_weight * norm_bm25[j] + params.semantic_weight * norm_cosine[j],
            ),
        })
        .collect();

    results.sort_by(|a, b| {
        b.combined
            .partial_cmp(&a.combined)
            .unwrap_or(Ordering::Equal)
    });
    results
}

/// Indices of the top `k` scores, descending; ties by index.
fn top_k(scores: &[f64], k: usize) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..scores.len()).collect();
    indices.sort_by(|&a, &b| scores[b].partial_cmp(&scores[a]).unwrap_or(Ordering::Equal));
    indices.truncate(k);
    indices
}

/// Min-max normalize to `[0, 1]` across the given set.
///
/// All-equal inputs normalize to 0.0 for every element.
fn min_max_normalize(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if (max - min).abs() < f64::EPSILON {
        return vec![0.0; values.len()];
    }

    values.iter().map(|v| (v - min) / (max - min)).collect()
}
