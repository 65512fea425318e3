//! Grouped NDCG evaluation.
//!
//! Records are grouped by contiguous runs of equal group ids. Each group is
//! scored as `DCG@k / (IDCG@k + ε)` and the result is the unweighted mean over
//! groups in encounter order.
//!
//! ```text
//! DCG@k = Σ_j (2^m[i_j] - 1) / log2(j + 2)    j = 0..k, i_j = j-th index by score desc
//! IDCG@k = DCG@k with the marks themselves as scores
//! ```

use crate::error::{Error, Result};
use std::cmp::Ordering;
use std::ops::Range;
use tracing::debug;

/// Added to IDCG so all-zero groups score ~0 instead of NaN
pub const NDCG_EPSILON: f64 = 1e-5;

/// Default rank cutoff
pub const DEFAULT_K: usize = 5;

/// Exponential gain: 2^mark - 1
#[inline]
fn gain(mark: f64) -> f64 {
    mark.exp2() - 1.0
}

/// Logarithmic discount for a 0-based rank position
#[inline]
fn discount(position: usize) -> f64 {
    (position as f64 + 2.0).log2()
}

/// Indices ordered by score descending, NaN scores last. Ties keep input order.
fn order_by_score(scores: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| match (scores[a].is_nan(), scores[b].is_nan()) {
        (false, false) => scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(Ordering::Equal),
        (a_nan, b_nan) => a_nan.cmp(&b_nan),
    });
    order
}

/// DCG@k of `marks` ranked by `scores`. Slices must have equal length.
pub fn dcg_at_k(marks: &[f64], scores: &[f64], k: usize) -> f64 {
    debug_assert_eq!(marks.len(), scores.len());
    order_by_score(scores)
        .into_iter()
        .take(k)
        .enumerate()
        .map(|(position, i)| gain(marks[i]) / discount(position))
        .sum()
}

/// NDCG@k of a single group
pub fn group_ndcg(marks: &[f64], predictions: &[f64], k: usize) -> f64 {
    let dcg = dcg_at_k(marks, predictions, k);
    let idcg = dcg_at_k(marks, marks, k);
    dcg / (idcg + NDCG_EPSILON)
}

/// Maximal runs of equal adjacent group ids. A value that reappears after
/// a different one starts a new run.
pub fn group_spans<G: PartialEq>(groups: &[G]) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut start = 0;
    for i in 1..groups.len() {
        if groups[i] != groups[i - 1] {
            spans.push(start..i);
            start = i;
        }
    }
    if !groups.is_empty() {
        spans.push(start..groups.len());
    }
    spans
}

/// Per-group NDCG@k in encounter order
pub fn ndcg_per_group<G: PartialEq>(
    marks: &[f64],
    predictions: &[f64],
    groups: &[G],
    k: usize,
) -> Result<Vec<f64>> {
    if marks.len() != predictions.len() || marks.len() != groups.len() {
        return Err(Error::LengthMismatch {
            marks: marks.len(),
            predictions: predictions.len(),
            groups: groups.len(),
        });
    }
    Ok(group_spans(groups)
        .into_iter()
        .map(|span| group_ndcg(&marks[span.clone()], &predictions[span], k))
        .collect())
}

/// Mean NDCG@k over all groups
pub fn evaluate<G: PartialEq>(
    marks: &[f64],
    predictions: &[f64],
    groups: &[G],
    k: usize,
) -> Result<f64> {
    let ndcgs = ndcg_per_group(marks, predictions, groups, k)?;
    if ndcgs.is_empty() {
        return Err(Error::EmptyInput("no groups to evaluate"));
    }
    let mean = ndcgs.iter().sum::<f64>() / ndcgs.len() as f64;
    debug!(records = marks.len(), groups = ndcgs.len(), k, mean, "evaluated ndcg");
    Ok(mean)
}
