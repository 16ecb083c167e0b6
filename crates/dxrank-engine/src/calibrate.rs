//! Confidence fusion, threshold cut and the canonical result order.

use std::cmp::Ordering;

use dxrank_hierarchy::{ChapterIdx, Hierarchy};

use crate::candidate::{clamp_unit, Candidate};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationParams {
    pub alpha: f64,
    pub chapter_hint_bonus: f64,
}

/// `alpha * similarity + (1 - alpha) * agreement`, clamped to [0, 1].
pub fn fused_confidence(similarity: f64, agreement: f64, alpha: f64) -> f64 {
    clamp_unit(alpha * similarity + (1.0 - alpha) * agreement)
}

/// Set `base_confidence` and `confidence` on every candidate.
///
/// `hint` is the chapter detected from the query text, if any.
pub fn calibrate(candidates: &mut [Candidate], hierarchy: &Hierarchy, hint: Option<ChapterIdx>, params: CalibrationParams) {
    for c in candidates.iter_mut() {
        let mut confidence = fused_confidence(c.similarity, c.agreement, params.alpha);
        c.chapter_hint = hint.map(|h| hierarchy.code(c.code).chapter == h);
        if c.chapter_hint == Some(true) {
            confidence = clamp_unit(confidence + params.chapter_hint_bonus);
        }
        c.base_confidence = confidence;
        c.confidence = confidence;
    }
}

/// Inclusive: a confidence equal to the minimum qualifies.
pub fn passes_threshold(confidence: f64, min_confidence: f64) -> bool {
    confidence >= min_confidence
}

/// Drop candidates strictly below `min_confidence`.
pub fn apply_threshold(candidates: Vec<Candidate>, min_confidence: f64) -> Vec<Candidate> {
    candidates.into_iter().filter(|c| passes_threshold(c.confidence, min_confidence)).collect()
}

/// Confidence descending, then similarity descending, then code id ascending.
pub fn rank_order(a: &Candidate, b: &Candidate) -> Ordering {
    b.confidence
        .total_cmp(&a.confidence)
        .then_with(|| b.similarity.total_cmp(&a.similarity))
        .then_with(|| a.code_id.cmp(&b.code_id))
}

pub fn sort_candidates(candidates: &mut [Candidate]) {
    candidates.sort_by(rank_order);
}
