use dxrank_hierarchy::CodeIdx;

use crate::fusion::FusionTrace;

/// A code under consideration for one query.
///
/// Every intermediate score is kept on the record so that explanations read
/// the values that actually produced the ranking instead of recomputing them.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub code: CodeIdx,
    /// Normalized identifier, kept for the final tie-break.
    pub code_id: String,
    /// Clamped to [0, 1].
    pub similarity: f64,
    pub agreement: f64,
    /// Other candidates in the same category.
    pub same_category: usize,
    /// Other candidates in the same chapter but a different category.
    pub same_chapter: usize,
    /// `Some(true)` when the candidate sits in the chapter detected from the query text.
    pub chapter_hint: Option<bool>,
    /// Calibrated confidence before entity fusion.
    pub base_confidence: f64,
    pub confidence: f64,
    pub fusion: Option<FusionTrace>,
}

impl Candidate {
    pub fn new(code: CodeIdx, code_id: impl Into<String>, similarity: f64) -> Self {
        Self {
            code,
            code_id: code_id.into(),
            similarity: clamp_unit(similarity),
            agreement: 0.0,
            same_category: 0,
            same_chapter: 0,
            chapter_hint: None,
            base_confidence: 0.0,
            confidence: 0.0,
            fusion: None,
        }
    }
}

/// Clamp into [0, 1]; NaN counts as no relevance.
pub fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}
