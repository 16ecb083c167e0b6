//! Structural agreement: how strongly the rest of the candidate set corroborates
//! each candidate's place in the taxonomy.
//!
//! agreement(c) = (w_cat * sameCategory(c) + w_chap * sameChapter(c)) / (|C| - 1)
//!
//! `sameChapter` counts candidates sharing the chapter but not the category, so a
//! same-category neighbour contributes `w_cat` once rather than `w_cat + w_chap`.

use std::collections::HashMap;

use dxrank_hierarchy::{CategoryIdx, ChapterIdx, Hierarchy};

use crate::candidate::{clamp_unit, Candidate};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgreementWeights {
    pub category: f64,
    pub chapter: f64,
}

pub fn score_agreement(candidates: &mut [Candidate], hierarchy: &Hierarchy, weights: AgreementWeights) {
    let n = candidates.len();
    if n <= 1 {
        for c in candidates.iter_mut() {
            c.agreement = 0.0;
            c.same_category = 0;
            c.same_chapter = 0;
        }
        return;
    }

    let mut per_category: HashMap<CategoryIdx, usize> = HashMap::new();
    let mut per_chapter: HashMap<ChapterIdx, usize> = HashMap::new();
    for c in candidates.iter() {
        let code = hierarchy.code(c.code);
        *per_category.entry(code.category).or_default() += 1;
        *per_chapter.entry(code.chapter).or_default() += 1;
    }

    let denom = (n - 1) as f64;
    for c in candidates.iter_mut() {
        let code = hierarchy.code(c.code);
        let in_category = per_category[&code.category];
        let in_chapter = per_chapter[&code.chapter];
        c.same_category = in_category - 1;
        c.same_chapter = in_chapter - in_category;
        let raw = weights.category * c.same_category as f64 + weights.chapter * c.same_chapter as f64;
        c.agreement = clamp_unit(raw / denom);
    }
}
