//! Structured justification for a ranked candidate.
//!
//! Reads only the scores recorded on the candidate during the run.

use serde::Serialize;
use std::fmt;

use dxrank_hierarchy::{ChapterIdx, Hierarchy};

use crate::candidate::Candidate;
use crate::fusion::AttributeFinding;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Evidence {
    Similarity { score: f64 },
    Agreement { score: f64, same_category: usize, same_chapter: usize },
    ChapterHint { chapter: String, agrees: bool },
    Attribute { finding: AttributeFinding },
    FusionAdjustment { adjustment: f64 },
    Path { code: String, category: String, category_title: String, chapter: String, chapter_title: String },
}

impl fmt::Display for Evidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Similarity { score } => write!(f, "semantic similarity {:.3}", score),
            Self::Agreement { score, same_category, same_chapter } => write!(
                f,
                "hierarchical agreement {:.3} ({} same-category, {} same-chapter candidates)",
                score, same_category, same_chapter
            ),
            Self::ChapterHint { chapter, agrees: true } => write!(f, "query terms point to chapter {}", chapter),
            Self::ChapterHint { chapter, agrees: false } => {
                write!(f, "query terms point to chapter {}, outside this code's chapter", chapter)
            }
            Self::Attribute { finding } => match finding {
                AttributeFinding::Matched { attribute, value } => write!(f, "documented {} '{}' matches the code", attribute, value),
                AttributeFinding::Conflicting { attribute, documented, coded } => write!(
                    f,
                    "documented {} '{}' conflicts with coded '{}'",
                    attribute,
                    documented.join(", "),
                    coded.join(", ")
                ),
                AttributeFinding::NotDocumented { attribute } => write!(f, "code requires {} which is not documented", attribute),
                AttributeFinding::CodeLacksSpecificity { attribute, documented } => write!(
                    f,
                    "documented {} '{}' is not expressed by the code",
                    attribute,
                    documented.join(", ")
                ),
            },
            Self::FusionAdjustment { adjustment } => write!(f, "entity fusion adjustment {:+.3}", adjustment),
            Self::Path { code, category, category_title, chapter, chapter_title } => {
                write!(f, "{} → {}", code, category)?;
                if !category_title.is_empty() {
                    write!(f, " ({})", category_title)?;
                }
                write!(f, " → chapter {}", chapter)?;
                if !chapter_title.is_empty() {
                    write!(f, " ({})", chapter_title)?;
                }
                Ok(())
            }
        }
    }
}

/// Evidence in a fixed order: similarity, agreement, chapter hint, entity
/// findings, fusion adjustment, taxonomy path.
///
/// `detected` is the chapter the query text pointed to during calibration.
pub fn explain(candidate: &Candidate, hierarchy: &Hierarchy, detected: Option<ChapterIdx>) -> Vec<Evidence> {
    let code = hierarchy.code(candidate.code);
    let (category, chapter) = hierarchy.ancestors(candidate.code);

    let mut evidence = vec![
        Evidence::Similarity { score: candidate.similarity },
        Evidence::Agreement {
            score: candidate.agreement,
            same_category: candidate.same_category,
            same_chapter: candidate.same_chapter,
        },
    ];
    if let (Some(hint), Some(agrees)) = (detected, candidate.chapter_hint) {
        evidence.push(Evidence::ChapterHint { chapter: hierarchy.chapter(hint).id.clone(), agrees });
    }
    if let Some(trace) = &candidate.fusion {
        evidence.extend(trace.findings.iter().cloned().map(|finding| Evidence::Attribute { finding }));
        if trace.adjustment() != 0.0 {
            evidence.push(Evidence::FusionAdjustment { adjustment: trace.adjustment() });
        }
    }
    evidence.push(Evidence::Path {
        code: code.id.clone(),
        category: category.id.clone(),
        category_title: category.title.clone(),
        chapter: chapter.id.clone(),
        chapter_title: chapter.title.clone(),
    });
    evidence
}

pub fn render(evidence: &[Evidence]) -> Vec<String> {
    evidence.iter().map(ToString::to_string).collect()
}
