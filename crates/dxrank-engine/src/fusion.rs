//! Entity fusion: fold an external extraction result into candidate confidence
//! and surface documentation gaps.
//!
//! Pure over its inputs. Confidence is always recomputed from the retained
//! pre-fusion value, so applying fusion again with the same entities changes
//! nothing.

use serde::Serialize;
use std::collections::{BTreeSet, HashSet};

use dxrank_core::text::{contains_phrase, words};
use dxrank_core::types::{AttributeEvidence, ExtractedEntities, SpecificityAttribute};
use dxrank_hierarchy::{Code, Hierarchy};

use crate::candidate::{clamp_unit, Candidate};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionParams {
    pub bonus: f64,
    pub penalty: f64,
    /// Cap on the summed bonus and, separately, on the summed penalty.
    pub cap: f64,
}

/// Outcome of comparing one attribute of the extraction with one code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttributeFinding {
    /// The description states a documented value.
    Matched { attribute: SpecificityAttribute, value: String },
    /// The description states a different value than the one documented.
    Conflicting { attribute: SpecificityAttribute, documented: Vec<String>, coded: Vec<String> },
    /// The code needs the attribute but the text mentions it without a value.
    NotDocumented { attribute: SpecificityAttribute },
    /// The text documents a value the code cannot express.
    CodeLacksSpecificity { attribute: SpecificityAttribute, documented: Vec<String> },
}

impl AttributeFinding {
    pub fn attribute(&self) -> SpecificityAttribute {
        match self {
            Self::Matched { attribute, .. }
            | Self::Conflicting { attribute, .. }
            | Self::NotDocumented { attribute }
            | Self::CodeLacksSpecificity { attribute, .. } => *attribute,
        }
    }

    fn is_bonus(&self) -> bool {
        matches!(self, Self::Matched { .. })
    }

    fn is_penalty(&self) -> bool {
        matches!(self, Self::Conflicting { .. } | Self::NotDocumented { .. })
    }

    fn gap_reason(&self) -> Option<GapReason> {
        match self {
            Self::NotDocumented { .. } => Some(GapReason::NotDocumented),
            Self::CodeLacksSpecificity { documented, .. } => {
                Some(GapReason::CodeLacksSpecificity { documented: documented.clone() })
            }
            _ => None,
        }
    }
}

/// Per-candidate record of what fusion did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FusionTrace {
    pub findings: Vec<AttributeFinding>,
    pub bonus: f64,
    pub penalty: f64,
}

impl FusionTrace {
    pub fn adjustment(&self) -> f64 {
        self.bonus - self.penalty
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GapReason {
    NotDocumented,
    CodeLacksSpecificity { documented: Vec<String> },
}

/// Missing clinical specificity needed to assign a more precise code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentationGap {
    pub code: String,
    pub attribute: SpecificityAttribute,
    pub reason: GapReason,
}

impl DocumentationGap {
    pub fn message(&self) -> String {
        match &self.reason {
            GapReason::NotDocumented => format!("{}: {} required but not documented", self.code, self.attribute),
            GapReason::CodeLacksSpecificity { documented } => format!(
                "{}: documented {} '{}' is not captured by this code; a more specific code may apply",
                self.code,
                self.attribute,
                documented.join(", ")
            ),
        }
    }
}

/// Values of `attr`'s closed vocabulary that appear in the description.
fn coded_values(attr: SpecificityAttribute, description: &[String]) -> Vec<String> {
    attr.vocabulary().iter().filter(|v| contains_phrase(description, v)).map(|v| v.to_string()).collect()
}

fn assess(attr: SpecificityAttribute, evidence: &AttributeEvidence, code: &Code, description: &[String]) -> Option<AttributeFinding> {
    match evidence {
        AttributeEvidence::Absent => None,
        AttributeEvidence::Unspecified => code.requires(attr).then_some(AttributeFinding::NotDocumented { attribute: attr }),
        AttributeEvidence::Specified(values) => {
            let mut accepted: BTreeSet<&str> = values.iter().map(String::as_str).collect();
            if attr == SpecificityAttribute::Laterality && accepted.contains("left") && accepted.contains("right") {
                accepted.insert("bilateral");
            }
            if let Some(hit) = accepted.iter().find(|v| contains_phrase(description, v)) {
                return Some(AttributeFinding::Matched { attribute: attr, value: hit.to_string() });
            }
            let documented: Vec<String> = values.iter().cloned().collect();
            let coded = coded_values(attr, description);
            if !coded.is_empty() {
                return Some(AttributeFinding::Conflicting { attribute: attr, documented, coded });
            }
            code.requires(attr).then_some(AttributeFinding::CodeLacksSpecificity { attribute: attr, documented })
        }
    }
}

/// Compare the extraction against one code.
pub fn trace_for(code: &Code, entities: &ExtractedEntities, params: FusionParams) -> FusionTrace {
    let description = words(&code.description);
    let findings: Vec<AttributeFinding> = SpecificityAttribute::ALL
        .iter()
        .filter_map(|&attr| assess(attr, &entities.evidence(attr), code, &description))
        .collect();
    let bonus = (findings.iter().filter(|f| f.is_bonus()).count() as f64 * params.bonus).min(params.cap);
    let penalty = (findings.iter().filter(|f| f.is_penalty()).count() as f64 * params.penalty).min(params.cap);
    FusionTrace { findings, bonus, penalty }
}

/// Adjust every candidate's confidence from its pre-fusion value.
pub fn fuse(candidates: &mut [Candidate], hierarchy: &Hierarchy, entities: &ExtractedEntities, params: FusionParams) {
    for c in candidates.iter_mut() {
        let trace = trace_for(hierarchy.code(c.code), entities, params);
        c.confidence = clamp_unit(c.base_confidence + trace.adjustment());
        c.fusion = Some(trace);
    }
}

/// Gaps for the given candidates in their current order, one per (code, attribute).
pub fn documentation_gaps(candidates: &[Candidate]) -> Vec<DocumentationGap> {
    let mut seen: HashSet<(String, SpecificityAttribute)> = HashSet::new();
    let mut gaps = Vec::new();
    for c in candidates {
        let Some(trace) = &c.fusion else { continue };
        for finding in &trace.findings {
            let Some(reason) = finding.gap_reason() else { continue };
            if seen.insert((c.code_id.clone(), finding.attribute())) {
                gaps.push(DocumentationGap { code: c.code_id.clone(), attribute: finding.attribute(), reason });
            }
        }
    }
    gaps
}
