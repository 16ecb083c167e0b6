//! The ranking pipeline: retrieval, structural agreement, calibration,
//! entity fusion, threshold, top-K and explanations.
//!
//! A `RankingEngine` is immutable after construction and can be shared across
//! threads behind an `Arc`; every call works on its own candidate buffers.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use dxrank_core::config::RankingConfig;
use dxrank_core::traits::{Embedder, EntityExtractor, VectorIndex};
use dxrank_core::types::{AbsenceReason, EntitySignal};
use dxrank_core::{Error, Result};
use dxrank_hierarchy::{ChapterIdx, Hierarchy};

use crate::calibrate::{apply_threshold, calibrate, sort_candidates, CalibrationParams};
use crate::candidate::Candidate;
use crate::consistency::{score_agreement, AgreementWeights};
use crate::explain::{explain, render};
use crate::fusion::{documentation_gaps, fuse, DocumentationGap, FusionParams};
use crate::retriever::{CandidateRetriever, RetrievedCode};

/// Per-request overrides of the configured ranking knobs.
///
/// Values are checked here, so a constructed `QueryOptions` is always usable.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct QueryOptions {
    top_k: Option<usize>,
    min_confidence: Option<f64>,
    enable_fusion: Option<bool>,
}

impl QueryOptions {
    pub fn new(top_k: Option<usize>, min_confidence: Option<f64>, enable_fusion: Option<bool>) -> Result<Self> {
        if top_k == Some(0) {
            return Err(Error::config("top_k must be positive"));
        }
        if let Some(m) = min_confidence {
            if !(0.0..=1.0).contains(&m) {
                return Err(Error::config(format!("min_confidence must be within [0, 1], got {}", m)));
            }
        }
        Ok(Self { top_k, min_confidence, enable_fusion })
    }

    pub fn top_k(&self) -> Option<usize> {
        self.top_k
    }

    pub fn min_confidence(&self) -> Option<f64> {
        self.min_confidence
    }

    pub fn enable_fusion(&self) -> Option<bool> {
        self.enable_fusion
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeRef {
    pub id: String,
    pub title: String,
}

/// One ranked code as returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCode {
    pub code: String,
    pub description: String,
    pub confidence: f64,
    pub similarity: f64,
    pub agreement: f64,
    pub category: NodeRef,
    pub chapter: NodeRef,
    pub synonyms: Vec<String>,
    pub explanation: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FusionStatus {
    Applied,
    Disabled,
    Skipped { reason: AbsenceReason },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ranking {
    pub results: Vec<RankedCode>,
    pub documentation_gaps: Vec<DocumentationGap>,
    pub fusion: FusionStatus,
    pub detected_chapter: Option<String>,
    /// Candidates that came back from retrieval.
    pub retrieved: usize,
}

/// Result of a ranking run. An empty answer is an outcome, never an `Err`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RankingOutcome {
    Ranked(Ranking),
    NoQualifyingCandidate { retrieved: usize, best_confidence: Option<f64> },
}

impl RankingOutcome {
    pub fn ranking(&self) -> Option<&Ranking> {
        match self {
            Self::Ranked(r) => Some(r),
            Self::NoQualifyingCandidate { .. } => None,
        }
    }

    pub fn into_ranking(self) -> Option<Ranking> {
        match self {
            Self::Ranked(r) => Some(r),
            Self::NoQualifyingCandidate { .. } => None,
        }
    }
}

pub struct RankingEngine {
    hierarchy: Arc<Hierarchy>,
    config: RankingConfig,
    dimension: Option<usize>,
}

impl RankingEngine {
    pub fn new(hierarchy: Arc<Hierarchy>, config: RankingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { hierarchy, config, dimension: None })
    }

    /// Require query embeddings of exactly `dim` components.
    pub fn with_dimension(mut self, dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(Error::config("embedding dimension must be positive"));
        }
        self.dimension = Some(dim);
        Ok(self)
    }

    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    pub fn config(&self) -> &RankingConfig {
        &self.config
    }

    pub fn retriever<I: VectorIndex>(&self, index: I) -> CandidateRetriever<'_, I> {
        let retriever = CandidateRetriever::new(index, &self.hierarchy, self.config.max_candidates);
        match self.dimension {
            Some(dim) => retriever.with_dimension(dim),
            None => retriever,
        }
    }

    /// Rank an already retrieved candidate set.
    pub fn rank(
        &self,
        query_text: &str,
        retrieved: Vec<RetrievedCode>,
        signal: &EntitySignal,
        options: &QueryOptions,
    ) -> RankingOutcome {
        let h = self.hierarchy.as_ref();
        let cfg = &self.config;
        let top_k = options.top_k().unwrap_or(cfg.top_k);
        let min_confidence = options.min_confidence().unwrap_or(cfg.min_confidence);
        let fusion_enabled = options.enable_fusion().unwrap_or(cfg.enable_fusion);

        let total = retrieved.len();
        if total == 0 {
            info!("no candidates retrieved");
            return RankingOutcome::NoQualifyingCandidate { retrieved: 0, best_confidence: None };
        }

        let mut candidates: Vec<Candidate> = retrieved
            .into_iter()
            .map(|r| Candidate::new(r.code, h.code(r.code).id.clone(), r.similarity))
            .collect();
        score_agreement(
            &mut candidates,
            h,
            AgreementWeights { category: cfg.category_weight, chapter: cfg.chapter_weight },
        );
        let detected = h.detect_chapter(query_text);
        calibrate(
            &mut candidates,
            h,
            detected,
            CalibrationParams { alpha: cfg.alpha, chapter_hint_bonus: cfg.chapter_hint_bonus },
        );

        let fusion = if !fusion_enabled {
            FusionStatus::Disabled
        } else {
            match signal {
                EntitySignal::Present(entities) => match entities.clone().validated() {
                    Ok(entities) => {
                        fuse(
                            &mut candidates,
                            h,
                            &entities,
                            FusionParams { bonus: cfg.fusion_bonus, penalty: cfg.fusion_penalty, cap: cfg.fusion_cap },
                        );
                        FusionStatus::Applied
                    }
                    Err(reason) => {
                        warn!(%reason, "entity fusion skipped");
                        FusionStatus::Skipped { reason: AbsenceReason::Malformed(reason) }
                    }
                },
                EntitySignal::Absent(reason) => {
                    debug!(%reason, "entity fusion skipped");
                    FusionStatus::Skipped { reason: reason.clone() }
                }
            }
        };

        // The cut applies to the confidence the caller will see.
        let best_confidence = candidates.iter().map(|c| c.confidence).max_by(f64::total_cmp);
        let mut candidates = apply_threshold(candidates, min_confidence);
        if candidates.is_empty() {
            info!(retrieved = total, ?best_confidence, min_confidence, "no candidate above threshold");
            return RankingOutcome::NoQualifyingCandidate { retrieved: total, best_confidence };
        }
        sort_candidates(&mut candidates);

        candidates.truncate(top_k);
        let documentation_gaps = documentation_gaps(&candidates);
        let results: Vec<RankedCode> = candidates.iter().map(|c| self.present(c, detected)).collect();

        info!(
            retrieved = total,
            returned = results.len(),
            gaps = documentation_gaps.len(),
            top = results.first().map(|r| r.code.as_str()).unwrap_or(""),
            "ranking complete"
        );
        RankingOutcome::Ranked(Ranking {
            results,
            documentation_gaps,
            fusion,
            detected_chapter: detected.map(|idx| h.chapter(idx).id.clone()),
            retrieved: total,
        })
    }

    /// Retrieve from `index` and rank in one call.
    pub fn run<I: VectorIndex>(
        &self,
        index: I,
        query_vec: &[f32],
        query_text: &str,
        signal: &EntitySignal,
        options: &QueryOptions,
    ) -> Result<RankingOutcome> {
        let retrieved = self.retriever(index).retrieve(query_vec, self.config.max_candidates)?;
        Ok(self.rank(query_text, retrieved, signal, options))
    }

    /// Embed the query text, optionally extract entities, then run.
    ///
    /// Extraction failures downgrade to a skipped fusion; embedding failures
    /// are query errors.
    pub fn run_text<I: VectorIndex>(
        &self,
        embedder: &dyn Embedder,
        index: I,
        text: &str,
        extractor: Option<&dyn EntityExtractor>,
        options: &QueryOptions,
    ) -> Result<RankingOutcome> {
        if let Some(expected) = self.dimension {
            if embedder.dim() != expected {
                return Err(Error::DimensionMismatch { expected, actual: embedder.dim() });
            }
        }
        let query_vec = embedder.embed(text).map_err(|e| Error::InvalidQuery(format!("embedding failed: {:#}", e)))?;
        let signal = match extractor {
            Some(x) => EntitySignal::from_extraction(x.extract(text)),
            None => EntitySignal::none(),
        };
        self.run(index, &query_vec, text, &signal, options)
    }

    fn present(&self, c: &Candidate, detected: Option<ChapterIdx>) -> RankedCode {
        let code = self.hierarchy.code(c.code);
        let (category, chapter) = self.hierarchy.ancestors(c.code);
        RankedCode {
            code: code.id.clone(),
            description: code.description.clone(),
            confidence: c.confidence,
            similarity: c.similarity,
            agreement: c.agreement,
            category: NodeRef { id: category.id.clone(), title: category.title.clone() },
            chapter: NodeRef { id: chapter.id.clone(), title: chapter.title.clone() },
            synonyms: code.synonyms.clone(),
            explanation: render(&explain(c, &self.hierarchy, detected)),
        }
    }
}
