//! Typed boundary around an external nearest-neighbour index.

use std::collections::HashMap;
use tracing::{debug, warn};

use dxrank_core::traits::VectorIndex;
use dxrank_core::{Error, Result};
use dxrank_hierarchy::{CodeIdx, Hierarchy};

use crate::candidate::clamp_unit;

/// A neighbour resolved against the hierarchy, similarity already in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrievedCode {
    pub code: CodeIdx,
    pub similarity: f64,
}

pub struct CandidateRetriever<'h, I> {
    index: I,
    hierarchy: &'h Hierarchy,
    max_k: usize,
    dimension: Option<usize>,
}

impl<'h, I: VectorIndex> CandidateRetriever<'h, I> {
    pub fn new(index: I, hierarchy: &'h Hierarchy, max_k: usize) -> Self {
        Self { index, hierarchy, max_k, dimension: None }
    }

    /// Reject query vectors whose length differs from `dim`.
    pub fn with_dimension(mut self, dim: usize) -> Self {
        self.dimension = Some(dim);
        self
    }

    pub fn max_k(&self) -> usize {
        self.max_k
    }

    /// Fetch up to `min(k, max_k)` codes, best first.
    ///
    /// Index failures surface as `RetrievalUnavailable` and are not retried.
    /// Hits naming codes the hierarchy does not know are dropped; duplicate
    /// hits keep their best score.
    pub fn retrieve(&self, query_vec: &[f32], k: usize) -> Result<Vec<RetrievedCode>> {
        self.check_query(query_vec)?;
        let k = k.min(self.max_k);
        if k == 0 {
            return Ok(Vec::new());
        }

        let hits = self
            .index
            .search_vec(query_vec, k)
            .map_err(|e| Error::RetrievalUnavailable(format!("{:#}", e)))?;
        let raw = hits.len();

        let mut best: HashMap<CodeIdx, f64> = HashMap::with_capacity(hits.len());
        let mut unknown = 0usize;
        for hit in hits {
            let Some(code) = self.hierarchy.lookup(&hit.id) else {
                unknown += 1;
                warn!(id = %hit.id, "index returned a code missing from the hierarchy");
                continue;
            };
            let similarity = clamp_unit(hit.score);
            best.entry(code).and_modify(|s| *s = s.max(similarity)).or_insert(similarity);
        }

        let mut retrieved: Vec<RetrievedCode> =
            best.into_iter().map(|(code, similarity)| RetrievedCode { code, similarity }).collect();
        retrieved.sort_by(|a, b| {
            b.similarity
                .total_cmp(&a.similarity)
                .then_with(|| self.hierarchy.code(a.code).id.cmp(&self.hierarchy.code(b.code).id))
        });
        retrieved.truncate(k);
        debug!(raw, unknown, kept = retrieved.len(), k, "retrieved candidates");
        Ok(retrieved)
    }

    fn check_query(&self, query_vec: &[f32]) -> Result<()> {
        if query_vec.is_empty() {
            return Err(Error::InvalidQuery("query embedding is empty".to_string()));
        }
        if let Some(expected) = self.dimension {
            if query_vec.len() != expected {
                return Err(Error::DimensionMismatch { expected, actual: query_vec.len() });
            }
        }
        if query_vec.iter().any(|x| !x.is_finite()) {
            return Err(Error::InvalidQuery("query embedding contains non-finite values".to_string()));
        }
        Ok(())
    }
}
