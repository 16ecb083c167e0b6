//! dxrank-engine
//!
//! Turns nearest-neighbour hits into a calibrated, explained shortlist of codes.
//! The stages are exposed individually for callers that bring their own
//! retrieval; `RankingEngine` wires them together.

pub mod calibrate;
pub mod candidate;
pub mod consistency;
pub mod engine;
pub mod explain;
pub mod fusion;
pub mod retriever;

pub use candidate::Candidate;
pub use engine::{FusionStatus, NodeRef, QueryOptions, RankedCode, Ranking, RankingEngine, RankingOutcome};
pub use fusion::{DocumentationGap, GapReason};
pub use retriever::{CandidateRetriever, RetrievedCode};
