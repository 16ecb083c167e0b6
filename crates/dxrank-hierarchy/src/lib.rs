//! dxrank-hierarchy
//!
//! The static code taxonomy: loading, validation and O(1) structural lookups.
//! See `dataset` for the accepted JSON shapes and `icd10` for the built-in
//! chapter table used by flat datasets.

pub mod code_format;
pub mod dataset;
pub mod hierarchy;
pub mod icd10;

pub use dataset::{load_path, Dataset};
pub use hierarchy::{Category, CategoryIdx, Chapter, ChapterIdx, Code, CodeIdx, Hierarchy};
