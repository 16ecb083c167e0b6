//! Shared types, errors, collaborator traits and configuration for the
//! diagnosis-code ranking workspace.

pub mod config;
pub mod error;
pub mod text;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
