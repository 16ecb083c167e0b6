use thiserror::Error;

/// Faults raised by the ranking core.
///
/// "Nothing plausible was found" is deliberately absent: that is a normal
/// ranking outcome, not a fault.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Data integrity violation: {0}")]
    DataIntegrity(String),

    #[error("Retrieval unavailable: {0}")]
    RetrievalUnavailable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn integrity(msg: impl Into<String>) -> Self {
        Self::DataIntegrity(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }
}
