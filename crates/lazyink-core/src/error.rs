//! Engine errors.

use thiserror::Error;

/// Errors returned by engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid save data: {0}")]
    InvalidSaveData(String),
    #[error("Save data has no `lines` array")]
    MissingLines,
    #[error("Malformed line {index}: {reason}")]
    MalformedLine { index: usize, reason: String },
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
