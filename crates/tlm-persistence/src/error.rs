//! Persistence error types.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The result file exists but does not hold a JSON array.
    #[error("Result file {path} is not a JSON array: {reason}")]
    Corrupt { path: PathBuf, reason: String },
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;
