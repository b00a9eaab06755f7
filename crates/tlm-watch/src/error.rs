//! Observer error types.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WatchError {
    /// The watch root could not be created or scanned.
    #[error("Failed to watch {path}: {source}")]
    Setup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The background scanner could not be started.
    #[error("Observer task failed: {0}")]
    Task(String),
}

pub type WatchResult<T> = Result<T, WatchError>;
