//! Exchange error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExchangeError {
    /// Connection, TLS or timeout failure before a response was received.
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Unknown asset: {0}")]
    UnknownAsset(String),

    #[error("No mid price for {0}")]
    NoMidPrice(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Signing failed: {0}")]
    Signing(#[from] crate::signer::SignerError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for ExchangeError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

pub type ExchangeResult<T> = Result<T, ExchangeError>;
