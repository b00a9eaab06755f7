//! Error types for tlm-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid order side: {0} (expected B/A or buy/sell)")]
    InvalidSide(String),

    #[error("Invalid network: {0} (expected mainnet or testnet)")]
    InvalidNetwork(String),

    #[error("Invalid target identifier: {0}")]
    InvalidTarget(String),

    #[error("Decimal parse error: {0}")]
    DecimalParse(#[from] rust_decimal::Error),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
