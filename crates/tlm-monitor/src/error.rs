//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// Every validation problem found, reported together.
    #[error("Invalid configuration: {}", .0.join("; "))]
    InvalidConfig(Vec<String>),

    #[error("Credential error: {0}")]
    Key(#[from] tlm_exchange::KeyError),

    #[error("Exchange error: {0}")]
    Exchange(#[from] tlm_exchange::ExchangeError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] tlm_persistence::PersistenceError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] tlm_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type MonitorResult<T> = Result<T, MonitorError>;
