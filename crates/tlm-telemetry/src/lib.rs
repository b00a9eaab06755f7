//! Structured logging for the trade latency monitor.
//!
//! - Pretty console output in development, JSON when `RUST_ENV=production`
//! - `RUST_LOG` filtering with a crate-level default
//! - Optional plain-text log file alongside the console

pub mod error;
pub mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{init_logging, LogFormat, LoggingConfig, DEFAULT_FILTER};
