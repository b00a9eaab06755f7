//! Trade latency monitor.
//!
//! Sends one small market order and measures how long the local node takes
//! to write it to its data directory:
//! - Configuration from TOML and environment
//! - Observer / dispatcher race with timeout
//! - Result persistence and terminal summary
//! - Read-only account report

pub mod balance;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod summary;

pub use balance::BalanceReport;
pub use config::{KeySourceConfig, MonitorConfig};
pub use coordinator::{CoordinatorConfig, LatencyCoordinator};
pub use error::{MonitorError, MonitorResult};
