//! Core domain types for the trade latency monitor.
//!
//! This crate provides the types shared by every stage of a measurement run:
//! - `TargetIdentifier`: Case-normalized string searched for in node files
//! - `OrderSide`, `Network`: Order and environment selection
//! - `OrderOutcome`: Classified exchange response
//! - `ObservationEvent`, `LatencyReport`: Observation and the persisted result
//! - Decimal helpers for exchange price/size precision

pub mod decimal;
pub mod error;
pub mod outcome;
pub mod report;
pub mod types;

pub use decimal::{format_decimal, round_price, round_size, PERP_MAX_DECIMALS, PRICE_SIG_FIGS};
pub use error::{CoreError, Result};
pub use outcome::OrderOutcome;
pub use report::{Latency, LatencyReport, ObservationEvent, ReportStatus, RunContext};
pub use types::{Network, OrderSide, TargetIdentifier};
