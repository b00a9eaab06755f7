//! Observation events and latency reports.
//!
//! A `LatencyReport` is produced exactly once per run, after the race between
//! order submission and file observation has resolved. It is immutable after
//! construction and is the unit of persistence.
//!
//! Invariants enforced by the constructors:
//! - `receive_time`, `latency_ms` and `received_file` are present iff
//!   `status == Success`
//! - `latency_ms >= 0`; a negative wall-clock difference is clamped to zero
//!   and flagged in `error_detail`

use crate::outcome::OrderOutcome;
use crate::types::{Network, OrderSide, TargetIdentifier};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// ObservationEvent
// ============================================================================

/// First file event whose content contained the target identifier.
///
/// `timestamp` is taken when the watcher detects the match, which trails the
/// actual write by up to one scan interval plus one read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationEvent {
    pub timestamp: DateTime<Utc>,
    pub file_path: PathBuf,
    pub matched_content: String,
}

// ============================================================================
// ReportStatus
// ============================================================================

/// Final status of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Success,
    Timeout,
    Error,
}

impl ReportStatus {
    #[inline]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Timeout => write!(f, "timeout"),
            Self::Error => write!(f, "error"),
        }
    }
}

// ============================================================================
// Latency
// ============================================================================

/// Latency between send and observation, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Latency {
    /// Non-negative latency, rounded to microsecond precision.
    pub ms: f64,
    /// Raw wall-clock difference before clamping.
    pub raw_ms: f64,
    /// True when the raw difference was negative (clock stepped backwards).
    pub clamped: bool,
}

impl Latency {
    /// Compute `receive - send`, clamping negative differences to zero.
    pub fn between(send: DateTime<Utc>, receive: DateTime<Utc>) -> Self {
        let delta = receive.signed_duration_since(send);
        let raw_ms = delta
            .num_microseconds()
            .map(|us| us as f64 / 1_000.0)
            .unwrap_or_else(|| delta.num_milliseconds() as f64);

        if raw_ms < 0.0 {
            Self {
                ms: 0.0,
                raw_ms,
                clamped: true,
            }
        } else {
            Self {
                ms: round3(raw_ms),
                raw_ms,
                clamped: false,
            }
        }
    }

    #[inline]
    pub fn seconds(&self) -> f64 {
        round3(self.ms / 1_000.0)
    }
}

fn round3(value: f64) -> f64 {
    (value * 1_000.0).round() / 1_000.0
}

// ============================================================================
// RunContext
// ============================================================================

/// Parameters of one run that every report carries regardless of outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunContext {
    pub run_id: String,
    pub network: Network,
    pub symbol: String,
    pub side: OrderSide,
    pub size: Decimal,
    pub target: TargetIdentifier,
    pub latency_threshold_ms: u64,
}

// ============================================================================
// LatencyReport
// ============================================================================

/// Result of one latency measurement run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencyReport {
    pub run_id: String,
    pub status: ReportStatus,
    /// Exchange identifier or fallback token. Absent for rejected orders and
    /// for runs that aborted before dispatch.
    pub order_identifier: Option<String>,
    pub order_outcome: Option<OrderOutcome>,
    /// Absent only when the run aborted before an order was sent.
    pub send_time: Option<DateTime<Utc>>,
    pub receive_time: Option<DateTime<Utc>>,
    pub latency_ms: Option<f64>,
    pub latency_seconds: Option<f64>,
    pub received_file: Option<PathBuf>,
    pub target_identifier: TargetIdentifier,
    pub symbol: String,
    pub side: OrderSide,
    pub size: Decimal,
    pub network: Network,
    pub latency_threshold_ms: u64,
    pub threshold_exceeded: bool,
    pub error_detail: Option<String>,
    pub produced_at: DateTime<Utc>,
}

impl LatencyReport {
    fn base(ctx: &RunContext, status: ReportStatus) -> Self {
        Self {
            run_id: ctx.run_id.clone(),
            status,
            order_identifier: None,
            order_outcome: None,
            send_time: None,
            receive_time: None,
            latency_ms: None,
            latency_seconds: None,
            received_file: None,
            target_identifier: ctx.target.clone(),
            symbol: ctx.symbol.clone(),
            side: ctx.side,
            size: ctx.size,
            network: ctx.network,
            latency_threshold_ms: ctx.latency_threshold_ms,
            threshold_exceeded: false,
            error_detail: None,
            produced_at: Utc::now(),
        }
    }

    fn with_outcome(mut self, outcome: OrderOutcome) -> Self {
        self.order_identifier = outcome.correlation_id().map(str::to_string);
        self.order_outcome = Some(outcome);
        self
    }

    /// Build a `Success` report from the first matching observation.
    pub fn success(
        ctx: &RunContext,
        outcome: OrderOutcome,
        send_time: DateTime<Utc>,
        event: &ObservationEvent,
    ) -> Self {
        let latency = Latency::between(send_time, event.timestamp);
        let mut details = Vec::new();
        if let Some(detail) = outcome.detail() {
            details.push(detail);
        }
        if latency.clamped {
            details.push(format!(
                "clock adjustment detected: raw latency {:.3}ms clamped to 0",
                latency.raw_ms
            ));
        }

        let mut report = Self::base(ctx, ReportStatus::Success).with_outcome(outcome);
        report.send_time = Some(send_time);
        report.receive_time = Some(event.timestamp);
        report.latency_ms = Some(latency.ms);
        report.latency_seconds = Some(latency.seconds());
        report.received_file = Some(event.file_path.clone());
        report.threshold_exceeded = latency.ms > ctx.latency_threshold_ms as f64;
        report.error_detail = join_details(details);
        report
    }

    /// Build a `Timeout` report: no matching file event within `timeout`.
    pub fn timeout(
        ctx: &RunContext,
        outcome: OrderOutcome,
        send_time: DateTime<Utc>,
        timeout: Duration,
    ) -> Self {
        let mut details = vec![format!(
            "no matching file event within {:.1}s",
            timeout.as_secs_f64()
        )];
        if let Some(detail) = outcome.detail() {
            details.push(detail);
        }

        let mut report = Self::base(ctx, ReportStatus::Timeout).with_outcome(outcome);
        report.send_time = Some(send_time);
        report.error_detail = join_details(details);
        report
    }

    /// Build an `Error` report. `outcome` and `send_time` are present when the
    /// failure happened after dispatch.
    pub fn error(
        ctx: &RunContext,
        outcome: Option<OrderOutcome>,
        send_time: Option<DateTime<Utc>>,
        detail: impl Into<String>,
    ) -> Self {
        let mut report = Self::base(ctx, ReportStatus::Error);
        if let Some(outcome) = outcome {
            report = report.with_outcome(outcome);
        }
        report.send_time = send_time;
        report.error_detail = Some(detail.into());
        report
    }
}

fn join_details(details: Vec<String>) -> Option<String> {
    if details.is_empty() {
        None
    } else {
        Some(details.join("; "))
    }
}
