//! Human-readable run summary.

use std::fmt::Write;

use chrono::{DateTime, Utc};
use tlm_core::{LatencyReport, ReportStatus};

const RULE: &str = "==================================================";

fn timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S%.3f UTC").to_string()
}

/// Render the report for the terminal.
///
/// Always includes network, symbol, side and size, plus whichever
/// timestamps and latency the run obtained.
pub fn render(report: &LatencyReport) -> String {
    let mut out = String::new();
    let status = match report.status {
        ReportStatus::Success => "SUCCESS",
        ReportStatus::Timeout => "TIMEOUT",
        ReportStatus::Error => "ERROR",
    };

    // Writing to a String cannot fail.
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "Trade latency report [{status}]");
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "Run ID:         {}", report.run_id);
    let _ = writeln!(out, "Network:        {}", report.network);
    let _ = writeln!(out, "Symbol:         {}", report.symbol);
    let _ = writeln!(out, "Side:           {}", report.side);
    let _ = writeln!(out, "Size:           {}", report.size);
    let _ = writeln!(out, "Target:         {}", report.target_identifier);

    if let Some(id) = &report.order_identifier {
        let _ = writeln!(out, "Order ID:       {id}");
    }
    if let Some(send) = &report.send_time {
        let _ = writeln!(out, "Sent at:        {}", timestamp(send));
    }
    if let Some(receive) = &report.receive_time {
        let _ = writeln!(out, "Received at:    {}", timestamp(receive));
    }
    if let Some(file) = &report.received_file {
        let _ = writeln!(out, "File:           {}", file.display());
    }
    if let (Some(ms), Some(secs)) = (report.latency_ms, report.latency_seconds) {
        let _ = writeln!(out, "Latency:        {ms:.3} ms ({secs:.3} s)");
    }
    if let Some(detail) = &report.error_detail {
        let _ = writeln!(out, "Detail:         {detail}");
    }
    if report.threshold_exceeded {
        let _ = writeln!(
            out,
            "WARNING: latency exceeds alert threshold of {} ms",
            report.latency_threshold_ms
        );
    }
    let _ = write!(out, "{RULE}");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use std::path::PathBuf;
    use std::time::Duration;
    use tlm_core::{Network, ObservationEvent, OrderOutcome, OrderSide, RunContext, TargetIdentifier};

    fn ctx() -> RunContext {
        RunContext {
            run_id: "run-7".to_string(),
            network: Network::Testnet,
            symbol: "SOL".to_string(),
            side: OrderSide::Sell,
            size: dec!(0.1),
            target: TargetIdentifier::new("0xabc").unwrap(),
            latency_threshold_ms: 1_000,
        }
    }

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_000 + ms).unwrap()
    }

    #[test]
    fn test_success_summary() {
        let event = ObservationEvent {
            timestamp: at(1_500),
            file_path: PathBuf::from("/hl/data/node_trades/hourly/20240101/3"),
            matched_content: String::new(),
        };
        let report = LatencyReport::success(
            &ctx(),
            OrderOutcome::Identifier {
                id: "42".to_string(),
            },
            at(0),
            &event,
        );

        let text = render(&report);
        assert!(text.contains("[SUCCESS]"));
        assert!(text.contains("Order ID:       42"));
        assert!(text.contains("1500.000 ms (1.500 s)"));
        assert!(text.contains("node_trades"));
        assert!(text.contains("WARNING: latency exceeds alert threshold of 1000 ms"));
    }

    #[test]
    fn test_timeout_summary_has_common_fields() {
        let report = LatencyReport::timeout(
            &ctx(),
            OrderOutcome::Rejected {
                reason: "insufficient minimum value".to_string(),
            },
            at(0),
            Duration::from_secs(2),
        );

        let text = render(&report);
        assert!(text.contains("[TIMEOUT]"));
        assert!(text.contains("Network:        testnet"));
        assert!(text.contains("Side:           sell"));
        assert!(text.contains("Size:           0.1"));
        assert!(text.contains("Sent at:"));
        assert!(!text.contains("Latency:"));
        assert!(!text.contains("Order ID:"));
        assert!(text.contains("insufficient minimum value"));
    }

    #[test]
    fn test_error_summary_without_send_time() {
        let report = LatencyReport::error(&ctx(), None, None, "watch setup failed: denied");
        let text = render(&report);
        assert!(text.contains("[ERROR]"));
        assert!(!text.contains("Sent at:"));
        assert!(text.contains("watch setup failed: denied"));
    }
}
