//! End-to-end runs of the latency coordinator.
//!
//! Drives a `MockExchange` against a temporary node directory:
//! - Node writes the trade after a delay
//! - Node never writes it
//! - Rejected and failed submissions
//! - Observer setup failure and result persistence

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rust_decimal_macros::dec;
use serde_json::json;
use tempfile::TempDir;
use tlm_core::{Network, OrderOutcome, OrderSide, ReportStatus, TargetIdentifier};
use tlm_exchange::{DynExchangeClient, MockExchange, MockResponse};
use tlm_monitor::{CoordinatorConfig, LatencyCoordinator};
use tlm_persistence::ReportStore;
use tlm_watch::{FileSystemObserver, ObserverConfig};

const TARGET: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";
const POLL_INTERVAL: Duration = Duration::from_millis(10);
const SETTLE_DELAY: Duration = Duration::from_millis(50);

fn config(timeout: Duration) -> CoordinatorConfig {
    CoordinatorConfig {
        network: Network::Testnet,
        symbol: "SOL".to_string(),
        side: OrderSide::Buy,
        size: dec!(0.1),
        slippage: dec!(0.1),
        timeout,
        poll_interval: POLL_INTERVAL,
        settle_delay: SETTLE_DELAY,
        latency_threshold_ms: 10_000,
    }
}

fn coordinator(
    root: &Path,
    timeout: Duration,
    mock: &Arc<MockExchange>,
    store: Option<ReportStore>,
) -> LatencyCoordinator {
    let observer = FileSystemObserver::new(
        ObserverConfig::new(root).with_scan_interval(Duration::from_millis(10)),
    );
    let client: DynExchangeClient = mock.clone();
    LatencyCoordinator::new(
        config(timeout),
        TargetIdentifier::new(TARGET).unwrap(),
        client,
        observer,
        store,
    )
}

/// Simulate the node writing a trade line `delay` after the order arrives.
fn write_trade_on_submit(mock: &MockExchange, path: PathBuf, delay: Duration) {
    mock.on_submit(move |_| {
        let path = path.clone();
        std::thread::spawn(move || {
            std::thread::sleep(delay);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            let line = format!(
                r#"{{"coin":"SOL","side":"B","px":"150.0","sz":"0.1","users":["{}","0x0000"]}}"#,
                TARGET.to_uppercase()
            );
            std::fs::write(&path, line).unwrap();
        });
    });
}

#[tokio::test]
async fn test_trade_recorded_by_node_is_success() {
    let dir = TempDir::new().unwrap();
    let mock = Arc::new(MockExchange::new());
    let trade_file = dir
        .path()
        .join("node_trades")
        .join("hourly")
        .join("20240101")
        .join("9");
    write_trade_on_submit(&mock, trade_file.clone(), Duration::from_millis(300));

    let report = coordinator(dir.path(), Duration::from_secs(5), &mock, None)
        .run_once()
        .await;

    assert_eq!(report.status, ReportStatus::Success);
    assert_eq!(report.order_identifier.as_deref(), Some("1"));
    assert_eq!(report.received_file.as_deref(), Some(trade_file.as_path()));
    assert!(report.send_time.unwrap() <= report.receive_time.unwrap());

    let latency = report.latency_ms.unwrap();
    assert!(latency >= 250.0, "latency {latency}ms too small");
    assert!(latency < 3_000.0, "latency {latency}ms too large");
    assert!(!report.threshold_exceeded);

    let requests = mock.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].symbol, "SOL");
    assert!(requests[0].is_buy);
    assert_eq!(requests[0].size, dec!(0.1));
}

#[tokio::test]
async fn test_nothing_written_is_timeout() {
    let dir = TempDir::new().unwrap();
    let mock = Arc::new(MockExchange::new());
    let timeout = Duration::from_secs(1);

    let started = Instant::now();
    let report = coordinator(dir.path(), timeout, &mock, None)
        .run_once()
        .await;
    let elapsed = started.elapsed();

    assert_eq!(report.status, ReportStatus::Timeout);
    assert!(report.send_time.is_some());
    assert!(report.receive_time.is_none());
    assert!(report.latency_ms.is_none());
    assert_eq!(report.order_identifier.as_deref(), Some("1"));
    // Settle, full timeout, then at most one poll plus observer shutdown
    let upper = timeout + SETTLE_DELAY + 20 * POLL_INTERVAL;
    assert!(elapsed >= timeout + SETTLE_DELAY, "returned after {elapsed:?}");
    assert!(elapsed < upper, "returned after {elapsed:?}, limit {upper:?}");
}

#[tokio::test]
async fn test_unrelated_writes_do_not_match() {
    let dir = TempDir::new().unwrap();
    let mock = Arc::new(MockExchange::new());
    let path = dir.path().join("node_trades").join("other");
    mock.on_submit(move |_| {
        let path = path.clone();
        std::thread::spawn(move || {
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, r#"{"users":["0x1111","0x2222"]}"#).unwrap();
        });
    });

    let report = coordinator(dir.path(), Duration::from_millis(500), &mock, None)
        .run_once()
        .await;

    assert_eq!(report.status, ReportStatus::Timeout);
}

#[tokio::test]
async fn test_rejected_order_resolves_by_timeout() {
    let dir = TempDir::new().unwrap();
    let mock = Arc::new(MockExchange::with_response(MockResponse::Json(json!({
        "status": "ok",
        "response": {
            "type": "order",
            "data": {"statuses": [{"error": "Order must have minimum value of $10."}]}
        }
    }))));

    let report = coordinator(dir.path(), Duration::from_millis(300), &mock, None)
        .run_once()
        .await;

    assert_eq!(report.status, ReportStatus::Timeout);
    assert!(report.order_identifier.is_none());
    assert!(matches!(
        report.order_outcome,
        Some(OrderOutcome::Rejected { ref reason }) if reason.contains("minimum value")
    ));
    assert!(report
        .error_detail
        .as_deref()
        .unwrap()
        .contains("order rejected"));
}

#[tokio::test]
async fn test_transport_failure_still_measures_with_fallback_token() {
    let dir = TempDir::new().unwrap();
    let mock = Arc::new(MockExchange::with_response(MockResponse::Transport(
        "connection reset".to_string(),
    )));
    write_trade_on_submit(
        &mock,
        dir.path().join("node_fills").join("0"),
        Duration::from_millis(100),
    );

    let report = coordinator(dir.path(), Duration::from_secs(5), &mock, None)
        .run_once()
        .await;

    assert_eq!(report.status, ReportStatus::Success);
    assert_eq!(report.order_identifier.as_deref(), Some("addr_0xf39fd6e5"));
    assert!(matches!(
        report.order_outcome,
        Some(OrderOutcome::Fallback { cause: Some(_), .. })
    ));
}

#[tokio::test]
async fn test_watch_setup_failure_sends_no_order() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("not_a_dir");
    std::fs::write(&blocker, "x").unwrap();
    let mock = Arc::new(MockExchange::new());

    let report = coordinator(&blocker.join("data"), Duration::from_secs(1), &mock, None)
        .run_once()
        .await;

    assert_eq!(report.status, ReportStatus::Error);
    assert!(report.send_time.is_none());
    assert!(report.order_outcome.is_none());
    assert!(report
        .error_detail
        .as_deref()
        .unwrap()
        .starts_with("watch setup failed"));
    assert!(mock.requests().is_empty());
}

#[tokio::test]
async fn test_report_is_appended_to_results_file() {
    let dir = TempDir::new().unwrap();
    let node_dir = dir.path().join("data");
    let results = dir.path().join("out").join("latency_results.json");
    assert!(!results.exists());

    let mock = Arc::new(MockExchange::new());
    write_trade_on_submit(&mock, node_dir.join("trades"), Duration::from_millis(50));

    let coordinator = coordinator(
        &node_dir,
        Duration::from_secs(2),
        &mock,
        Some(ReportStore::new(&results)),
    );
    let first = coordinator.run_once().await;

    let saved = ReportStore::new(&results).read_all().unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].run_id, first.run_id);
    assert_eq!(saved[0].status, ReportStatus::Success);

    // Second run: same file already holds the target, nothing new is written
    mock.on_submit(|_| {});
    let second = coordinator.run_once().await;
    assert_ne!(second.run_id, first.run_id);

    let saved = ReportStore::new(&results).read_all().unwrap();
    assert_eq!(saved.len(), 2);
    assert_eq!(saved[1].run_id, second.run_id);
}

#[tokio::test]
async fn test_unwritable_results_file_does_not_change_report() {
    let dir = TempDir::new().unwrap();
    let node_dir = dir.path().join("data");
    let results = dir.path().join("latency_results.json");
    let corrupt = r#"{"not": "an array"}"#;
    std::fs::write(&results, corrupt).unwrap();

    let mock = Arc::new(MockExchange::new());
    write_trade_on_submit(&mock, node_dir.join("trades"), Duration::from_millis(50));

    let report = coordinator(
        &node_dir,
        Duration::from_secs(5),
        &mock,
        Some(ReportStore::new(&results)),
    )
    .run_once()
    .await;

    assert_eq!(report.status, ReportStatus::Success);
    assert!(report.latency_ms.is_some());
    assert!(report.error_detail.is_none());
    assert_eq!(std::fs::read_to_string(&results).unwrap(), corrupt);
}
