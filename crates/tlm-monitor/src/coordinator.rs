//! Latency measurement run.
//!
//! One run: start the observer, let it settle, send the order, then poll the
//! observer until it matches or the timeout expires. The observer is shut
//! down on every path and the report is persisted when enabled. `run_once`
//! always returns a report; failures end up in its `error_detail`.

use std::time::Duration;

use rust_decimal::Decimal;
use tlm_core::{LatencyReport, Network, OrderSide, RunContext, TargetIdentifier};
use tlm_exchange::{DynExchangeClient, OrderDispatcher};
use tlm_persistence::ReportStore;
use tlm_watch::{FileSystemObserver, ObserverConfig, WatchHandle};
use tokio::time::Instant;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::MonitorConfig;

/// How often a still-waiting run logs progress.
const PROGRESS_LOG_INTERVAL: Duration = Duration::from_secs(10);

/// Parameters of a measurement run.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub network: Network,
    pub symbol: String,
    pub side: OrderSide,
    pub size: Decimal,
    pub slippage: Decimal,
    pub timeout: Duration,
    pub poll_interval: Duration,
    pub settle_delay: Duration,
    pub latency_threshold_ms: u64,
}

impl From<&MonitorConfig> for CoordinatorConfig {
    fn from(config: &MonitorConfig) -> Self {
        Self {
            network: config.network,
            symbol: config.symbol.clone(),
            side: config.side,
            size: config.size,
            slippage: config.slippage,
            timeout: config.monitor_timeout(),
            poll_interval: config.poll_interval(),
            settle_delay: config.settle_delay(),
            latency_threshold_ms: config.latency_threshold_ms(),
        }
    }
}

/// Orchestrates observer, dispatcher and store for one run at a time.
pub struct LatencyCoordinator {
    config: CoordinatorConfig,
    target: TargetIdentifier,
    dispatcher: OrderDispatcher,
    observer: FileSystemObserver,
    store: Option<ReportStore>,
}

impl LatencyCoordinator {
    pub fn new(
        config: CoordinatorConfig,
        target: TargetIdentifier,
        client: DynExchangeClient,
        observer: FileSystemObserver,
        store: Option<ReportStore>,
    ) -> Self {
        Self {
            dispatcher: OrderDispatcher::new(client, target.clone()),
            config,
            target,
            observer,
            store,
        }
    }

    /// Build from the application config.
    pub fn from_config(
        config: &MonitorConfig,
        target: TargetIdentifier,
        client: DynExchangeClient,
    ) -> Self {
        let observer = FileSystemObserver::new(
            ObserverConfig::new(&config.node_files_dir).with_scan_interval(config.scan_interval()),
        );
        let store = config
            .save_results
            .then(|| ReportStore::new(&config.results_file));
        Self::new(config.into(), target, client, observer, store)
    }

    pub fn target(&self) -> &TargetIdentifier {
        &self.target
    }

    /// Run one measurement.
    pub async fn run_once(&self) -> LatencyReport {
        let run_id = Uuid::new_v4().to_string();
        let span = info_span!(
            "latency_run",
            run_id = %run_id,
            network = %self.config.network,
            symbol = %self.config.symbol,
        );

        async move {
            let ctx = RunContext {
                run_id,
                network: self.config.network,
                symbol: self.config.symbol.clone(),
                side: self.config.side,
                size: self.config.size,
                target: self.target.clone(),
                latency_threshold_ms: self.config.latency_threshold_ms,
            };

            let report = self.measure(&ctx).await;
            self.log_report(&report);
            self.persist(&report);
            report
        }
        .instrument(span)
        .await
    }

    async fn measure(&self, ctx: &RunContext) -> LatencyReport {
        let handle = match self.observer.start(self.target.clone()).await {
            Ok(handle) => handle,
            Err(e) => {
                error!(error = %e, "Observer setup failed, no order sent");
                return LatencyReport::error(ctx, None, None, format!("watch setup failed: {e}"));
            }
        };

        let report = self.race(ctx, &handle).await;
        handle.shutdown().await;
        report
    }

    async fn race(&self, ctx: &RunContext, handle: &WatchHandle) -> LatencyReport {
        tokio::time::sleep(self.config.settle_delay).await;

        let (outcome, send_time) = self
            .dispatcher
            .submit(
                &self.config.symbol,
                self.config.side.is_buy(),
                self.config.size,
                self.config.slippage,
            )
            .await;

        // A rejected order still waits: the report then resolves by timeout.
        let started = Instant::now();
        let deadline = started + self.config.timeout;
        let mut next_progress = started + PROGRESS_LOG_INTERVAL;

        info!(
            target_identifier = %self.target,
            timeout_secs = self.config.timeout.as_secs_f64(),
            "Waiting for node to record the trade"
        );

        loop {
            if let Some(event) = handle.matched() {
                return LatencyReport::success(ctx, outcome, send_time, event);
            }

            let now = Instant::now();
            if now >= deadline {
                warn!(
                    timeout_secs = self.config.timeout.as_secs_f64(),
                    "No matching file event before timeout"
                );
                return LatencyReport::timeout(ctx, outcome, send_time, self.config.timeout);
            }
            if now >= next_progress {
                info!(
                    elapsed_secs = (now - started).as_secs(),
                    "Still waiting for node"
                );
                next_progress += PROGRESS_LOG_INTERVAL;
            }

            tokio::time::sleep(self.config.poll_interval.min(deadline - now)).await;
        }
    }

    fn log_report(&self, report: &LatencyReport) {
        match report.latency_ms {
            Some(latency_ms) => info!(
                status = %report.status,
                latency_ms,
                file = ?report.received_file,
                threshold_exceeded = report.threshold_exceeded,
                "Run finished"
            ),
            None => info!(
                status = %report.status,
                detail = report.error_detail.as_deref().unwrap_or(""),
                "Run finished"
            ),
        }
        if report.threshold_exceeded {
            warn!(
                latency_ms = ?report.latency_ms,
                threshold_ms = report.latency_threshold_ms,
                "Latency above alert threshold"
            );
        }
    }

    fn persist(&self, report: &LatencyReport) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(e) = store.append(report) {
            error!(
                path = %store.path().display(),
                error = %e,
                "Failed to save results"
            );
        }
    }
}
