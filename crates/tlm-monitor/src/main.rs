//! Trade latency monitor - entry point
//!
//! `tlm run` sends one order and waits for the node to record it.
//! `tlm check-config` and `tlm balance` never trade.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tlm_exchange::{DynExchangeClient, HyperliquidExchange, InfoClient, KeyManager};
use tlm_monitor::{summary, BalanceReport, LatencyCoordinator, MonitorConfig};
use tracing::{error, info};

/// Trade latency monitor for a local node
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via TLM_CONFIG env var)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, Default)]
enum Command {
    /// Run one latency measurement (default)
    #[default]
    Run,
    /// Validate and print the effective configuration
    CheckConfig,
    /// Show account balances, positions and open orders
    Balance,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let config = MonitorConfig::load(args.config.as_deref())?;
    tlm_telemetry::init_logging(&config.logging)?;

    info!("Starting trade latency monitor v{}", env!("CARGO_PKG_VERSION"));

    match args.command.unwrap_or_default() {
        Command::Run => run(config).await,
        Command::CheckConfig => check_config(&config),
        Command::Balance => balance(&config).await,
    }
}

fn load_key(config: &MonitorConfig) -> Result<Arc<KeyManager>> {
    config.validate()?;
    let key_manager = KeyManager::load(&config.key.to_key_source())
        .context("Failed to load trading key")?;
    info!(address = %key_manager.target(), "Trading key loaded");
    Ok(Arc::new(key_manager))
}

async fn run(config: MonitorConfig) -> Result<ExitCode> {
    let key_manager = load_key(&config)?;
    let target = key_manager.target().clone();

    let exchange = HyperliquidExchange::connect(config.network, key_manager)
        .await
        .context("Failed to connect to exchange")?;
    let client: DynExchangeClient = Arc::new(exchange);

    let coordinator = LatencyCoordinator::from_config(&config, target, client);
    let report = coordinator.run_once().await;

    println!("{}", summary::render(&report));

    if report.status.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        error!(status = %report.status, "Measurement did not succeed");
        Ok(ExitCode::FAILURE)
    }
}

fn check_config(config: &MonitorConfig) -> Result<ExitCode> {
    println!("{}", config.describe());
    match config.validate() {
        Ok(()) => {
            println!("\nConfiguration OK");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            println!("\n{e}");
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn balance(config: &MonitorConfig) -> Result<ExitCode> {
    let key_manager = load_key(config)?;
    let info_client = InfoClient::for_network(config.network)?;

    let report = BalanceReport::fetch(&info_client, config.network, key_manager.target()).await?;
    println!("{}", report.render());

    let path = BalanceReport::snapshot_path(&config.results_file, config.network);
    if let Err(e) = report.save(&path) {
        error!(path = %path.display(), error = %e, "Failed to save balance snapshot");
    }
    Ok(ExitCode::SUCCESS)
}
