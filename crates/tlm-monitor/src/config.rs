//! Monitor configuration.
//!
//! Sources, lowest to highest precedence: built-in defaults, a TOML file,
//! environment variables. The private key never lives in the config itself;
//! `key` only says where to read it from.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tlm_core::{Network, OrderSide};
use tlm_exchange::{parse_private_key, KeyError, KeySource};
use tlm_telemetry::LoggingConfig;
use zeroize::Zeroizing;

use crate::error::{MonitorError, MonitorResult};

/// Env var naming an alternative config file.
pub const CONFIG_ENV_VAR: &str = "TLM_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
pub const DEFAULT_KEY_ENV_VAR: &str = "PRIVATE_KEY";

/// Where the trading key comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum KeySourceConfig {
    /// Environment variable (development).
    Env { var: String },
    /// Key file (production, recommend 0600 permissions).
    File { path: PathBuf },
}

impl Default for KeySourceConfig {
    fn default() -> Self {
        Self::Env {
            var: DEFAULT_KEY_ENV_VAR.to_string(),
        }
    }
}

impl KeySourceConfig {
    pub fn to_key_source(&self) -> KeySource {
        match self {
            Self::Env { var } => KeySource::EnvVar {
                var_name: var.clone(),
            },
            Self::File { path } => KeySource::File { path: path.clone() },
        }
    }

    /// Read raw key material for validation.
    pub fn read_raw(&self) -> Result<Zeroizing<String>, KeyError> {
        match self {
            Self::Env { var } => std::env::var(var)
                .map(Zeroizing::new)
                .map_err(|_| KeyError::EnvVarNotFound(var.clone())),
            Self::File { path } => Ok(Zeroizing::new(std::fs::read_to_string(path)?)),
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Env { var } => format!("env:{var}"),
            Self::File { path } => format!("file:{}", path.display()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub network: Network,
    pub symbol: String,
    pub side: OrderSide,
    pub size: Decimal,
    /// Fraction of mid price accepted as slippage, in (0, 1].
    pub slippage: Decimal,
    pub monitor_timeout_secs: u64,
    /// Coordinator match-poll period. Governs measurement resolution.
    pub poll_interval_ms: u64,
    /// Wait between starting the observer and sending the order.
    pub settle_delay_ms: u64,
    /// Observer rescan period.
    pub scan_interval_ms: u64,
    pub node_files_dir: PathBuf,
    pub results_file: PathBuf,
    pub save_results: bool,
    /// Alert threshold. Defaults per network when unset.
    pub latency_threshold_ms: Option<u64>,
    pub key: KeySourceConfig,
    pub logging: LoggingConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            network: Network::Testnet,
            symbol: "SOL".to_string(),
            side: OrderSide::Buy,
            size: Decimal::new(1, 1),
            slippage: Decimal::new(1, 1),
            monitor_timeout_secs: 300,
            poll_interval_ms: 100,
            settle_delay_ms: 500,
            scan_interval_ms: 20,
            node_files_dir: PathBuf::from("/home/hluser/hl/data"),
            results_file: PathBuf::from("/home/hluser/hl/data/latency_results.json"),
            save_results: true,
            latency_threshold_ms: None,
            key: KeySourceConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl MonitorConfig {
    /// Load configuration: explicit path, else `TLM_CONFIG`, else
    /// `config/default.toml` if present, else defaults. Environment
    /// overrides are applied on top.
    pub fn load(path: Option<&str>) -> MonitorResult<Self> {
        let explicit = path
            .map(str::to_string)
            .or_else(|| std::env::var(CONFIG_ENV_VAR).ok());

        let mut config = match explicit {
            Some(path) => Self::from_file(&path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::from_file(DEFAULT_CONFIG_PATH)?,
            None => {
                tracing::debug!("No config file, using defaults");
                Self::default()
            }
        };

        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> MonitorResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| MonitorError::Config(format!("Failed to read config {path}: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| MonitorError::Config(format!("Failed to parse config {path}: {e}")))
    }

    /// Apply overrides from environment-style variables.
    ///
    /// `lookup` returns the value of a variable if set.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> MonitorResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parse<T: std::str::FromStr>(name: &str, raw: &str) -> MonitorResult<T>
        where
            T::Err: std::fmt::Display,
        {
            raw.trim()
                .parse()
                .map_err(|e| MonitorError::Config(format!("{name}={raw}: {e}")))
        }

        if let Some(v) = lookup("NETWORK") {
            self.network = parse("NETWORK", &v)?;
        }
        if let Some(v) = lookup("SYMBOL") {
            self.symbol = v.trim().to_string();
        }
        if let Some(v) = lookup("SIDE") {
            self.side = parse("SIDE", &v)?;
        }
        if let Some(v) = lookup("SIZE") {
            self.size = parse("SIZE", &v)?;
        }
        if let Some(v) = lookup("MONITOR_TIMEOUT") {
            self.monitor_timeout_secs = parse("MONITOR_TIMEOUT", &v)?;
        }
        if let Some(v) = lookup("MONITOR_INTERVAL") {
            let secs: f64 = parse("MONITOR_INTERVAL", &v)?;
            if !secs.is_finite() || secs < 0.0 {
                return Err(MonitorError::Config(format!("MONITOR_INTERVAL={v}: must be >= 0")));
            }
            self.poll_interval_ms = (secs * 1_000.0).round() as u64;
        }
        if let Some(v) = lookup("LATENCY_THRESHOLD") {
            self.latency_threshold_ms = Some(parse("LATENCY_THRESHOLD", &v)?);
        }
        if let Some(v) = lookup("NODE_FILES_DIR") {
            self.node_files_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("RESULTS_FILE") {
            self.results_file = PathBuf::from(v);
        }
        if let Some(v) = lookup("SAVE_RESULTS") {
            self.save_results = parse_bool(&v)
                .ok_or_else(|| MonitorError::Config(format!("SAVE_RESULTS={v}: expected a boolean")))?;
        }
        if let Some(v) = lookup("PRIVATE_KEY_FILE") {
            self.key = KeySourceConfig::File {
                path: PathBuf::from(v),
            };
        }
        Ok(())
    }

    /// All problems with the configuration and the given key material.
    pub fn problems(&self, key_material: Result<&str, &KeyError>) -> Vec<String> {
        let mut problems = Vec::new();

        match key_material {
            Ok(raw) => {
                if let Err(e) = parse_private_key(raw) {
                    problems.push(format!("private key: {e}"));
                }
            }
            Err(e) => problems.push(format!("private key: {e}")),
        }
        if self.symbol.trim().is_empty() {
            problems.push("symbol must not be empty".to_string());
        }
        if self.size <= Decimal::ZERO {
            problems.push(format!("size must be > 0, got {}", self.size));
        }
        if self.slippage <= Decimal::ZERO || self.slippage > Decimal::ONE {
            problems.push(format!("slippage must be in (0, 1], got {}", self.slippage));
        }
        if self.monitor_timeout_secs == 0 {
            problems.push("monitor_timeout_secs must be > 0".to_string());
        }
        if self.poll_interval_ms == 0 {
            problems.push("poll_interval_ms must be > 0".to_string());
        }
        if self.scan_interval_ms == 0 {
            problems.push("scan_interval_ms must be > 0".to_string());
        }
        problems
    }

    /// Validate the configuration, reading the key from its source.
    ///
    /// # Errors
    /// `MonitorError::InvalidConfig` listing every problem found.
    pub fn validate(&self) -> MonitorResult<()> {
        let raw = self.key.read_raw();
        let problems = self.problems(raw.as_ref().map(|k| k.as_str()));
        if problems.is_empty() {
            Ok(())
        } else {
            Err(MonitorError::InvalidConfig(problems))
        }
    }

    pub fn latency_threshold_ms(&self) -> u64 {
        self.latency_threshold_ms
            .unwrap_or_else(|| self.network.default_latency_threshold_ms())
    }

    pub fn monitor_timeout(&self) -> Duration {
        Duration::from_secs(self.monitor_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_ms)
    }

    /// Human-readable effective configuration. Never includes key material.
    pub fn describe(&self) -> String {
        [
            format!("Network:           {} ({})", self.network, self.network.api_url()),
            format!("Symbol:            {}", self.symbol),
            format!("Side:              {}", self.side),
            format!("Size:              {}", self.size),
            format!("Slippage:          {}", self.slippage),
            format!("Node files dir:    {}", self.node_files_dir.display()),
            format!("Monitor timeout:   {}s", self.monitor_timeout_secs),
            format!("Poll interval:     {}ms", self.poll_interval_ms),
            format!("Latency threshold: {}ms", self.latency_threshold_ms()),
            format!(
                "Results file:      {}{}",
                self.results_file.display(),
                if self.save_results { "" } else { " (disabled)" }
            ),
            format!("Key source:        {}", self.key.describe()),
        ]
        .join("\n")
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
