//! Read-only account report.
//!
//! Fetches clearinghouse state and open orders for the monitored address,
//! renders them for the terminal and snapshots them next to the results file.

use std::fmt::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tlm_core::{Network, TargetIdentifier};
use tlm_exchange::{ClearinghouseState, InfoClient, MarginSummary, OpenOrder};
use tlm_persistence::write_json_atomic;
use tracing::info;

use crate::error::MonitorResult;

/// Account snapshot for one address.
#[derive(Debug, Clone, Serialize)]
pub struct BalanceReport {
    pub network: Network,
    pub address: TargetIdentifier,
    pub fetched_at: DateTime<Utc>,
    pub state: ClearinghouseState,
    pub open_orders: Vec<OpenOrder>,
}

impl BalanceReport {
    pub async fn fetch(
        info: &InfoClient,
        network: Network,
        address: &TargetIdentifier,
    ) -> MonitorResult<Self> {
        let state = info.fetch_clearinghouse_state(address.as_str()).await?;
        let open_orders = info.fetch_open_orders(address.as_str()).await?;
        info!(
            address = %address,
            open_orders = open_orders.len(),
            "Fetched account state"
        );

        Ok(Self {
            network,
            address: address.clone(),
            fetched_at: Utc::now(),
            state,
            open_orders,
        })
    }

    /// `balance_report_<network>.json` in the results file's directory.
    pub fn snapshot_path(results_file: &Path, network: Network) -> PathBuf {
        let name = format!("balance_report_{network}.json");
        match results_file.parent() {
            Some(dir) => dir.join(name),
            None => PathBuf::from(name),
        }
    }

    pub fn save(&self, path: &Path) -> MonitorResult<()> {
        write_json_atomic(path, self)?;
        info!(path = %path.display(), "Balance snapshot saved");
        Ok(())
    }

    pub fn render(&self) -> String {
        let mut out = String::new();

        let _ = writeln!(out, "Account {} on {}", self.address, self.network);
        let _ = writeln!(
            out,
            "As of {}",
            self.fetched_at.format("%Y-%m-%d %H:%M:%S UTC")
        );

        render_margin(&mut out, "Margin summary", self.state.margin_summary.as_ref());
        render_margin(
            &mut out,
            "Cross margin summary",
            self.state.cross_margin_summary.as_ref(),
        );
        if let Some(used) = &self.state.cross_maintenance_margin_used {
            let _ = writeln!(out, "Cross maintenance margin used: {used}");
        }
        let _ = writeln!(
            out,
            "Withdrawable: {}",
            self.state.withdrawable.as_deref().unwrap_or("n/a")
        );

        let positions: Vec<_> = self.state.open_positions().collect();
        let _ = writeln!(out, "\nPositions ({})", positions.len());
        for p in positions {
            let _ = writeln!(
                out,
                "  {:<8} {:<5} size={} entry={} value={} upnl={} liq={}",
                p.coin,
                p.direction(),
                p.szi,
                p.entry_px.as_deref().unwrap_or("-"),
                p.position_value.as_deref().unwrap_or("-"),
                p.unrealized_pnl.as_deref().unwrap_or("-"),
                p.liquidation_px.as_deref().unwrap_or("-"),
            );
        }

        let _ = writeln!(out, "\nOpen orders ({})", self.open_orders.len());
        for o in &self.open_orders {
            let side = if o.side == "B" { "buy" } else { "sell" };
            let _ = writeln!(
                out,
                "  {:<8} {:<4} {} @ {} oid={}{}",
                o.coin,
                side,
                o.sz,
                o.limit_px,
                o.oid,
                if o.reduce_only { " reduce-only" } else { "" },
            );
        }
        out
    }
}

fn render_margin(out: &mut String, title: &str, summary: Option<&MarginSummary>) {
    let _ = writeln!(out, "\n{title}");
    match summary {
        Some(m) => {
            let _ = writeln!(out, "  Account value:  {}", m.account_value);
            let _ = writeln!(out, "  Notional pos:   {}", m.total_notional_position);
            let _ = writeln!(out, "  Raw USD:        {}", m.total_raw_usd);
            let _ = writeln!(out, "  Margin used:    {}", m.total_margin_used);
        }
        None => {
            let _ = writeln!(out, "  n/a");
        }
    }
}
