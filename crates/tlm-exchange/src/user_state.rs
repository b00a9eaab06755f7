//! Account state types for the read-only balance report.
//!
//! Endpoints: POST /info with `{"type": "clearinghouseState", "user": ..}` and
//! `{"type": "frontendOpenOrders", "user": ..}`. Numeric fields arrive as
//! strings and are kept that way; helpers parse them on demand.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Margin summary from clearinghouseState.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MarginSummary {
    /// Account value in USD.
    #[serde(rename = "accountValue")]
    pub account_value: String,
    /// Total notional position value.
    #[serde(rename = "totalNtlPos")]
    pub total_notional_position: String,
    /// Total raw USD.
    #[serde(rename = "totalRawUsd")]
    pub total_raw_usd: String,
    /// Total margin used.
    #[serde(rename = "totalMarginUsed")]
    pub total_margin_used: String,
}

impl MarginSummary {
    pub fn account_value_decimal(&self) -> Result<Decimal, rust_decimal::Error> {
        self.account_value.parse()
    }
}

/// clearinghouseState response.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClearinghouseState {
    #[serde(rename = "marginSummary")]
    pub margin_summary: Option<MarginSummary>,
    #[serde(rename = "crossMarginSummary")]
    pub cross_margin_summary: Option<MarginSummary>,
    #[serde(rename = "crossMaintenanceMarginUsed")]
    pub cross_maintenance_margin_used: Option<String>,
    /// Withdrawable balance.
    pub withdrawable: Option<String>,
    #[serde(rename = "assetPositions", default)]
    pub asset_positions: Vec<AssetPositionEntry>,
    /// Timestamp in milliseconds.
    pub time: Option<u64>,
}

impl ClearinghouseState {
    /// Positions with a non-zero size.
    pub fn open_positions(&self) -> impl Iterator<Item = &PositionData> {
        self.asset_positions
            .iter()
            .map(|entry| &entry.position)
            .filter(|position| !position.is_flat())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssetPositionEntry {
    pub position: PositionData,
    /// "oneWay" or "twoWay".
    #[serde(rename = "type")]
    pub position_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PositionData {
    pub coin: String,
    /// Signed size: positive = long, negative = short.
    pub szi: String,
    #[serde(rename = "entryPx")]
    pub entry_px: Option<String>,
    #[serde(rename = "positionValue")]
    pub position_value: Option<String>,
    #[serde(rename = "unrealizedPnl")]
    pub unrealized_pnl: Option<String>,
    #[serde(rename = "liquidationPx")]
    pub liquidation_px: Option<String>,
    #[serde(rename = "marginUsed")]
    pub margin_used: Option<String>,
}

impl PositionData {
    pub fn size_decimal(&self) -> Result<Decimal, rust_decimal::Error> {
        self.szi.parse()
    }

    /// Zero or unparseable size.
    pub fn is_flat(&self) -> bool {
        self.size_decimal().map(|sz| sz.is_zero()).unwrap_or(true)
    }

    pub fn direction(&self) -> &'static str {
        match self.size_decimal() {
            Ok(sz) if sz > Decimal::ZERO => "long",
            Ok(sz) if sz < Decimal::ZERO => "short",
            _ => "flat",
        }
    }
}

/// Entry of the frontendOpenOrders response.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OpenOrder {
    pub coin: String,
    /// "B" or "A".
    pub side: String,
    #[serde(rename = "limitPx")]
    pub limit_px: String,
    pub sz: String,
    pub oid: u64,
    pub timestamp: u64,
    #[serde(rename = "origSz", default)]
    pub orig_sz: Option<String>,
    #[serde(rename = "orderType", default)]
    pub order_type: Option<String>,
    #[serde(rename = "reduceOnly", default)]
    pub reduce_only: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_clearinghouse_state() {
        let json = r#"{
            "marginSummary": {
                "accountValue": "1000.50",
                "totalNtlPos": "150.0",
                "totalRawUsd": "850.5",
                "totalMarginUsed": "15.0"
            },
            "withdrawable": "985.5",
            "assetPositions": [
                {"type": "oneWay", "position": {"coin": "SOL", "szi": "-0.1", "entryPx": "150.0"}},
                {"type": "oneWay", "position": {"coin": "ETH", "szi": "0.0"}}
            ],
            "time": 1700000000000
        }"#;

        let state: ClearinghouseState = serde_json::from_str(json).unwrap();
        assert_eq!(
            state.margin_summary.as_ref().unwrap().account_value_decimal().unwrap(),
            dec!(1000.50)
        );
        assert!(state.cross_margin_summary.is_none());
        assert_eq!(state.withdrawable.as_deref(), Some("985.5"));

        let open: Vec<_> = state.open_positions().collect();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].coin, "SOL");
        assert_eq!(open[0].direction(), "short");
    }

    #[test]
    fn test_parse_open_orders() {
        let json = r#"[{
            "coin": "SOL", "side": "B", "limitPx": "120.5", "sz": "0.1",
            "oid": 77738308, "timestamp": 1700000000000, "origSz": "0.1",
            "orderType": "Limit", "reduceOnly": false
        }]"#;

        let orders: Vec<OpenOrder> = serde_json::from_str(json).unwrap();
        assert_eq!(orders[0].oid, 77738308);
        assert_eq!(orders[0].order_type.as_deref(), Some("Limit"));
    }
}
