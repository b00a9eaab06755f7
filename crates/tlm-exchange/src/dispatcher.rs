//! Order dispatch with send-time capture.
//!
//! `OrderDispatcher::submit` never fails: transport errors degrade to a
//! `Fallback` outcome so the observation side of the run still resolves and
//! produces a report.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tlm_core::{OrderOutcome, TargetIdentifier};
use tracing::{error, info, warn};

use crate::exchange::{DynExchangeClient, MarketOrderRequest};
use crate::response::classify;

/// Places the measurement order and classifies the reply.
pub struct OrderDispatcher {
    client: DynExchangeClient,
    target: TargetIdentifier,
}

impl OrderDispatcher {
    pub fn new(client: DynExchangeClient, target: TargetIdentifier) -> Self {
        Self { client, target }
    }

    /// Submit a market order.
    ///
    /// The returned timestamp is taken immediately before the network call, so
    /// latency measured against it includes submission time.
    pub async fn submit(
        &self,
        symbol: &str,
        is_buy: bool,
        size: Decimal,
        slippage: Decimal,
    ) -> (OrderOutcome, DateTime<Utc>) {
        let request = MarketOrderRequest {
            symbol: symbol.to_string(),
            is_buy,
            size,
            limit_px: None,
            slippage,
        };

        info!(
            symbol = %symbol,
            side = if is_buy { "buy" } else { "sell" },
            size = %size,
            slippage = %slippage,
            "Sending market order"
        );

        let send_time = Utc::now();
        let outcome = match self.client.market_open(request).await {
            Ok(body) => classify(&body, &self.target),
            Err(e) => {
                error!(error = %e, "Order submission failed, continuing with fallback identifier");
                OrderOutcome::Fallback {
                    synthetic_id: self.target.fallback_token(),
                    cause: Some(e.to_string()),
                }
            }
        };

        match &outcome {
            OrderOutcome::Identifier { id } => info!(order_id = %id, "Order accepted"),
            OrderOutcome::Rejected { reason } => {
                error!(reason = %reason, "Order rejected");
                if reason.to_lowercase().contains("minimum value") {
                    warn!("Order value below exchange minimum, increase size");
                }
            }
            OrderOutcome::Fallback { synthetic_id, .. } => {
                warn!(identifier = %synthetic_id, "Using fallback identifier")
            }
        }

        (outcome, send_time)
    }
}
