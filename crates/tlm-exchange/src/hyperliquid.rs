//! Hyperliquid REST exchange client.
//!
//! A market order is sent as an aggressive IOC limit order priced at
//! `mid * (1 ± slippage)`, signed with the L1 action scheme and POSTed to
//! `/exchange`. The raw JSON reply is returned for classification.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Serialize;
use tlm_core::{format_decimal, round_price, round_size, Network};
use tracing::{debug, info};

use crate::error::{ExchangeError, ExchangeResult};
use crate::exchange::{BoxFuture, ExchangeClient, MarketOrderRequest};
use crate::info::{AssetInfo, InfoClient, DEFAULT_TIMEOUT};
use crate::signer::{
    Action, KeyManager, OrderTypeWire, OrderWire, SignaturePayload, Signer, SigningInput,
};

/// Body of a POST to `/exchange`.
#[derive(Debug, Serialize)]
struct ExchangeRequest<'a> {
    action: &'a Action,
    nonce: u64,
    signature: SignaturePayload,
}

/// Aggressive limit price for a market order.
///
/// Buys pay up to `mid * (1 + slippage)`, sells accept down to
/// `mid * (1 - slippage)`, rounded to the exchange's price precision.
pub fn slippage_price(mid: Decimal, is_buy: bool, slippage: Decimal, sz_decimals: u32) -> Decimal {
    let px = if is_buy {
        mid * (Decimal::ONE + slippage)
    } else {
        mid * (Decimal::ONE - slippage)
    };
    round_price(px, sz_decimals)
}

/// Build the signed-action payload for one IOC order.
pub fn build_order_action(asset: AssetInfo, is_buy: bool, size: Decimal, limit_px: Decimal) -> Action {
    Action::single_order(OrderWire {
        asset: asset.index,
        is_buy,
        limit_px: format_decimal(round_price(limit_px, asset.sz_decimals)),
        sz: format_decimal(round_size(size, asset.sz_decimals)),
        reduce_only: false,
        order_type: OrderTypeWire::ioc(),
        cloid: None,
    })
}

/// Exchange client backed by the Hyperliquid REST API.
pub struct HyperliquidExchange {
    http: Client,
    exchange_url: String,
    info: InfoClient,
    signer: Signer,
    assets: HashMap<String, AssetInfo>,
}

impl HyperliquidExchange {
    /// Connect to `network` and load perp metadata.
    pub async fn connect(network: Network, key_manager: Arc<KeyManager>) -> ExchangeResult<Self> {
        let http = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| ExchangeError::Transport(format!("Failed to create HTTP client: {e}")))?;
        let info = InfoClient::for_network(network)?;
        let assets = info.fetch_meta().await?.asset_map();

        info!(
            network = %network,
            address = %key_manager.target(),
            assets = assets.len(),
            "Connected to exchange"
        );

        Ok(Self {
            http,
            exchange_url: format!("{}/exchange", network.api_url()),
            info,
            signer: Signer::new(key_manager, network.is_mainnet()),
            assets,
        })
    }

    pub fn asset(&self, symbol: &str) -> ExchangeResult<AssetInfo> {
        self.assets
            .get(symbol)
            .copied()
            .ok_or_else(|| ExchangeError::UnknownAsset(symbol.to_string()))
    }

    async fn limit_price(&self, order: &MarketOrderRequest, asset: AssetInfo) -> ExchangeResult<Decimal> {
        if let Some(px) = order.limit_px {
            return Ok(px);
        }
        let mids = self.info.fetch_all_mids().await?;
        let mid = mids
            .get(&order.symbol)
            .copied()
            .ok_or_else(|| ExchangeError::NoMidPrice(order.symbol.clone()))?;
        Ok(slippage_price(mid, order.is_buy, order.slippage, asset.sz_decimals))
    }

    async fn place(&self, order: MarketOrderRequest) -> ExchangeResult<serde_json::Value> {
        let asset = self.asset(&order.symbol)?;
        let limit_px = self.limit_price(&order, asset).await?;
        let action = build_order_action(asset, order.is_buy, order.size, limit_px);

        let nonce = Utc::now().timestamp_millis() as u64;
        let input = SigningInput {
            action,
            nonce,
            vault_address: None,
        };
        let signature = self.signer.sign_action(&input).await?;

        let body = ExchangeRequest {
            action: &input.action,
            nonce,
            signature,
        };

        debug!(asset = asset.index, limit_px = %limit_px, nonce, "POST exchange");

        let response = self.http.post(&self.exchange_url).json(&body).send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ExchangeError::Http {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(serde_json::from_str(&text)?)
    }
}

impl ExchangeClient for HyperliquidExchange {
    fn market_open(
        &self,
        order: MarketOrderRequest,
    ) -> BoxFuture<'_, ExchangeResult<serde_json::Value>> {
        Box::pin(self.place(order))
    }
}
