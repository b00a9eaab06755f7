//! Read-only client for the exchange info endpoint.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::Client;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tlm_core::Network;
use tracing::{debug, info};

use crate::error::{ExchangeError, ExchangeResult};
use crate::user_state::{ClearinghouseState, OpenOrder};

/// Default timeout for API requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Request body for the info endpoint.
#[derive(Debug, Serialize)]
struct InfoRequest<'a> {
    #[serde(rename = "type")]
    request_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<&'a str>,
}

/// Perp metadata (`{"type": "meta"}`).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Meta {
    pub universe: Vec<AssetMeta>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssetMeta {
    pub name: String,
    #[serde(rename = "szDecimals")]
    pub sz_decimals: u32,
    #[serde(rename = "maxLeverage", default)]
    pub max_leverage: Option<u32>,
    #[serde(rename = "isDelisted", default)]
    pub is_delisted: bool,
}

/// Asset index and size precision of one coin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetInfo {
    pub index: u32,
    pub sz_decimals: u32,
}

impl Meta {
    /// Coin name to asset info. The asset index is the position in `universe`.
    pub fn asset_map(&self) -> HashMap<String, AssetInfo> {
        self.universe
            .iter()
            .enumerate()
            .map(|(index, asset)| {
                (
                    asset.name.clone(),
                    AssetInfo {
                        index: index as u32,
                        sz_decimals: asset.sz_decimals,
                    },
                )
            })
            .collect()
    }
}

/// Client for the `/info` endpoint.
#[derive(Debug, Clone)]
pub struct InfoClient {
    client: Client,
    info_url: String,
}

impl InfoClient {
    pub fn new(info_url: impl Into<String>) -> ExchangeResult<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| ExchangeError::Transport(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            info_url: info_url.into(),
        })
    }

    pub fn for_network(network: Network) -> ExchangeResult<Self> {
        Self::new(format!("{}/info", network.api_url()))
    }

    async fn post<T: DeserializeOwned>(&self, request: &InfoRequest<'_>) -> ExchangeResult<T> {
        debug!(url = %self.info_url, request_type = request.request_type, "POST info");

        let response = self
            .client
            .post(&self.info_url)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExchangeError::Http {
                status: status.as_u16(),
                body,
            });
        }

        response.json::<T>().await.map_err(|e| {
            ExchangeError::InvalidResponse(format!("Failed to parse {}: {e}", request.request_type))
        })
    }

    pub async fn fetch_meta(&self) -> ExchangeResult<Meta> {
        let meta: Meta = self
            .post(&InfoRequest {
                request_type: "meta",
                user: None,
            })
            .await?;
        info!(assets = meta.universe.len(), "Fetched perp metadata");
        Ok(meta)
    }

    /// Mid price of every coin.
    pub async fn fetch_all_mids(&self) -> ExchangeResult<HashMap<String, Decimal>> {
        let raw: HashMap<String, String> = self
            .post(&InfoRequest {
                request_type: "allMids",
                user: None,
            })
            .await?;

        // Spot and index entries may not parse; only perps matter here.
        Ok(raw
            .into_iter()
            .filter_map(|(coin, px)| px.parse::<Decimal>().ok().map(|px| (coin, px)))
            .collect())
    }

    pub async fn fetch_clearinghouse_state(&self, user: &str) -> ExchangeResult<ClearinghouseState> {
        let state: ClearinghouseState = self
            .post(&InfoRequest {
                request_type: "clearinghouseState",
                user: Some(user),
            })
            .await?;
        info!(
            positions = state.asset_positions.len(),
            "Fetched clearinghouseState"
        );
        Ok(state)
    }

    pub async fn fetch_open_orders(&self, user: &str) -> ExchangeResult<Vec<OpenOrder>> {
        self.post(&InfoRequest {
            request_type: "frontendOpenOrders",
            user: Some(user),
        })
        .await
    }
}
