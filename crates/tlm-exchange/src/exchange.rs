//! Exchange client trait for order submission.
//!
//! The dispatcher only needs one capability from the exchange: place a market
//! order and hand back the raw response body. Keeping it behind a trait lets
//! the coordinator be driven by `MockExchange` in tests.

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;

use crate::error::{ExchangeError, ExchangeResult};

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Parameters of a single market order.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketOrderRequest {
    pub symbol: String,
    pub is_buy: bool,
    pub size: Decimal,
    /// Explicit limit price. When `None` the client derives one from the mid
    /// price and `slippage`.
    pub limit_px: Option<Decimal>,
    /// Fractional slippage, e.g. 0.1 for 10%.
    pub slippage: Decimal,
}

/// Trait for placing orders on an exchange.
pub trait ExchangeClient: Send + Sync {
    /// Submit a market order and return the unparsed response body.
    fn market_open(&self, order: MarketOrderRequest)
        -> BoxFuture<'_, ExchangeResult<serde_json::Value>>;
}

/// Arc wrapper for ExchangeClient trait objects.
pub type DynExchangeClient = Arc<dyn ExchangeClient>;

/// Configured reply of [`MockExchange`].
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Return this body.
    Json(serde_json::Value),
    /// Fail with a transport error carrying this message.
    Transport(String),
}

type SubmitHook = Box<dyn Fn(&MarketOrderRequest) + Send + Sync>;

/// Mock exchange for testing.
pub struct MockExchange {
    /// Recorded requests for verification.
    requests: parking_lot::Mutex<Vec<MarketOrderRequest>>,
    /// Reply to every request.
    response: parking_lot::Mutex<MockResponse>,
    /// Simulated round trip.
    latency: parking_lot::Mutex<Option<Duration>>,
    /// Called when a request arrives, before the simulated round trip.
    on_submit: parking_lot::Mutex<Option<SubmitHook>>,
}

impl fmt::Debug for MockExchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockExchange")
            .field("requests", &self.requests.lock().len())
            .field("response", &*self.response.lock())
            .field("latency", &*self.latency.lock())
            .finish_non_exhaustive()
    }
}

impl Default for MockExchange {
    fn default() -> Self {
        Self::new()
    }
}

impl MockExchange {
    /// Create a mock that answers with a filled order.
    pub fn new() -> Self {
        Self::with_response(MockResponse::Json(serde_json::json!({
            "status": "ok",
            "response": {
                "type": "order",
                "data": {
                    "statuses": [{"filled": {"totalSz": "0.1", "avgPx": "150.0", "oid": 1}}]
                }
            }
        })))
    }

    pub fn with_response(response: MockResponse) -> Self {
        Self {
            requests: parking_lot::Mutex::new(Vec::new()),
            response: parking_lot::Mutex::new(response),
            latency: parking_lot::Mutex::new(None),
            on_submit: parking_lot::Mutex::new(None),
        }
    }

    /// Set the reply to return.
    pub fn set_response(&self, response: MockResponse) {
        *self.response.lock() = response;
    }

    /// Delay every reply by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = Some(latency);
    }

    /// Run `hook` whenever a request arrives.
    pub fn on_submit<F>(&self, hook: F)
    where
        F: Fn(&MarketOrderRequest) + Send + Sync + 'static,
    {
        *self.on_submit.lock() = Some(Box::new(hook));
    }

    /// Get recorded requests.
    pub fn requests(&self) -> Vec<MarketOrderRequest> {
        self.requests.lock().clone()
    }
}

impl ExchangeClient for MockExchange {
    fn market_open(
        &self,
        order: MarketOrderRequest,
    ) -> BoxFuture<'_, ExchangeResult<serde_json::Value>> {
        Box::pin(async move {
            let latency = {
                let hook = self.on_submit.lock();
                if let Some(hook) = hook.as_ref() {
                    hook(&order);
                }
                self.requests.lock().push(order);
                *self.latency.lock()
            };
            if let Some(latency) = latency {
                tokio::time::sleep(latency).await;
            }

            let response = self.response.lock().clone();
            match response {
                MockResponse::Json(body) => Ok(body),
                MockResponse::Transport(message) => Err(ExchangeError::Transport(message)),
            }
        })
    }
}
