//! Order submission for the trade latency monitor.
//!
//! # Key Components
//!
//! - [`OrderDispatcher`]: Sends the measurement order, captures the send time
//!   and classifies the reply into an `OrderOutcome`
//! - [`ExchangeClient`]: Transport seam; [`HyperliquidExchange`] for real
//!   runs, [`MockExchange`] for tests
//! - [`classify`]: Priority-ordered extraction rules over the raw response
//! - [`Signer`] / [`KeyManager`]: L1 action signing and key loading
//! - [`derive_target`]: Wallet address derivation for the observer
//! - [`InfoClient`]: Read-only metadata, mids and account state

pub mod address;
pub mod dispatcher;
pub mod error;
pub mod exchange;
pub mod hyperliquid;
pub mod info;
pub mod response;
pub mod signer;
pub mod user_state;

pub use address::{derive_target, parse_private_key, target_of, PRIVATE_KEY_HEX_LEN};
pub use dispatcher::OrderDispatcher;
pub use error::{ExchangeError, ExchangeResult};
pub use exchange::{
    BoxFuture, DynExchangeClient, ExchangeClient, MarketOrderRequest, MockExchange, MockResponse,
};
pub use hyperliquid::{build_order_action, slippage_price, HyperliquidExchange};
pub use info::{AssetInfo, AssetMeta, InfoClient, Meta};
pub use response::{classify, Extraction};
pub use signer::{
    Action, KeyError, KeyManager, KeySource, OrderTypeWire, OrderWire, PhantomAgent,
    SignaturePayload, Signer, SignerError, SigningInput,
};
pub use user_state::{ClearinghouseState, MarginSummary, OpenOrder, PositionData};
