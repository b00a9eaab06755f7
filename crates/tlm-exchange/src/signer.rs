//! Key loading and L1 action signing.
//!
//! Orders are authenticated in two stages:
//! 1. `action_hash` = keccak256(msgpack(action) || nonce || vault tag)
//! 2. EIP-712 signature over a phantom `Agent { source, connectionId }`
//!
//! The byte layout must match the exchange's reference SDK exactly, otherwise
//! the recovered signer differs and the order is refused.

use std::path::PathBuf;
use std::sync::Arc;

use alloy::primitives::{keccak256, Address, PrimitiveSignature, B256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer as AlloySigner;
use alloy::sol;
use alloy::sol_types::eip712_domain;
use alloy::sol_types::SolStruct;
use serde::Serialize;
use thiserror::Error;
use tlm_core::TargetIdentifier;

use crate::address::{parse_private_key, target_of};

// =============================================================================
// KeySource and KeyManager
// =============================================================================

/// Source of the private key.
#[derive(Debug, Clone)]
pub enum KeySource {
    /// Load from environment variable (development).
    EnvVar { var_name: String },
    /// Load from file (production, recommend 0600 permissions).
    File { path: PathBuf },
}

/// Holds the trading key and the identity derived from it.
///
/// Never log private key material.
pub struct KeyManager {
    signer: PrivateKeySigner,
    target: TargetIdentifier,
}

impl KeyManager {
    /// Load the trading key from the given source.
    ///
    /// # Errors
    /// Returns `KeyError` if the source cannot be read or the key is malformed.
    pub fn load(source: &KeySource) -> Result<Self, KeyError> {
        match source {
            KeySource::EnvVar { var_name } => {
                let hex = std::env::var(var_name)
                    .map_err(|_| KeyError::EnvVarNotFound(var_name.clone()))?;
                Self::from_hex(&hex)
            }
            KeySource::File { path } => {
                let content = zeroize::Zeroizing::new(std::fs::read_to_string(path)?);
                Self::from_hex(&content)
            }
        }
    }

    /// Build from hex key material (`0x` prefix optional).
    pub fn from_hex(hex_key: &str) -> Result<Self, KeyError> {
        let secret = parse_private_key(hex_key)?;
        let signer = PrivateKeySigner::from_slice(&secret)
            .map_err(|e| KeyError::InvalidKey(e.to_string()))?;
        let target = target_of(&signer);
        Ok(Self { signer, target })
    }

    pub fn signer(&self) -> &PrivateKeySigner {
        &self.signer
    }

    /// Lowercase wallet address, the identifier the node writes to disk.
    pub fn target(&self) -> &TargetIdentifier {
        &self.target
    }
}

/// Key management errors.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Private key must be {expected} hex characters, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Private key is not valid hex")]
    NotHex,

    #[error("Failed to decode hex: {0}")]
    HexDecode(#[from] hex::FromHexError),

    #[error("Invalid private key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Wire Format Types
// =============================================================================

/// L1 order action.
///
/// IMPORTANT: field order and `skip_serializing_if` drive the msgpack bytes
/// and therefore the action hash. The SDK omits missing keys entirely.
#[derive(Debug, Clone, Serialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub action_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub orders: Option<Vec<OrderWire>>,

    /// "na" for standalone orders.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grouping: Option<String>,
}

impl Action {
    /// Single standalone order.
    pub fn single_order(order: OrderWire) -> Self {
        Self {
            action_type: "order".to_string(),
            orders: Some(vec![order]),
            grouping: Some("na".to_string()),
        }
    }
}

/// Order wire format.
#[derive(Debug, Clone, Serialize)]
pub struct OrderWire {
    #[serde(rename = "a")]
    pub asset: u32,

    #[serde(rename = "b")]
    pub is_buy: bool,

    /// Limit price as string
    #[serde(rename = "p")]
    pub limit_px: String,

    /// Size as string
    #[serde(rename = "s")]
    pub sz: String,

    #[serde(rename = "r")]
    pub reduce_only: bool,

    #[serde(rename = "t")]
    pub order_type: OrderTypeWire,

    #[serde(rename = "c", skip_serializing_if = "Option::is_none")]
    pub cloid: Option<String>,
}

/// Order type wire format: `{"limit": {"tif": "Ioc"}}`.
///
/// A market order is an aggressive IOC limit at the slippage price.
#[derive(Debug, Clone, Serialize)]
pub struct OrderTypeWire {
    pub limit: LimitOrderType,
}

impl OrderTypeWire {
    pub fn ioc() -> Self {
        Self {
            limit: LimitOrderType {
                tif: "Ioc".to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LimitOrderType {
    /// Time in force: "Gtc", "Ioc", "Alo"
    pub tif: String,
}

// =============================================================================
// SigningInput and action_hash
// =============================================================================

#[derive(Debug, Clone)]
pub struct SigningInput {
    pub action: Action,
    pub nonce: u64,
    /// None = normal trading, Some = vault trading
    pub vault_address: Option<Address>,
}

impl SigningInput {
    /// keccak256(msgpack(action) || nonce_be8 || vault_tag).
    ///
    /// The vault tag is `0x00` when absent and `0x01 || address` otherwise.
    pub fn action_hash(&self) -> Result<B256, SignerError> {
        let mut data = rmp_serde::to_vec_named(&self.action)
            .map_err(|e| SignerError::SerializationFailed(e.to_string()))?;

        data.extend_from_slice(&self.nonce.to_be_bytes());

        match &self.vault_address {
            None => data.push(0x00),
            Some(addr) => {
                data.push(0x01);
                data.extend_from_slice(addr.as_slice());
            }
        }

        Ok(keccak256(&data))
    }
}

// =============================================================================
// PhantomAgent and EIP-712 Signing
// =============================================================================

pub const EIP712_DOMAIN_NAME: &str = "Exchange";
pub const EIP712_DOMAIN_VERSION: &str = "1";
pub const EIP712_CHAIN_ID: u64 = 1337;
pub const EIP712_VERIFYING_CONTRACT: Address = Address::ZERO;

sol! {
    #[derive(Debug)]
    struct Agent {
        string source;
        bytes32 connectionId;
    }
}

/// EIP-712 signing target.
#[derive(Debug, Clone)]
pub struct PhantomAgent {
    /// "a" (mainnet) or "b" (testnet)
    pub source: String,
    pub connection_id: B256,
}

impl PhantomAgent {
    pub fn new(action_hash: B256, is_mainnet: bool) -> Self {
        Self {
            source: if is_mainnet { "a" } else { "b" }.to_string(),
            connection_id: action_hash,
        }
    }

    pub async fn sign<S: AlloySigner + Send + Sync>(
        &self,
        signer: &S,
    ) -> Result<PrimitiveSignature, alloy::signers::Error> {
        let domain = eip712_domain! {
            name: EIP712_DOMAIN_NAME,
            version: EIP712_DOMAIN_VERSION,
            chain_id: EIP712_CHAIN_ID,
            verifying_contract: EIP712_VERIFYING_CONTRACT,
        };

        let agent = Agent {
            source: self.source.clone(),
            connectionId: self.connection_id,
        };

        signer.sign_hash(&agent.eip712_signing_hash(&domain)).await
    }
}

// =============================================================================
// Signer
// =============================================================================

#[derive(Debug, Error)]
pub enum SignerError {
    #[error("Signing failed: {0}")]
    SigningFailed(#[from] alloy::signers::Error),

    #[error("Action serialization failed: {0}")]
    SerializationFailed(String),
}

/// Signature in the JSON shape the exchange expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignaturePayload {
    /// 0x-prefixed hex
    pub r: String,
    /// 0x-prefixed hex
    pub s: String,
    /// 27 or 28
    pub v: u8,
}

impl From<&PrimitiveSignature> for SignaturePayload {
    fn from(sig: &PrimitiveSignature) -> Self {
        Self {
            r: format!("0x{}", hex::encode(sig.r().to_be_bytes::<32>())),
            s: format!("0x{}", hex::encode(sig.s().to_be_bytes::<32>())),
            v: 27 + u8::from(sig.v()),
        }
    }
}

/// Signs L1 actions with the trading key.
pub struct Signer {
    key_manager: Arc<KeyManager>,
    is_mainnet: bool,
}

impl Signer {
    pub fn new(key_manager: Arc<KeyManager>, is_mainnet: bool) -> Self {
        Self {
            key_manager,
            is_mainnet,
        }
    }

    pub async fn sign_action(&self, input: &SigningInput) -> Result<SignaturePayload, SignerError> {
        let action_hash = input.action_hash()?;
        let phantom_agent = PhantomAgent::new(action_hash, self.is_mainnet);
        // NOTE: never log the signature
        let signature = phantom_agent.sign(self.key_manager.signer()).await?;
        Ok(SignaturePayload::from(&signature))
    }

    pub fn is_mainnet(&self) -> bool {
        self.is_mainnet
    }

    pub fn target(&self) -> &TargetIdentifier {
        self.key_manager.target()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // Well-known development key (DO NOT use in production)
    const TEST_PRIVATE_KEY: &str =
        "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn sample_order(cloid: Option<&str>) -> OrderWire {
        OrderWire {
            asset: 110027,
            is_buy: true,
            limit_px: "105.00".to_string(),
            sz: "0.2".to_string(),
            reduce_only: false,
            order_type: OrderTypeWire::ioc(),
            cloid: cloid.map(str::to_string),
        }
    }

    #[test]
    fn test_key_manager_from_hex() {
        let manager = KeyManager::from_hex(TEST_PRIVATE_KEY).unwrap();
        assert_eq!(
            manager.target().as_str(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }

    #[test]
    fn test_key_manager_missing_env_var() {
        let source = KeySource::EnvVar {
            var_name: "TLM_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
        };
        assert!(matches!(
            KeyManager::load(&source),
            Err(KeyError::EnvVarNotFound(_))
        ));
    }

    #[test]
    fn test_order_type_wire_serialization() {
        let json = serde_json::to_string(&OrderTypeWire::ioc()).unwrap();
        assert_eq!(json, r#"{"limit":{"tif":"Ioc"}}"#);
    }

    #[test]
    fn test_single_order_action_json() {
        let action = Action::single_order(sample_order(None));
        let json = serde_json::to_string(&action).unwrap();
        assert!(json.starts_with(r#"{"type":"order","orders":[{"a":110027,"b":true"#));
        assert!(json.ends_with(r#""grouping":"na"}"#));
        assert!(!json.contains(r#""c""#));
    }

    /// Msgpack bytes and action hash must match the reference SDK exactly.
    #[test]
    fn test_msgpack_matches_reference_sdk() {
        let action = Action::single_order(sample_order(Some(
            "0x0de3e244a8f44fc28a6b7bc852d66d19",
        )));

        let msgpack_bytes = rmp_serde::to_vec_named(&action).unwrap();
        let expected = "83a474797065a56f72646572a66f72646572739187a161ce0001adcba162c3a170a63130352e3030a173a3302e32a172c2a17481a56c696d697481a3746966a3496f63a163d92230783064653365323434613866343466633238613662376263383532643636643139a867726f7570696e67a26e61";
        assert_eq!(hex::encode(&msgpack_bytes), expected);

        let input = SigningInput {
            action,
            nonce: 1769339470576,
            vault_address: None,
        };
        assert_eq!(
            hex::encode(input.action_hash().unwrap().as_slice()),
            "904c57b8f4b75ac9da005b49298dc39af735ed8c3a89b241f5f1e061e0207868"
        );
    }

    #[test]
    fn test_action_hash_depends_on_vault() {
        let action = Action::single_order(sample_order(None));
        let with_vault = SigningInput {
            action: action.clone(),
            nonce: 1000,
            vault_address: Some(Address::repeat_byte(0x42)),
        };
        let without_vault = SigningInput {
            action,
            nonce: 1000,
            vault_address: None,
        };
        assert_ne!(
            with_vault.action_hash().unwrap(),
            without_vault.action_hash().unwrap()
        );
    }

    #[test]
    fn test_phantom_agent_source() {
        let hash = B256::repeat_byte(0xab);
        assert_eq!(PhantomAgent::new(hash, true).source, "a");
        assert_eq!(PhantomAgent::new(hash, false).source, "b");
    }

    /// RFC 6979 signatures are deterministic, so the reference SDK's output
    /// for the same key and hash must be reproduced byte for byte.
    #[tokio::test]
    async fn test_signature_matches_reference_sdk() {
        let manager = KeyManager::from_hex(TEST_PRIVATE_KEY).unwrap();
        let action_hash = B256::from_slice(
            &hex::decode("f01fa6eaca0b8cbd2afe65f8852a2e00d35eae3d19560ece9b8a28614646e849")
                .unwrap(),
        );

        let signature = PhantomAgent::new(action_hash, false)
            .sign(manager.signer())
            .await
            .unwrap();
        let payload = SignaturePayload::from(&signature);

        assert_eq!(
            payload.r,
            "0xa9e728f2faea4febc0b6eb9c3dbbac04b375eb3869f051030d205318425faebc"
        );
        assert_eq!(
            payload.s,
            "0x7b21be7030bb979352b71494708b99d789266f0d0e1242a21e74905b683e4698"
        );
        assert_eq!(payload.v, 27);
    }

    #[tokio::test]
    async fn test_signer_sign_action() {
        let manager = Arc::new(KeyManager::from_hex(TEST_PRIVATE_KEY).unwrap());
        let signer = Signer::new(manager, true);
        assert!(signer.is_mainnet());

        let input = SigningInput {
            action: Action::single_order(sample_order(None)),
            nonce: 1234567890,
            vault_address: None,
        };
        let payload = signer.sign_action(&input).await.unwrap();

        assert_eq!(payload.r.len(), 66);
        assert!(payload.s.starts_with("0x"));
        assert!(payload.v == 27 || payload.v == 28);
    }
}
