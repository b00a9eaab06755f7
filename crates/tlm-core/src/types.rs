//! Identity, side and network types.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// TargetIdentifier
// ============================================================================

/// Case-normalized identifier searched for inside the node's files.
///
/// Derived once per run (typically the wallet address of the trading key)
/// and shared read-only between the foreground run and the watcher task.
/// The inner string is always lowercase so that matching can be done with a
/// plain substring test against lowercased file content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetIdentifier(String);

impl TargetIdentifier {
    /// Create a target identifier, normalizing to lowercase.
    ///
    /// # Errors
    /// Returns `CoreError::InvalidTarget` if the trimmed value is empty.
    pub fn new(value: impl AsRef<str>) -> Result<Self> {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            return Err(CoreError::InvalidTarget("identifier is empty".to_string()));
        }
        Ok(Self(trimmed.to_lowercase()))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive containment test against arbitrary text.
    pub fn is_contained_in(&self, content: &str) -> bool {
        content.to_lowercase().contains(&self.0)
    }

    /// Synthetic correlation token used when an exchange response cannot be
    /// classified: `addr_` plus the first 10 characters of the identifier.
    ///
    /// The `addr_` prefix keeps it visually distinct from exchange order IDs
    /// and transaction hashes.
    pub fn fallback_token(&self) -> String {
        let prefix: String = self.0.chars().take(10).collect();
        format!("addr_{prefix}")
    }
}

impl fmt::Display for TargetIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TargetIdentifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// OrderSide
// ============================================================================

/// Order side.
///
/// Serialized with the exchange's single-letter convention:
/// `B` (bid/buy) and `A` (ask/sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OrderSide {
    #[default]
    #[serde(rename = "B")]
    Buy,
    #[serde(rename = "A")]
    Sell,
}

impl OrderSide {
    #[inline]
    pub fn is_buy(&self) -> bool {
        matches!(self, Self::Buy)
    }

    /// Single-letter exchange code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Buy => "B",
            Self::Sell => "A",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

impl FromStr for OrderSide {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "b" | "buy" | "bid" => Ok(Self::Buy),
            "a" | "sell" | "ask" => Ok(Self::Sell),
            other => Err(CoreError::InvalidSide(other.to_string())),
        }
    }
}

// ============================================================================
// Network
// ============================================================================

/// Exchange network selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    #[default]
    Testnet,
}

impl Network {
    /// REST API base URL.
    pub fn api_url(&self) -> &'static str {
        match self {
            Self::Mainnet => "https://api.hyperliquid.xyz",
            Self::Testnet => "https://api.hyperliquid-testnet.xyz",
        }
    }

    #[inline]
    pub fn is_mainnet(&self) -> bool {
        matches!(self, Self::Mainnet)
    }

    /// Default alert threshold for observed latency (ms).
    ///
    /// Testnet nodes lag noticeably more than mainnet nodes.
    pub fn default_latency_threshold_ms(&self) -> u64 {
        match self {
            Self::Mainnet => 5_000,
            Self::Testnet => 10_000,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mainnet => write!(f, "mainnet"),
            Self::Testnet => write!(f, "testnet"),
        }
    }
}

impl FromStr for Network {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Self::Mainnet),
            "testnet" => Ok(Self::Testnet),
            other => Err(CoreError::InvalidNetwork(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_is_lowercased() {
        let target = TargetIdentifier::new("0xF39Fd6e51aad88F6F4ce6aB8827279cffFb92266").unwrap();
        assert_eq!(target.as_str(), "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266");
    }

    #[test]
    fn test_target_rejects_empty() {
        assert!(TargetIdentifier::new("   ").is_err());
    }

    #[test]
    fn test_target_matches_case_insensitively() {
        let target = TargetIdentifier::new("0xabcDEF").unwrap();
        assert!(target.is_contained_in(r#"{"user":"0xABCDEF","px":"1.0"}"#));
        assert!(!target.is_contained_in(r#"{"user":"0xabcdee"}"#));
    }

    #[test]
    fn test_fallback_token_prefix() {
        let target = TargetIdentifier::new("0xF39Fd6e51aad88F6F4ce6aB8827279cffFb92266").unwrap();
        assert_eq!(target.fallback_token(), "addr_0xf39fd6e5");
    }

    #[test]
    fn test_fallback_token_short_identifier() {
        let target = TargetIdentifier::new("0xab").unwrap();
        assert_eq!(target.fallback_token(), "addr_0xab");
    }

    #[test]
    fn test_side_parsing() {
        assert_eq!("B".parse::<OrderSide>().unwrap(), OrderSide::Buy);
        assert_eq!("sell".parse::<OrderSide>().unwrap(), OrderSide::Sell);
        assert_eq!(" a ".parse::<OrderSide>().unwrap(), OrderSide::Sell);
        assert!("X".parse::<OrderSide>().is_err());
    }

    #[test]
    fn test_side_serializes_as_code() {
        assert_eq!(serde_json::to_string(&OrderSide::Buy).unwrap(), r#""B""#);
        assert_eq!(serde_json::to_string(&OrderSide::Sell).unwrap(), r#""A""#);
    }

    #[test]
    fn test_network_urls_and_thresholds() {
        let mainnet: Network = "MAINNET".parse().unwrap();
        assert!(mainnet.is_mainnet());
        assert_eq!(mainnet.api_url(), "https://api.hyperliquid.xyz");
        assert_eq!(mainnet.default_latency_threshold_ms(), 5_000);

        let testnet = Network::default();
        assert!(!testnet.is_mainnet());
        assert_eq!(testnet.default_latency_threshold_ms(), 10_000);
        assert!("devnet".parse::<Network>().is_err());
    }
}
