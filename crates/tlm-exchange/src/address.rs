//! Target identifier derivation from a trading credential.
//!
//! The wallet address of the trading key is what the node writes into its
//! transaction log, so it is the identifier the observer searches for.
//! Derivation is pure and deterministic: the same key always yields the same
//! lowercase `0x`-prefixed address.

use alloy::signers::local::PrivateKeySigner;
use tlm_core::TargetIdentifier;
use zeroize::Zeroizing;

use crate::signer::KeyError;

/// Hex length of a secp256k1 private key without `0x`.
pub const PRIVATE_KEY_HEX_LEN: usize = 64;

/// Validate and decode a hex private key.
///
/// Accepts an optional `0x` prefix and surrounding whitespace. Configuration
/// is validated before the run starts, but malformed material is rejected
/// here again rather than producing a garbage identifier.
///
/// Error messages never contain key material.
pub fn parse_private_key(raw: &str) -> Result<Zeroizing<Vec<u8>>, KeyError> {
    let trimmed = raw.trim();
    let hex_part = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if hex_part.len() != PRIVATE_KEY_HEX_LEN {
        return Err(KeyError::InvalidLength {
            expected: PRIVATE_KEY_HEX_LEN,
            actual: hex_part.len(),
        });
    }
    if !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(KeyError::NotHex);
    }

    Ok(Zeroizing::new(hex::decode(hex_part)?))
}

/// Lowercase address of a signer as a target identifier.
pub fn target_of(signer: &PrivateKeySigner) -> TargetIdentifier {
    let address = format!("0x{}", hex::encode(signer.address().as_slice()));
    TargetIdentifier::new(address).expect("hex address is never empty")
}

/// Derive the target identifier directly from raw hex key material.
///
/// # Errors
/// Returns `KeyError` if the material is not a well-formed, valid secp256k1 key.
pub fn derive_target(raw: &str) -> Result<TargetIdentifier, KeyError> {
    let secret = parse_private_key(raw)?;
    let signer =
        PrivateKeySigner::from_slice(&secret).map_err(|e| KeyError::InvalidKey(e.to_string()))?;
    Ok(target_of(&signer))
}
