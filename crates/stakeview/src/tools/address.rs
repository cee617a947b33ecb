//! Bech32 address encode/decode and the conversions the client needs.

use bech32::{Bech32, Hrp};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Amino prefix of an ed25519 consensus public key.
const AMINO_ED25519_PREFIX: [u8; 5] = [0x16, 0x24, 0xde, 0x64, 0x20];
/// Consensus addresses are the first 20 bytes of sha256(pubkey).
const CONSENSUS_ADDRESS_LEN: usize = 20;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("decode {address:?}: {reason}")]
    Decode { address: String, reason: String },
    #[error("encode with prefix {prefix:?}: {reason}")]
    Encode { prefix: String, reason: String },
    #[error("address {address:?} does not use prefix {expected:?}")]
    WrongPrefix { address: String, expected: String },
}

/// Decode a bech32 string into (human-readable prefix, payload bytes).
pub fn decode(address: &str) -> Result<(String, Vec<u8>), AddressError> {
    let (hrp, data) = bech32::decode(address.trim()).map_err(|e| AddressError::Decode {
        address: address.to_string(),
        reason: e.to_string(),
    })?;
    Ok((hrp.to_string(), data))
}

/// Encode payload bytes as bech32 with the given prefix.
pub fn encode(prefix: &str, data: &[u8]) -> Result<String, AddressError> {
    let err = |reason: String| AddressError::Encode {
        prefix: prefix.to_string(),
        reason,
    };
    let hrp = Hrp::parse(prefix).map_err(|e| err(e.to_string()))?;
    bech32::encode::<Bech32>(hrp, data).map_err(|e| err(e.to_string()))
}

/// Fails unless `address` is valid bech32 carrying exactly `prefix`.
pub fn check_prefix(address: &str, prefix: &str) -> Result<(), AddressError> {
    let (hrp, _) = decode(address)?;
    if hrp != prefix {
        return Err(AddressError::WrongPrefix {
            address: address.to_string(),
            expected: prefix.to_string(),
        });
    }
    Ok(())
}

/// Re-encode an operator (`<prefix>valoper…`) address as the operator's account address.
pub fn operator_to_account(operator_address: &str, account_prefix: &str) -> Result<String, AddressError> {
    let (_, data) = decode(operator_address)?;
    encode(account_prefix, &data)
}

/// Derive the consensus address (`<prefix>valcons…`) of a bech32 consensus pubkey
/// (`<prefix>valconspub…`).
pub fn pubkey_to_consensus_address(consensus_pubkey: &str) -> Result<String, AddressError> {
    let (hrp, data) = decode(consensus_pubkey)?;
    let key = data.strip_prefix(&AMINO_ED25519_PREFIX[..]).unwrap_or(&data);
    let digest = Sha256::digest(key);
    let prefix = hrp.strip_suffix("pub").unwrap_or(&hrp);
    encode(prefix, &digest[..CONSENSUS_ADDRESS_LEN])
}
