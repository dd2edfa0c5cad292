use std::fmt;

use serde::Serialize;

use crate::error::AuthError;

/// Shortest printable form of a base58-encoded 32-byte public key.
pub const MIN_ADDRESS_LEN: usize = 32;
/// Longest printable form of a base58-encoded 32-byte public key.
pub const MAX_ADDRESS_LEN: usize = 44;

/// The Bitcoin base58 alphabet: no `0`, `O`, `I` or `l`.
const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// A syntactically valid wallet address.
///
/// Constructed only through [`WalletAddress::parse`], so holding one means
/// the length and alphabet rules have already passed. Syntactic validity
/// says nothing about key control; that is the verifier's job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct WalletAddress(String);

impl WalletAddress {
    /// Parse and validate an address string. Surrounding whitespace is
    /// trimmed before the rules apply.
    pub fn parse(raw: &str) -> Result<Self, AuthError> {
        let raw = raw.trim();
        if raw.len() < MIN_ADDRESS_LEN || raw.len() > MAX_ADDRESS_LEN {
            return Err(AuthError::MalformedAddress(format!(
                "expected {MIN_ADDRESS_LEN}-{MAX_ADDRESS_LEN} characters, got {}",
                raw.len()
            )));
        }
        if let Some(bad) = raw.chars().find(|c| !BASE58_ALPHABET.contains(*c)) {
            return Err(AuthError::MalformedAddress(format!(
                "character {bad:?} is not in the base58 alphabet"
            )));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
