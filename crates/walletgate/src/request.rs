use serde::Deserialize;

use crate::address::WalletAddress;
use crate::error::AuthError;

/// Inbound exchange payload: `{wallet, signature, message}`.
///
/// All fields default to empty so that an absent field and an empty field
/// fail the same structural check instead of failing deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExchangeRequest {
    #[serde(default)]
    pub wallet: String,
    #[serde(default)]
    pub signature: String,
    #[serde(default)]
    pub message: String,
}

/// An exchange request that passed structural validation.
///
/// The signature stays in its wire encoding here: decoding is the
/// verifier's concern, and a signature that does not decode is a failed
/// verification, not a malformed request.
#[derive(Debug, Clone)]
pub struct ValidExchange {
    pub wallet: WalletAddress,
    pub signature: String,
    pub message: String,
}

impl ExchangeRequest {
    /// Structural validation: required fields present, address well-formed.
    ///
    /// Pure. Runs before any verification or storage work, so a rejected
    /// request costs nothing downstream.
    pub fn validate(&self) -> Result<ValidExchange, AuthError> {
        if self.wallet.trim().is_empty() {
            return Err(AuthError::MissingField("wallet"));
        }
        if self.signature.trim().is_empty() {
            return Err(AuthError::MissingField("signature"));
        }
        if self.message.is_empty() {
            return Err(AuthError::MissingField("message"));
        }
        let wallet = WalletAddress::parse(&self.wallet)?;
        Ok(ValidExchange {
            wallet,
            signature: self.signature.trim().to_string(),
            // The message is signed verbatim, so it is never trimmed.
            message: self.message.clone(),
        })
    }
}
