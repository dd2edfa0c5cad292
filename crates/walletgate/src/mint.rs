use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;

use crate::address::WalletAddress;
use crate::claims::SessionClaims;
use crate::error::AuthError;
use crate::identity::Identity;
use crate::token;

/// An issued bearer credential, opaque to holders.
///
/// Downstream systems trust one only because it came out of a verified
/// exchange. No `Display` impl on purpose: tokens do not belong in logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(raw: String) -> Self {
        Self(raw)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Capability interface for session-token issuance.
///
/// Exactly one implementation is wired in at startup; the rest of the
/// pipeline never branches on which. Minting may go to the network, hence
/// async.
#[async_trait]
pub trait TokenMinter: Send + Sync {
    /// Issue a bearer credential for `identity`.
    ///
    /// `wallet` is the address that passed verification in this request.
    /// Implementations must take the wallet claim from it and nowhere
    /// else.
    async fn mint(
        &self,
        identity: &Identity,
        wallet: &WalletAddress,
    ) -> Result<SessionToken, AuthError>;
}

/// Self-issued strategy: sign claims locally with a server-held secret.
pub struct SelfIssuedMinter {
    secret: Vec<u8>,
}

impl SelfIssuedMinter {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

#[async_trait]
impl TokenMinter for SelfIssuedMinter {
    async fn mint(
        &self,
        identity: &Identity,
        wallet: &WalletAddress,
    ) -> Result<SessionToken, AuthError> {
        let claims = SessionClaims::for_session(identity, wallet, Utc::now().timestamp());
        let token = token::encode(&claims, &self.secret)?;
        Ok(SessionToken::new(token))
    }
}
