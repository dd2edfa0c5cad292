use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::address::WalletAddress;
use crate::identity::Identity;

/// Session lifetime in seconds. Fixed: `exp - iat` is exactly one hour for
/// every self-issued token.
pub const SESSION_TTL_SECS: i64 = 3600;

/// Value of the auth method claim stamped on every wallet-minted session.
pub const AUTH_METHOD_WALLET: &str = "wallet";

/// Claims carried by a self-issued session credential.
///
/// Derived fresh per issuance, never persisted. The wallet claim appears
/// both at the top level and inside `user_metadata`, so consumers that
/// only look at metadata (the shape delegated-provider tokens have) find
/// it in the same place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// The resolved identity's id.
    pub sub: String,
    /// Issued-at, unix seconds.
    pub iat: i64,
    /// Expiry, unix seconds. Always `iat + SESSION_TTL_SECS`.
    pub exp: i64,
    pub wallet_address: String,
    pub auth_method: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub user_metadata: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub app_metadata: Map<String, Value>,
}

impl SessionClaims {
    /// Build the claims for one issuance.
    ///
    /// `wallet` must be the address that passed verification in the same
    /// request. The builder takes the wallet claim from nowhere else,
    /// which is what rules out cross-wallet substitution.
    pub fn for_session(identity: &Identity, wallet: &WalletAddress, issued_at: i64) -> Self {
        let mut user_metadata = Map::new();
        user_metadata.insert(
            "wallet_address".to_string(),
            Value::String(wallet.as_str().to_string()),
        );

        let mut app_metadata = Map::new();
        app_metadata.insert(
            "auth_method".to_string(),
            Value::String(AUTH_METHOD_WALLET.to_string()),
        );

        Self {
            sub: identity.id.clone(),
            iat: issued_at,
            exp: issued_at + SESSION_TTL_SECS,
            wallet_address: wallet.as_str().to_string(),
            auth_method: AUTH_METHOD_WALLET.to_string(),
            user_metadata,
            app_metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (Identity, WalletAddress) {
        let wallet = WalletAddress::parse(&"k".repeat(40)).unwrap();
        (Identity::new(&wallet), wallet)
    }

    #[test]
    fn expiry_is_exactly_one_hour_after_issuance() {
        let (identity, wallet) = fixture();
        let claims = SessionClaims::for_session(&identity, &wallet, 1_700_000_000);
        assert_eq!(claims.iat, 1_700_000_000);
        assert_eq!(claims.exp - claims.iat, SESSION_TTL_SECS);
    }

    #[test]
    fn subject_is_the_identity_id() {
        let (identity, wallet) = fixture();
        let claims = SessionClaims::for_session(&identity, &wallet, 0);
        assert_eq!(claims.sub, identity.id);
    }

    #[test]
    fn wallet_claim_is_mirrored_into_user_metadata() {
        let (identity, wallet) = fixture();
        let claims = SessionClaims::for_session(&identity, &wallet, 0);
        assert_eq!(claims.wallet_address, wallet.as_str());
        assert_eq!(
            claims.user_metadata.get("wallet_address").and_then(Value::as_str),
            Some(wallet.as_str())
        );
        // The wallet lives at the top level and in user_metadata, not in
        // app_metadata.
        assert!(claims.app_metadata.get("wallet_address").is_none());
    }

    #[test]
    fn auth_method_is_wallet() {
        let (identity, wallet) = fixture();
        let claims = SessionClaims::for_session(&identity, &wallet, 0);
        assert_eq!(claims.auth_method, AUTH_METHOD_WALLET);
        assert_eq!(
            claims.app_metadata.get("auth_method").and_then(Value::as_str),
            Some(AUTH_METHOD_WALLET)
        );
    }
}
