use chrono::DateTime;
use serde::Serialize;
use serde_json::Value;

use crate::error::AuthError;
use crate::token;

/// Where a wallet claim was found inside a decoded token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WalletClaimFlags {
    pub top_level: bool,
    pub user_metadata: bool,
    pub app_metadata: bool,
}

/// Decoded, unverified view of a bearer token.
///
/// The signature segment is deliberately ignored, so nothing here says the
/// token is genuine. Debugging aid only; never an authorization input.
#[derive(Debug, Clone, Serialize)]
pub struct ClaimsView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// RFC 3339 rendering of `exp`, when present and in range.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    pub wallet_claim: WalletClaimFlags,
    /// The full decoded claims object, verbatim.
    pub claims: Value,
}

/// Decode `bearer`'s claims segment without trusting it.
///
/// Fails with [`AuthError::MalformedToken`] when the compact three-segment
/// layout is missing, and [`AuthError::UndecodableClaims`] when the claims
/// segment is not base64-wrapped JSON. An expired or garbage-signed token
/// still inspects fine; that is the point.
pub fn inspect(bearer: &str) -> Result<ClaimsView, AuthError> {
    let claims = token::decode_bearer_claims(bearer.trim())?;

    let wallet_claim = WalletClaimFlags {
        top_level: has_wallet(&claims),
        user_metadata: claims.get("user_metadata").map(has_wallet).unwrap_or(false),
        app_metadata: claims.get("app_metadata").map(has_wallet).unwrap_or(false),
    };

    let subject = claims
        .get("sub")
        .and_then(Value::as_str)
        .map(str::to_string);
    let expires_at = claims
        .get("exp")
        .and_then(Value::as_i64)
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|when| when.to_rfc3339());

    Ok(ClaimsView {
        subject,
        expires_at,
        wallet_claim,
        claims,
    })
}

fn has_wallet(value: &Value) -> bool {
    value
        .get("wallet_address")
        .map(|v| !v.is_null())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::WalletAddress;
    use crate::identity::Identity;
    use crate::mint::{SelfIssuedMinter, TokenMinter};
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine as _;
    use serde_json::json;

    fn fake_token(claims: serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let claims = URL_SAFE_NO_PAD.encode(claims.to_string().as_bytes());
        format!("{header}.{claims}.an-unchecked-signature")
    }

    #[tokio::test]
    async fn self_issued_token_flags_top_level_and_user_metadata() {
        let wallet = WalletAddress::parse(&"u".repeat(40)).unwrap();
        let identity = Identity::new(&wallet);
        let minted = SelfIssuedMinter::new(b"0123456789abcdef0123456789abcdef".to_vec())
            .mint(&identity, &wallet)
            .await
            .unwrap();

        let view = inspect(minted.as_str()).unwrap();
        assert_eq!(view.subject.as_deref(), Some(identity.id.as_str()));
        assert!(view.wallet_claim.top_level);
        assert!(view.wallet_claim.user_metadata);
        assert!(!view.wallet_claim.app_metadata);
        assert!(view.expires_at.is_some());
    }

    #[test]
    fn provider_shaped_token_flags_metadata_only() {
        let token = fake_token(json!({
            "sub": "prov-user-1",
            "user_metadata": { "wallet_address": "abc" },
            "app_metadata": { "wallet_address": "abc" },
        }));
        let view = inspect(&token).unwrap();
        assert!(!view.wallet_claim.top_level);
        assert!(view.wallet_claim.user_metadata);
        assert!(view.wallet_claim.app_metadata);
    }

    #[test]
    fn absent_wallet_claim_flags_all_false() {
        let view = inspect(&fake_token(json!({ "sub": "nobody" }))).unwrap();
        assert!(!view.wallet_claim.top_level);
        assert!(!view.wallet_claim.user_metadata);
        assert!(!view.wallet_claim.app_metadata);
    }

    #[test]
    fn null_wallet_claim_counts_as_absent() {
        let view = inspect(&fake_token(json!({ "wallet_address": null }))).unwrap();
        assert!(!view.wallet_claim.top_level);
    }

    #[test]
    fn expiry_renders_as_rfc3339() {
        let view = inspect(&fake_token(json!({ "exp": 1_700_003_600 }))).unwrap();
        assert_eq!(view.expires_at.as_deref(), Some("2023-11-14T23:13:20+00:00"));
    }

    #[test]
    fn missing_expiry_renders_as_none() {
        let view = inspect(&fake_token(json!({ "sub": "x" }))).unwrap();
        assert!(view.expires_at.is_none());
    }

    #[test]
    fn non_numeric_expiry_is_tolerated() {
        let view = inspect(&fake_token(json!({ "exp": "soon" }))).unwrap();
        assert!(view.expires_at.is_none());
    }

    #[test]
    fn garbage_signature_does_not_block_inspection() {
        // Inspection must not verify; a token nobody signed still decodes.
        let view = inspect(&fake_token(json!({ "sub": "anyone" }))).unwrap();
        assert_eq!(view.subject.as_deref(), Some("anyone"));
    }

    #[test]
    fn wrong_segment_count_is_malformed() {
        assert!(matches!(
            inspect("header.claims"),
            Err(AuthError::MalformedToken(_))
        ));
        assert!(matches!(
            inspect("a.b.c.d"),
            Err(AuthError::MalformedToken(_))
        ));
    }

    #[test]
    fn non_json_claims_are_undecodable() {
        let header = URL_SAFE_NO_PAD.encode(b"{}");
        let claims = URL_SAFE_NO_PAD.encode(b"definitely not json");
        let err = inspect(&format!("{header}.{claims}.sig")).unwrap_err();
        assert!(matches!(err, AuthError::UndecodableClaims(_)));
    }

    #[test]
    fn non_base64_claims_are_undecodable() {
        let err = inspect("aGVhZGVy.!!!.c2ln").unwrap_err();
        assert!(matches!(err, AuthError::UndecodableClaims(_)));
    }
}
