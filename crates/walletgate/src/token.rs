//! Compact HS256 session tokens.
//!
//! Layout is the usual three-segment form,
//! `b64url(header).b64url(claims).b64url(mac)`, signed with a server-held
//! secret. Encoding and the MAC live here; what goes into the claims is
//! [`crate::claims`]'s business.

use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::claims::SessionClaims;
use crate::error::AuthError;

type HmacSha256 = Hmac<Sha256>;

const HEADER_JSON: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

/// Serialize and sign `claims` with `secret`.
pub fn encode(claims: &SessionClaims, secret: &[u8]) -> Result<String, AuthError> {
    let claims_json = serde_json::to_vec(claims)
        .map_err(|e| AuthError::Minting(format!("claims serialization: {e}")))?;

    let header_b64 = URL_SAFE_NO_PAD.encode(HEADER_JSON.as_bytes());
    let claims_b64 = URL_SAFE_NO_PAD.encode(&claims_json);
    let signing_input = format!("{header_b64}.{claims_b64}");

    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(signing_input.as_bytes());
    let mac_b64 = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{signing_input}.{mac_b64}"))
}

/// Check a token's MAC against `secret`. Constant-time via
/// `Mac::verify_slice`.
///
/// This is the downstream trust check; issuance never calls it. It says
/// nothing about expiry.
pub fn verify(token: &str, secret: &[u8]) -> bool {
    let Ok((header, claims, mac)) = split_segments(token) else {
        return false;
    };
    let Ok(mac_bytes) = URL_SAFE_NO_PAD.decode(mac) else {
        return false;
    };
    let mut expected = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    expected.update(format!("{header}.{claims}").as_bytes());
    expected.verify_slice(&mac_bytes).is_ok()
}

/// Split a compact token into its three dot-separated segments.
pub fn split_segments(token: &str) -> Result<(&str, &str, &str), AuthError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(AuthError::MalformedToken(format!(
            "expected 3 dot-separated segments, got {}",
            segments.len()
        )));
    }
    Ok((segments[0], segments[1], segments[2]))
}

/// Decode one claims segment into JSON without touching the signature.
///
/// Accepts unpadded base64url first, padded as a fallback; issuers differ
/// on padding and a diagnostic decoder should read both.
pub fn decode_claims_segment(segment: &str) -> Result<serde_json::Value, AuthError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .or_else(|_| URL_SAFE.decode(segment))
        .map_err(|e| AuthError::UndecodableClaims(format!("claims segment base64: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| AuthError::UndecodableClaims(format!("claims segment JSON: {e}")))
}

/// Split a bearer token and decode its claims segment, skipping signature
/// checks entirely.
pub fn decode_bearer_claims(token: &str) -> Result<serde_json::Value, AuthError> {
    let (_, claims_segment, _) = split_segments(token)?;
    decode_claims_segment(claims_segment)
}
