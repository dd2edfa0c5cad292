use std::fmt;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use walletgate::AuthError;

/// HTTP wrapper for pipeline errors.
///
/// Every response body is `{"error": <stable code>, "message": <human>}`.
/// The codes are part of the API; clients match on them, so they never
/// change spelling. Server-side causes (store and provider failures) are
/// logged here and replaced with generic messages on the wire.
#[derive(Debug)]
pub struct ApiError(pub AuthError);

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        Self(e)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match &self.0 {
            AuthError::MissingField(_)
            | AuthError::MalformedAddress(_)
            | AuthError::MalformedToken(_)
            | AuthError::UndecodableClaims(_) => StatusCode::BAD_REQUEST,
            AuthError::VerificationFailed => StatusCode::UNAUTHORIZED,
            AuthError::Store(_) | AuthError::Minting(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let (code, message) = match &self.0 {
            AuthError::MissingField(field) => {
                ("missing_field", format!("missing or empty field: {field}"))
            }
            AuthError::MalformedAddress(detail) => {
                ("malformed_wallet_address", format!("malformed wallet address: {detail}"))
            }
            AuthError::VerificationFailed => (
                "verification_failed",
                "signature does not prove control of the claimed wallet".to_string(),
            ),
            AuthError::Store(cause) => {
                tracing::error!(error = %cause, "identity store failure");
                (
                    "identity_store_unavailable",
                    "identity could not be read or created".to_string(),
                )
            }
            AuthError::Minting(cause) => {
                tracing::error!(error = %cause, "token minting failure");
                (
                    "minting_failed",
                    "session token could not be issued".to_string(),
                )
            }
            AuthError::MalformedToken(detail) => {
                ("malformed_token", format!("malformed token: {detail}"))
            }
            AuthError::UndecodableClaims(detail) => {
                ("undecodable_claims", format!("undecodable claims: {detail}"))
            }
        };

        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": code,
            "message": message,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use walletgate::StoreError;

    #[test]
    fn validation_errors_map_to_400() {
        assert_eq!(
            ApiError(AuthError::MissingField("wallet")).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError(AuthError::MalformedAddress("too short".into())).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn verification_failure_maps_to_401() {
        assert_eq!(
            ApiError(AuthError::VerificationFailed).status_code(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn server_side_failures_map_to_500() {
        assert_eq!(
            ApiError(AuthError::Store(StoreError::Unavailable("x".into()))).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError(AuthError::Minting("provider down".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn inspection_errors_map_to_400() {
        assert_eq!(
            ApiError(AuthError::MalformedToken("2 segments".into())).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError(AuthError::UndecodableClaims("not json".into())).status_code(),
            StatusCode::BAD_REQUEST
        );
    }
}
