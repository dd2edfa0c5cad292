use std::time::Instant;

use actix_web::{get, post, web, HttpRequest, HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use walletgate::{AuthError, ExchangeRequest, SessionToken, AUTH_METHOD_WALLET};

use crate::error::ApiError;
use crate::metrics;
use crate::state::AppState;

/// Successful exchange payload: the bearer token plus the identity it was
/// minted for.
#[derive(Debug, Serialize)]
pub struct ExchangeResponse {
    pub token: SessionToken,
    pub user: ExchangeUser,
}

#[derive(Debug, Serialize)]
pub struct ExchangeUser {
    pub id: String,
    pub wallet: String,
    pub auth_type: &'static str,
}

#[get("/health")]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "service": "walletgate",
    }))
}

/// POST /auth/wallet: exchange a signed message for a session credential.
#[post("/auth/wallet")]
pub async fn exchange(state: web::Data<AppState>, body: web::Bytes) -> HttpResponse {
    let started = Instant::now();

    // Parse by hand so a syntax error gets the same JSON envelope as every
    // other failure.
    let request: ExchangeRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            observe(started, "invalid_request");
            return HttpResponse::BadRequest().json(serde_json::json!({
                "error": "invalid_json",
                "message": format!("request body is not valid JSON: {e}"),
            }));
        }
    };

    match run_exchange(&state, request).await {
        Ok(response) => {
            observe(started, "success");
            HttpResponse::Ok().json(response)
        }
        Err(err) => {
            observe(started, metrics::exchange_outcome(&err));
            ApiError(err).error_response()
        }
    }
}

/// The pipeline proper: validate, verify, resolve, mint. Stages run in
/// that order and each failure stops the request before the next stage
/// does any work.
async fn run_exchange(
    state: &AppState,
    request: ExchangeRequest,
) -> Result<ExchangeResponse, AuthError> {
    let valid = request.validate()?;

    if !state
        .verifier
        .verify(&valid.wallet, &valid.message, &valid.signature)
    {
        tracing::warn!(wallet = %valid.wallet, "signature verification failed");
        return Err(AuthError::VerificationFailed);
    }

    let identity = state.resolver.resolve(&valid.wallet)?;
    let token = state.minter.mint(&identity, &valid.wallet).await?;

    tracing::info!(wallet = %valid.wallet, identity = %identity.id, "exchange complete");

    Ok(ExchangeResponse {
        token,
        user: ExchangeUser {
            id: identity.id,
            wallet: valid.wallet.as_str().to_string(),
            auth_type: AUTH_METHOD_WALLET,
        },
    })
}

fn observe(started: Instant, outcome: &str) {
    metrics::EXCHANGE_REQUESTS.with_label_values(&[outcome]).inc();
    metrics::EXCHANGE_DURATION
        .with_label_values(&[outcome])
        .observe(started.elapsed().as_secs_f64());
}

#[derive(Debug, Deserialize)]
pub struct ExchangeQuery {
    #[serde(default)]
    inspect: Option<String>,
}

/// GET /auth/wallet?inspect=true: decode a bearer token's claims without
/// verifying its signature. Debugging aid for "why does my session not
/// carry a wallet"; the output must never gate anything.
#[get("/auth/wallet")]
pub async fn inspect_token(req: HttpRequest, query: web::Query<ExchangeQuery>) -> HttpResponse {
    if !truthy(query.inspect.as_deref()) {
        return HttpResponse::NotFound().json(serde_json::json!({
            "error": "not_found",
            "message": "GET on this path is only served with ?inspect=true",
        }));
    }

    let Some(bearer) = bearer_token(&req) else {
        metrics::INSPECT_REQUESTS
            .with_label_values(&["unauthorized"])
            .inc();
        return HttpResponse::Unauthorized().json(serde_json::json!({
            "error": "missing_bearer_token",
            "message": "inspection reads the token from the Authorization: Bearer header",
        }));
    };

    match walletgate::inspect(bearer) {
        Ok(view) => {
            metrics::INSPECT_REQUESTS
                .with_label_values(&["success"])
                .inc();
            HttpResponse::Ok().json(view)
        }
        Err(err) => {
            metrics::INSPECT_REQUESTS
                .with_label_values(&["invalid_token"])
                .inc();
            ApiError(err).error_response()
        }
    }
}

/// GET /metrics: Prometheus text output. A configured METRICS_TOKEN always
/// wins; without one, PUBLIC_METRICS=true is the only way in.
#[get("/metrics")]
pub async fn metrics_endpoint(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    match state.metrics_token.as_deref() {
        Some(expected) => {
            let authorized = bearer_token(&req)
                .map(|presented| constant_time_eq(presented.as_bytes(), expected.as_bytes()))
                .unwrap_or(false);
            if !authorized {
                return HttpResponse::Unauthorized().json(serde_json::json!({
                    "error": "unauthorized",
                    "message": "valid bearer token required for /metrics",
                }));
            }
        }
        None if !state.public_metrics => {
            return HttpResponse::Forbidden().json(serde_json::json!({
                "error": "metrics_disabled",
                "message": "set METRICS_TOKEN or PUBLIC_METRICS=true to enable /metrics",
            }));
        }
        None => {}
    }

    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(metrics::metrics_output())
}

fn truthy(flag: Option<&str>) -> bool {
    matches!(flag, Some("true") | Some("1"))
}

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Constant-time comparison for the metrics bearer token. Hashing both
/// sides to a fixed length first keeps length as well as content out of
/// the timing signal.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    use sha2::{Digest, Sha256};
    use subtle::ConstantTimeEq;

    let digest_a = Sha256::digest(a);
    let digest_b = Sha256::digest(b);
    digest_a.ct_eq(&digest_b).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthy_accepts_true_and_one_only() {
        assert!(truthy(Some("true")));
        assert!(truthy(Some("1")));
        assert!(!truthy(Some("TRUE")));
        assert!(!truthy(Some("yes")));
        assert!(!truthy(Some("")));
        assert!(!truthy(None));
    }

    #[test]
    fn constant_time_eq_matches_equal_inputs() {
        assert!(constant_time_eq(b"scrape-token", b"scrape-token"));
        assert!(!constant_time_eq(b"scrape-token", b"scrape-tokeN"));
        assert!(!constant_time_eq(b"short", b"much longer input"));
        assert!(constant_time_eq(b"", b""));
    }
}
