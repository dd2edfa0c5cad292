use std::sync::LazyLock;

use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};
use walletgate::AuthError;

/// Exchange attempts by outcome.
pub static EXCHANGE_REQUESTS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "walletgate_exchange_total",
        "Credential exchange requests by outcome",
        &["result"]
    )
    .expect("metric can be registered")
});

/// End-to-end exchange latency. The provider strategy goes to the network,
/// so the buckets stretch well past local-signing latencies.
pub static EXCHANGE_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    register_histogram_vec!(
        "walletgate_exchange_duration_seconds",
        "Credential exchange duration in seconds",
        &["result"],
        vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .expect("metric can be registered")
});

/// Token inspections by outcome.
pub static INSPECT_REQUESTS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "walletgate_inspect_total",
        "Token inspection requests by outcome",
        &["result"]
    )
    .expect("metric can be registered")
});

/// Stable `result` label for a failed exchange.
pub fn exchange_outcome(err: &AuthError) -> &'static str {
    match err {
        AuthError::MissingField(_) | AuthError::MalformedAddress(_) => "invalid_request",
        AuthError::VerificationFailed => "verification_failed",
        AuthError::Store(_) => "store_error",
        AuthError::Minting(_) => "mint_error",
        // Inspection-only variants; an exchange never produces them.
        AuthError::MalformedToken(_) | AuthError::UndecodableClaims(_) => "invalid_request",
    }
}

/// Render the process registry in the Prometheus text format.
pub fn metrics_output() -> String {
    let encoder = TextEncoder::new();
    let families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&families, &mut buffer) {
        tracing::error!(error = %e, "failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
