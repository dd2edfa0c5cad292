use std::sync::Arc;

use walletgate::{IdentityResolver, SignatureVerifier, TokenMinter};

/// Shared application state.
///
/// The verifier, resolver and minter are constructed once at startup and
/// injected here; handlers only ever see the capability interfaces, so
/// swapping a strategy (or substituting fixed-outcome fakes in tests)
/// never touches the routes.
pub struct AppState {
    pub verifier: Arc<dyn SignatureVerifier>,
    pub resolver: IdentityResolver,
    pub minter: Arc<dyn TokenMinter>,
    /// Bearer token for /metrics. Kept apart from the signing secret so
    /// scrape credentials can rotate independently.
    pub metrics_token: Option<String>,
    /// Explicit opt-in to serving /metrics without a token.
    pub public_metrics: bool,
}
