use std::sync::Arc;

use actix_cors::Cors;
use actix_governor::{Governor, GovernorConfigBuilder};
use actix_web::{web, App, HttpServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use walletgate::store::{IdentityStore, SqliteIdentityStore};
use walletgate::{
    Ed25519Verifier, IdentityResolver, ProviderClient, ProviderDelegatedMinter, SelfIssuedMinter,
    TokenMinter,
};
use walletgate_server::config::{MintStrategy, ServerConfig};
use walletgate_server::routes;
use walletgate_server::state::AppState;

fn build_cors(origins: &[String]) -> Cors {
    if origins.is_empty() {
        // Default: allow localhost on any port
        Cors::default()
            .allowed_origin_fn(|origin, _| {
                origin
                    .to_str()
                    .map(|o| o == "http://localhost" || o.starts_with("http://localhost:"))
                    .unwrap_or(false)
            })
            .allow_any_method()
            .allowed_headers(vec!["content-type", "authorization"])
            .max_age(3600)
    } else {
        let mut cors = Cors::default();
        for origin in origins {
            cors = cors.allowed_origin(origin);
        }
        cors.allow_any_method()
            .allowed_headers(vec!["content-type", "authorization"])
            .max_age(3600)
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Configuration error: {e}");
            std::process::exit(1);
        }
    };
    tracing::debug!(?config, "loaded configuration");

    let store: Arc<dyn IdentityStore> = match SqliteIdentityStore::open(&config.db_path) {
        Ok(store) => {
            tracing::info!("Identity store: SQLite at {}", config.db_path);
            Arc::new(store)
        }
        Err(e) => {
            tracing::error!(
                "Failed to open SQLite identity store at {}: {e}",
                config.db_path
            );
            tracing::error!(
                "Refusing to start — an in-memory fallback would fork wallet identities across restarts"
            );
            std::process::exit(1);
        }
    };

    let minter: Arc<dyn TokenMinter> = match config.strategy {
        MintStrategy::SelfIssued => {
            let secret = config
                .token_secret
                .clone()
                .expect("TOKEN_SECRET presence is checked during config load");
            Arc::new(SelfIssuedMinter::new(secret))
        }
        MintStrategy::Provider => {
            let url = config
                .provider_url
                .clone()
                .expect("PROVIDER_URL presence is checked during config load");
            let key = config
                .provider_service_key
                .clone()
                .expect("PROVIDER_SERVICE_KEY presence is checked during config load");
            tracing::info!("Delegating token minting to provider at {url}");
            Arc::new(ProviderDelegatedMinter::new(ProviderClient::new(&url, &key)))
        }
    };

    let state = web::Data::new(AppState {
        verifier: Arc::new(Ed25519Verifier::new()),
        resolver: IdentityResolver::new(store),
        minter,
        metrics_token: config.metrics_token.clone(),
        public_metrics: config.public_metrics,
    });

    let port = config.port;
    let rate_limit_rpm = config.rate_limit_rpm;
    let cors_origins = config.allowed_origins.clone();

    tracing::info!("walletgate listening on port {port}");
    tracing::info!("Mint strategy: {}", config.strategy.as_str());
    tracing::info!("Rate limit: {rate_limit_rpm} req/min per IP");
    tracing::info!("  POST http://localhost:{port}/auth/wallet");
    tracing::info!("  GET  http://localhost:{port}/auth/wallet?inspect=true");

    let governor_conf = GovernorConfigBuilder::default()
        .requests_per_minute(rate_limit_rpm as u64)
        .finish()
        .expect("failed to build rate limiter config");

    HttpServer::new(move || {
        App::new()
            .wrap(build_cors(&cors_origins))
            .wrap(Governor::new(&governor_conf))
            .app_data(state.clone())
            .app_data(web::PayloadConfig::default().limit(16_384))
            .service(routes::health)
            .service(routes::metrics_endpoint)
            .service(routes::exchange)
            .service(routes::inspect_token)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
