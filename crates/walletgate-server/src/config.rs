use std::env;
use std::fmt;

use thiserror::Error;
use url::Url;

const DEFAULT_PORT: u16 = 4025;
const DEFAULT_DB_PATH: &str = "./walletgate.db";
const DEFAULT_RATE_LIMIT_RPM: u32 = 120;

/// Secrets shorter than this get a startup warning.
const MIN_SECRET_BYTES: usize = 32;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingRequired(&'static str),

    #[error("invalid URL in {name}: {value}")]
    InvalidUrl { name: &'static str, value: String },

    #[error("unknown mint strategy {0:?} (expected \"self\" or \"provider\")")]
    UnknownStrategy(String),
}

/// Which minting strategy gets wired in at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MintStrategy {
    SelfIssued,
    Provider,
}

impl MintStrategy {
    /// Parse the `MINT_STRATEGY` value. Empty selects the default.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.trim() {
            "" | "self" => Ok(MintStrategy::SelfIssued),
            "provider" => Ok(MintStrategy::Provider),
            other => Err(ConfigError::UnknownStrategy(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MintStrategy::SelfIssued => "self",
            MintStrategy::Provider => "provider",
        }
    }
}

/// Server configuration, read once at startup from the environment.
#[derive(Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// SQLite path for the identity store.
    pub db_path: String,
    pub strategy: MintStrategy,
    /// HS256 secret for self-issued sessions. Present whenever the
    /// strategy is `SelfIssued`; `from_env` refuses to start otherwise.
    pub token_secret: Option<Vec<u8>>,
    pub provider_url: Option<String>,
    pub provider_service_key: Option<String>,
    /// Extra CORS origins beyond the localhost defaults.
    pub allowed_origins: Vec<String>,
    pub rate_limit_rpm: u32,
    /// Bearer token protecting /metrics.
    pub metrics_token: Option<String>,
    /// Explicit opt-in to an unauthenticated /metrics.
    pub public_metrics: bool,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Fails hard on anything that would silently weaken the exchange: a
    /// missing signing secret, a missing provider key, an unparseable
    /// provider URL. Defaults are applied for everything operational.
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let db_path = env::var("IDENTITY_DB_PATH")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DB_PATH.to_string());

        let strategy = MintStrategy::parse(&env::var("MINT_STRATEGY").unwrap_or_default())?;

        let token_secret = env::var("TOKEN_SECRET")
            .ok()
            .filter(|v| !v.is_empty())
            .map(String::into_bytes);
        let provider_url = env::var("PROVIDER_URL").ok().filter(|v| !v.is_empty());
        let provider_service_key = env::var("PROVIDER_SERVICE_KEY")
            .ok()
            .filter(|v| !v.is_empty());

        match strategy {
            MintStrategy::SelfIssued => {
                let Some(secret) = token_secret.as_deref() else {
                    return Err(ConfigError::MissingRequired("TOKEN_SECRET"));
                };
                if secret.len() < MIN_SECRET_BYTES {
                    tracing::warn!(
                        "TOKEN_SECRET is only {} bytes; generate one with: openssl rand -hex 32",
                        secret.len()
                    );
                }
            }
            MintStrategy::Provider => {
                let Some(url) = provider_url.as_deref() else {
                    return Err(ConfigError::MissingRequired("PROVIDER_URL"));
                };
                Url::parse(url).map_err(|_| ConfigError::InvalidUrl {
                    name: "PROVIDER_URL",
                    value: url.to_string(),
                })?;
                if provider_service_key.is_none() {
                    return Err(ConfigError::MissingRequired("PROVIDER_SERVICE_KEY"));
                }
            }
        }

        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();

        let rate_limit_rpm = env::var("RATE_LIMIT_RPM")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|&rpm| rpm > 0)
            .unwrap_or(DEFAULT_RATE_LIMIT_RPM);

        let metrics_token = env::var("METRICS_TOKEN").ok().filter(|v| !v.is_empty());
        let public_metrics = env::var("PUBLIC_METRICS")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        if metrics_token.is_none() && !public_metrics {
            tracing::warn!(
                "METRICS_TOKEN not set; /metrics will refuse all requests \
                 (set PUBLIC_METRICS=true to expose it unauthenticated)"
            );
        }

        Ok(Self {
            port,
            db_path,
            strategy,
            token_secret,
            provider_url,
            provider_service_key,
            allowed_origins,
            rate_limit_rpm,
            metrics_token,
            public_metrics,
        })
    }
}

// Manual Debug so startup logging can never leak key material.
impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("port", &self.port)
            .field("db_path", &self.db_path)
            .field("strategy", &self.strategy.as_str())
            .field("token_secret", &self.token_secret.as_ref().map(|_| "[REDACTED]"))
            .field("provider_url", &self.provider_url)
            .field(
                "provider_service_key",
                &self.provider_service_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("allowed_origins", &self.allowed_origins)
            .field("rate_limit_rpm", &self.rate_limit_rpm)
            .field("metrics_token", &self.metrics_token.as_ref().map(|_| "[REDACTED]"))
            .field("public_metrics", &self.public_metrics)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_parses_known_values() {
        assert_eq!(MintStrategy::parse("self").unwrap(), MintStrategy::SelfIssued);
        assert_eq!(MintStrategy::parse("provider").unwrap(), MintStrategy::Provider);
        assert_eq!(MintStrategy::parse("").unwrap(), MintStrategy::SelfIssued);
        assert_eq!(MintStrategy::parse("  self  ").unwrap(), MintStrategy::SelfIssued);
    }

    #[test]
    fn strategy_rejects_unknown_values() {
        assert!(matches!(
            MintStrategy::parse("oauth"),
            Err(ConfigError::UnknownStrategy(_))
        ));
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let config = ServerConfig {
            port: DEFAULT_PORT,
            db_path: DEFAULT_DB_PATH.to_string(),
            strategy: MintStrategy::SelfIssued,
            token_secret: Some(b"super-secret-signing-key-material".to_vec()),
            provider_url: None,
            provider_service_key: Some("service-role-key".to_string()),
            allowed_origins: vec![],
            rate_limit_rpm: DEFAULT_RATE_LIMIT_RPM,
            metrics_token: Some("metrics-bearer".to_string()),
            public_metrics: false,
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(!rendered.contains("service-role-key"));
        assert!(!rendered.contains("metrics-bearer"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
