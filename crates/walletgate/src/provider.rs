//! Provider-delegated minting.
//!
//! Instead of signing tokens itself, the server provisions a principal in
//! an external identity provider and redeems a one-time login credential
//! for that principal's access token. The provider signs the result with
//! its own keys, so downstream systems that already trust the provider
//! need no extra configuration.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};

use crate::address::WalletAddress;
use crate::claims::AUTH_METHOD_WALLET;
use crate::error::AuthError;
use crate::identity::Identity;
use crate::mint::{SessionToken, TokenMinter};
use crate::token;

const HTTP_TIMEOUT_SECS: u64 = 10;

/// Deterministic principal handle for a wallet.
///
/// Providers treat handles case-insensitively while base58 addresses are
/// case-sensitive, so the handle embeds a hash of the address rather than
/// the address itself. Same wallet in, same handle out, on every node.
pub fn principal_handle(wallet: &WalletAddress) -> String {
    let digest = Sha256::digest(wallet.as_str().as_bytes());
    let mut hex = String::with_capacity(24);
    for byte in &digest[..12] {
        use std::fmt::Write;
        let _ = write!(hex, "{byte:02x}");
    }
    format!("w{hex}@wallet.local")
}

#[derive(Debug, Deserialize)]
struct Principal {
    id: String,
}

#[derive(Debug, Deserialize)]
struct PrincipalPage {
    users: Vec<Principal>,
}

#[derive(Debug, Deserialize)]
struct GeneratedLink {
    hashed_token: String,
}

#[derive(Debug, Deserialize)]
struct ProviderSession {
    access_token: String,
}

/// Client for the delegated provider's admin surface.
///
/// Three calls per mint: create (or look up) the principal, generate a
/// one-time login credential, redeem the credential for an access token.
/// Admin calls carry the service key; it never appears in errors.
pub struct ProviderClient {
    base_url: String,
    service_key: String,
    http: reqwest::Client,
}

impl ProviderClient {
    pub fn new(base_url: &str, service_key: &str) -> Self {
        // No redirects: a redirecting provider URL would re-send the
        // service key to wherever it points.
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(HTTP_TIMEOUT_SECS))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("failed to create HTTP client");
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key: service_key.to_string(),
            http,
        }
    }

    /// Create the wallet's principal, or fetch it when it already exists.
    ///
    /// The wallet claim (and our identity id) ride along in the principal
    /// metadata; that is how they survive into every token the provider
    /// later mints for this principal.
    async fn ensure_principal(
        &self,
        identity: &Identity,
        wallet: &WalletAddress,
    ) -> Result<Principal, AuthError> {
        let handle = principal_handle(wallet);
        let body = json!({
            "email": handle,
            "email_confirm": true,
            "user_metadata": {
                "wallet_address": wallet.as_str(),
            },
            "app_metadata": {
                "wallet_address": wallet.as_str(),
                "auth_method": AUTH_METHOD_WALLET,
                "platform_subject": identity.id,
            },
        });

        let resp = self
            .http
            .post(format!("{}/admin/users", self.base_url))
            .bearer_auth(&self.service_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AuthError::Minting(format!("provider create: {e}")))?;

        let status = resp.status();
        if status.is_success() {
            return resp
                .json::<Principal>()
                .await
                .map_err(|e| AuthError::Minting(format!("provider create body: {e}")));
        }
        if status == reqwest::StatusCode::CONFLICT
            || status == reqwest::StatusCode::UNPROCESSABLE_ENTITY
        {
            // Already provisioned for this wallet; reuse it.
            tracing::debug!(handle = %handle, "provider principal exists, looking it up");
            return self.find_principal(&handle).await;
        }
        Err(AuthError::Minting(format!("provider create: HTTP {status}")))
    }

    async fn find_principal(&self, handle: &str) -> Result<Principal, AuthError> {
        let resp = self
            .http
            .get(format!("{}/admin/users", self.base_url))
            .query(&[("email", handle)])
            .bearer_auth(&self.service_key)
            .send()
            .await
            .map_err(|e| AuthError::Minting(format!("provider lookup: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AuthError::Minting(format!("provider lookup: HTTP {status}")));
        }
        let page: PrincipalPage = resp
            .json()
            .await
            .map_err(|e| AuthError::Minting(format!("provider lookup body: {e}")))?;
        page.users.into_iter().next().ok_or_else(|| {
            AuthError::Minting("provider lookup: principal missing after conflict".to_string())
        })
    }

    /// Redeem a one-time login credential for the principal's access
    /// token. The credential never leaves this function.
    async fn exchange_credential(&self, handle: &str) -> Result<String, AuthError> {
        let resp = self
            .http
            .post(format!("{}/admin/generate_link", self.base_url))
            .bearer_auth(&self.service_key)
            .json(&json!({ "type": "magiclink", "email": handle }))
            .send()
            .await
            .map_err(|e| AuthError::Minting(format!("provider link: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AuthError::Minting(format!("provider link: HTTP {status}")));
        }
        let link: GeneratedLink = resp
            .json()
            .await
            .map_err(|e| AuthError::Minting(format!("provider link body: {e}")))?;

        let resp = self
            .http
            .post(format!("{}/verify", self.base_url))
            .json(&json!({
                "type": "magiclink",
                "email": handle,
                "token": link.hashed_token,
            }))
            .send()
            .await
            .map_err(|e| AuthError::Minting(format!("provider verify: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AuthError::Minting(format!("provider verify: HTTP {status}")));
        }
        let session: ProviderSession = resp
            .json()
            .await
            .map_err(|e| AuthError::Minting(format!("provider verify body: {e}")))?;
        Ok(session.access_token)
    }

    /// Full delegated flow: principal, credential, access token.
    pub async fn delegated_token(
        &self,
        identity: &Identity,
        wallet: &WalletAddress,
    ) -> Result<String, AuthError> {
        let principal = self.ensure_principal(identity, wallet).await?;
        tracing::debug!(principal = %principal.id, wallet = %wallet, "provider principal ready");
        self.exchange_credential(&principal_handle(wallet)).await
    }
}

/// Provider-delegated strategy.
pub struct ProviderDelegatedMinter {
    client: ProviderClient,
}

impl ProviderDelegatedMinter {
    pub fn new(client: ProviderClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TokenMinter for ProviderDelegatedMinter {
    async fn mint(
        &self,
        identity: &Identity,
        wallet: &WalletAddress,
    ) -> Result<SessionToken, AuthError> {
        let raw = self.client.delegated_token(identity, wallet).await?;

        // The provider signs with its own keys; what must hold on our side
        // is that the wallet claim survived into the minted claims.
        let claims = token::decode_bearer_claims(&raw)
            .map_err(|e| AuthError::Minting(format!("provider token: {e}")))?;
        let carries_wallet = |slot: &str| {
            claims[slot]["wallet_address"].as_str() == Some(wallet.as_str())
        };
        if !carries_wallet("user_metadata") && !carries_wallet("app_metadata") {
            return Err(AuthError::Minting(
                "provider token is missing the wallet claim".to_string(),
            ));
        }

        Ok(SessionToken::new(raw))
    }
}
