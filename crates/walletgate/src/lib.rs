//! walletgate: wallet-proof to session-credential exchange.
//!
//! A caller proves control of a wallet key by signing a message; the
//! exchange turns that proof into a platform identity and a bearer
//! session token. The pipeline runs in a fixed order, each stage gated by
//! the previous one:
//!
//! 1. [`ExchangeRequest::validate`] structural checks, no side effects
//! 2. [`SignatureVerifier`] real ed25519 proof, fails closed
//! 3. [`IdentityResolver`] idempotent lookup-or-create
//! 4. [`TokenMinter`] self-issued HS256 or provider-delegated
//!
//! [`inspect`] is an independent read path over already-issued tokens:
//! it decodes claims without verifying anything, for debugging.

// Request surface
pub mod address;
pub mod request;

// Pipeline stages
pub mod identity;
pub mod mint;
pub mod provider;
pub mod resolver;
pub mod store;
pub mod verify;

// Token plumbing and diagnostics
pub mod claims;
pub mod inspect;
pub mod token;

pub mod error;

pub use address::WalletAddress;
pub use claims::{SessionClaims, AUTH_METHOD_WALLET, SESSION_TTL_SECS};
pub use error::{AuthError, StoreError};
pub use identity::Identity;
pub use inspect::{inspect, ClaimsView, WalletClaimFlags};
pub use mint::{SelfIssuedMinter, SessionToken, TokenMinter};
pub use provider::{principal_handle, ProviderClient, ProviderDelegatedMinter};
pub use request::{ExchangeRequest, ValidExchange};
pub use resolver::IdentityResolver;
pub use store::{IdentityStore, InMemoryIdentityStore, SqliteIdentityStore};
pub use verify::{Ed25519Verifier, SignatureVerifier, StaticVerifier};
