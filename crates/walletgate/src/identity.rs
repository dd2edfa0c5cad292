use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::address::WalletAddress;

/// A stable platform identity keyed by wallet address.
///
/// Exactly one identity exists per distinct address. The store's
/// uniqueness constraint enforces that, not in-process locking, so the
/// guarantee holds across server instances sharing a database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Opaque unique id, generated at creation and never reused.
    pub id: String,
    pub wallet_address: String,
    /// Unix seconds at creation.
    pub created_at: i64,
}

impl Identity {
    /// Mint a fresh identity for a first-seen wallet.
    pub fn new(wallet: &WalletAddress) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            wallet_address: wallet.as_str().to_string(),
            created_at: Utc::now().timestamp(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_identities_get_distinct_ids() {
        let wallet = WalletAddress::parse(&"3".repeat(40)).unwrap();
        let a = Identity::new(&wallet);
        let b = Identity::new(&wallet);
        assert_ne!(a.id, b.id);
        assert_eq!(a.wallet_address, b.wallet_address);
    }
}
