use std::sync::Arc;

use crate::address::WalletAddress;
use crate::error::{AuthError, StoreError};
use crate::identity::Identity;
use crate::store::IdentityStore;

/// Maps verified wallet addresses to stable identities, creating one on
/// first sight.
///
/// Lookup-then-create, with the store's uniqueness constraint as the
/// arbiter: losing the insert race is not a failure, it means the row now
/// exists, so the loser re-reads and returns the winner's identity. The
/// resolver itself holds no locks.
#[derive(Clone)]
pub struct IdentityResolver {
    store: Arc<dyn IdentityStore>,
}

impl IdentityResolver {
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self { store }
    }

    /// Return the identity for `wallet`, creating it if absent.
    ///
    /// Callers must only pass addresses that already passed signature
    /// verification; resolution itself proves nothing.
    pub fn resolve(&self, wallet: &WalletAddress) -> Result<Identity, AuthError> {
        if let Some(existing) = self.store.find_by_wallet(wallet)? {
            return Ok(existing);
        }

        let fresh = Identity::new(wallet);
        match self.store.insert(&fresh) {
            Ok(()) => {
                tracing::info!(wallet = %wallet, id = %fresh.id, "created wallet identity");
                Ok(fresh)
            }
            Err(StoreError::Conflict) => {
                // Another caller created the row between our read and
                // write. Their row is authoritative.
                self.store.find_by_wallet(wallet)?.ok_or_else(|| {
                    AuthError::Store(StoreError::Unavailable(
                        "identity missing after insert conflict".to_string(),
                    ))
                })
            }
            Err(e) => Err(e.into()),
        }
    }
}
