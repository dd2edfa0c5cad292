use std::sync::{Mutex, MutexGuard};

use dashmap::DashMap;
use rusqlite::{params, Connection, OptionalExtension};

use crate::address::WalletAddress;
use crate::error::StoreError;
use crate::identity::Identity;

/// Storage backend for wallet identities.
///
/// Implementations must be thread-safe (`Send + Sync`) and must arbitrate
/// `insert` with a uniqueness constraint on the wallet column: when two
/// callers race on a first-seen wallet, exactly one insert succeeds and
/// every loser gets [`StoreError::Conflict`].
pub trait IdentityStore: Send + Sync {
    fn find_by_wallet(&self, wallet: &WalletAddress) -> Result<Option<Identity>, StoreError>;

    /// Insert a fresh identity. Fails with [`StoreError::Conflict`] when a
    /// row for the same wallet already exists.
    fn insert(&self, identity: &Identity) -> Result<(), StoreError>;
}

/// Persistent identity store backed by SQLite.
///
/// The `UNIQUE` constraint on `wallet_address` is what makes creation
/// idempotent under concurrency: the constraint is checked atomically at
/// the database level, so it holds even across processes sharing the file.
pub struct SqliteIdentityStore {
    conn: Mutex<Connection>,
}

impl SqliteIdentityStore {
    /// Open (or create) the store at `path`. Pass `":memory:"` for an
    /// ephemeral database in tests.
    pub fn open(path: &str) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS identities (
                id             TEXT PRIMARY KEY,
                wallet_address TEXT NOT NULL UNIQUE,
                created_at     INTEGER NOT NULL
            );
            PRAGMA journal_mode=WAL;",
        )?;

        // Owner-only permissions: the wallet-to-identity mapping is
        // account data other system users have no business reading.
        #[cfg(unix)]
        if path != ":memory:" {
            use std::os::unix::fs::PermissionsExt;
            if let Err(e) =
                std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            {
                tracing::warn!(
                    path = %path,
                    error = %e,
                    "failed to restrict identity database permissions"
                );
            }
        }

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Lock the connection, recovering from a poisoned mutex. A poisoned
    /// lock means a previous holder panicked; the connection itself is
    /// still usable and refusing all further work would turn one panic
    /// into a permanent outage.
    fn lock(&self) -> MutexGuard<'_, Connection> {
        match self.conn.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::error!("identity store mutex poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Number of stored identities. Test observability.
    pub fn count(&self) -> Result<usize, StoreError> {
        let conn = self.lock();
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM identities", [], |row| row.get(0))?;
        Ok(n as usize)
    }
}

impl IdentityStore for SqliteIdentityStore {
    fn find_by_wallet(&self, wallet: &WalletAddress) -> Result<Option<Identity>, StoreError> {
        let conn = self.lock();
        let identity = conn
            .query_row(
                "SELECT id, wallet_address, created_at FROM identities WHERE wallet_address = ?1",
                params![wallet.as_str()],
                |row| {
                    Ok(Identity {
                        id: row.get(0)?,
                        wallet_address: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(identity)
    }

    fn insert(&self, identity: &Identity) -> Result<(), StoreError> {
        let conn = self.lock();
        // No upsert here on purpose: a second insert for the same wallet
        // must surface as Conflict so the resolver re-reads the winner.
        conn.execute(
            "INSERT INTO identities (id, wallet_address, created_at) VALUES (?1, ?2, ?3)",
            params![identity.id, identity.wallet_address, identity.created_at],
        )?;
        Ok(())
    }
}

/// In-memory identity store backed by `DashMap`, keyed by wallet address.
///
/// Contents are lost on restart, which forks identities across restarts;
/// use it for tests and single-process development only.
#[derive(Default)]
pub struct InMemoryIdentityStore {
    identities: DashMap<String, Identity>,
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored identities. Test observability.
    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}

impl IdentityStore for InMemoryIdentityStore {
    fn find_by_wallet(&self, wallet: &WalletAddress) -> Result<Option<Identity>, StoreError> {
        Ok(self
            .identities
            .get(wallet.as_str())
            .map(|entry| entry.value().clone()))
    }

    fn insert(&self, identity: &Identity) -> Result<(), StoreError> {
        use dashmap::mapref::entry::Entry;
        // The entry API holds the shard lock across the check and the
        // write, which is what makes this the single-process equivalent of
        // the SQLite UNIQUE constraint.
        match self.identities.entry(identity.wallet_address.clone()) {
            Entry::Occupied(_) => Err(StoreError::Conflict),
            Entry::Vacant(slot) => {
                slot.insert(identity.clone());
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wallet(tag: char) -> WalletAddress {
        WalletAddress::parse(&tag.to_string().repeat(40)).unwrap()
    }

    fn stores() -> Vec<Box<dyn IdentityStore>> {
        vec![
            Box::new(SqliteIdentityStore::open(":memory:").unwrap()),
            Box::new(InMemoryIdentityStore::new()),
        ]
    }

    #[test]
    fn insert_then_find_round_trips() {
        for store in stores() {
            let w = wallet('4');
            let identity = Identity::new(&w);
            store.insert(&identity).unwrap();

            let found = store.find_by_wallet(&w).unwrap().unwrap();
            assert_eq!(found, identity);
        }
    }

    #[test]
    fn find_unknown_wallet_returns_none() {
        for store in stores() {
            assert!(store.find_by_wallet(&wallet('5')).unwrap().is_none());
        }
    }

    #[test]
    fn second_insert_for_same_wallet_conflicts() {
        for store in stores() {
            let w = wallet('6');
            let first = Identity::new(&w);
            let second = Identity::new(&w);
            assert_ne!(first.id, second.id);

            store.insert(&first).unwrap();
            let err = store.insert(&second).unwrap_err();
            assert!(matches!(err, StoreError::Conflict));

            // The winner's row is untouched.
            let found = store.find_by_wallet(&w).unwrap().unwrap();
            assert_eq!(found.id, first.id);
        }
    }

    #[test]
    fn sqlite_count_tracks_rows() {
        let store = SqliteIdentityStore::open(":memory:").unwrap();
        assert_eq!(store.count().unwrap(), 0);

        store.insert(&Identity::new(&wallet('2'))).unwrap();
        store.insert(&Identity::new(&wallet('3'))).unwrap();
        assert_eq!(store.count().unwrap(), 2);

        // A conflicting insert adds nothing.
        assert!(store.insert(&Identity::new(&wallet('2'))).is_err());
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn distinct_wallets_do_not_conflict() {
        for store in stores() {
            store.insert(&Identity::new(&wallet('7'))).unwrap();
            store.insert(&Identity::new(&wallet('8'))).unwrap();
            assert!(store.find_by_wallet(&wallet('7')).unwrap().is_some());
            assert!(store.find_by_wallet(&wallet('8')).unwrap().is_some());
        }
    }

    #[test]
    fn sqlite_store_survives_reopen() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap().to_string();
        let w = wallet('9');
        let identity = Identity::new(&w);

        {
            let store = SqliteIdentityStore::open(&path).unwrap();
            store.insert(&identity).unwrap();
        }

        let reopened = SqliteIdentityStore::open(&path).unwrap();
        let found = reopened.find_by_wallet(&w).unwrap().unwrap();
        assert_eq!(found, identity);
    }

    #[test]
    fn sqlite_open_on_bad_path_fails() {
        assert!(SqliteIdentityStore::open("/nonexistent-dir/identities.db").is_err());
    }
}
