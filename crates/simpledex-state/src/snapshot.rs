use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use simpledex_core::{serialize, Address, Hash, Pool};
use tracing::{debug, info};

use crate::account::Account;
use crate::error::StateError;
use crate::merkle::compute_state_root;
use crate::storage::Storage;

/// Key prefixes for storage
mod keys {
    pub const ACCOUNT: &[u8] = b"acc:";
    pub const POOL: &[u8] = b"pool:";
}

/// Point-in-time copy of ledger accounts and non-empty pools
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub accounts: BTreeMap<Address, Account>,
    pub pools: Vec<Pool>,
}

impl Snapshot {
    pub fn new(accounts: BTreeMap<Address, Account>, pools: Vec<Pool>) -> Self {
        let pools = pools.into_iter().filter(|pool| !pool.is_empty()).collect();
        Snapshot { accounts, pools }
    }

    fn entries(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StateError> {
        let mut entries = Vec::with_capacity(self.accounts.len() + self.pools.len());
        for (address, account) in &self.accounts {
            let key = [keys::ACCOUNT, address.as_bytes().as_slice()].concat();
            entries.push((key, serialize::to_bytes(account)?));
        }
        for pool in &self.pools {
            let key = [keys::POOL, pool.pair.pool_id().as_bytes().as_slice()].concat();
            entries.push((key, serialize::to_bytes(pool)?));
        }
        Ok(entries)
    }

    /// Merkle root over every account and pool
    pub fn state_root(&self) -> Result<Hash, StateError> {
        let entries = self.entries()?;
        Ok(compute_state_root(
            entries.iter().map(|(k, v)| (k.as_slice(), v.as_slice())),
        ))
    }
}

/// Persists snapshots into a `Storage` backend
pub struct StateStore<S: Storage> {
    storage: S,
}

impl<S: Storage> StateStore<S> {
    pub fn new(storage: S) -> Self {
        StateStore { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Replace the stored state with `snapshot` and commit
    ///
    /// Returns the snapshot's state root.
    pub fn persist(&mut self, snapshot: &Snapshot) -> Result<Hash, StateError> {
        let entries = match snapshot.entries() {
            Ok(entries) => entries,
            Err(e) => {
                self.storage.rollback();
                return Err(e);
            }
        };

        for prefix in [keys::ACCOUNT, keys::POOL] {
            for key in self.storage.keys_with_prefix(prefix) {
                self.storage.delete(&key);
            }
        }
        for (key, value) in &entries {
            self.storage.put(key, value);
        }
        self.storage.commit()?;

        let root = compute_state_root(entries.iter().map(|(k, v)| (k.as_slice(), v.as_slice())));
        info!(
            "Persisted {} accounts and {} pools, state root {}",
            snapshot.accounts.len(),
            snapshot.pools.len(),
            root
        );
        Ok(root)
    }

    /// Load the committed snapshot
    pub fn load(&self) -> Result<Snapshot, StateError> {
        let mut snapshot = Snapshot::default();

        for key in self.storage.keys_with_prefix(keys::ACCOUNT) {
            let Some(value) = self.storage.get(&key) else {
                continue;
            };
            let Some(address) = Address::from_slice(&key[keys::ACCOUNT.len()..]) else {
                debug!("Skipping malformed account key {:?}", key);
                continue;
            };
            let account: Account = serialize::from_bytes(&value)?;
            snapshot.accounts.insert(address, account);
        }

        for key in self.storage.keys_with_prefix(keys::POOL) {
            let Some(value) = self.storage.get(&key) else {
                continue;
            };
            let pool: Pool = serialize::from_bytes(&value)?;
            if !pool.is_consistent() {
                return Err(StateError::InconsistentPool(pool.pair.to_string()));
            }
            snapshot.pools.push(pool);
        }

        debug!(
            "Loaded {} accounts and {} pools",
            snapshot.accounts.len(),
            snapshot.pools.len()
        );
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use simpledex_core::{Amount, PairKey};

    fn sample_snapshot() -> Snapshot {
        let token_a = Address::derive("TKA");
        let token_b = Address::derive("TKB");
        let lp = Address::derive("lp");

        let mut account = Account::default();
        account.credit(&token_a, Amount::from(500u64));

        let mut pool = Pool::new(PairKey::new(token_a, token_b).unwrap());
        pool.reserve0 = Amount::from(100u64);
        pool.reserve1 = Amount::from(100u64);
        pool.total_liquidity = Amount::from(100u64);
        pool.set_position(lp, Amount::from(100u64));

        let empty = Pool::new(PairKey::new(token_a, Address::derive("TKC")).unwrap());

        let mut accounts = BTreeMap::new();
        accounts.insert(lp, account);
        Snapshot::new(accounts, vec![pool, empty])
    }

    #[test]
    fn test_empty_pools_dropped() {
        let snapshot = sample_snapshot();
        assert_eq!(snapshot.pools.len(), 1);
    }

    #[test]
    fn test_persist_and_load() {
        let snapshot = sample_snapshot();
        let mut store = StateStore::new(MemoryStorage::new());

        let root = store.persist(&snapshot).unwrap();
        let loaded = store.load().unwrap();

        assert_eq!(loaded, snapshot);
        assert_eq!(loaded.state_root().unwrap(), root);
    }

    #[test]
    fn test_persist_replaces_stale_entries() {
        let mut snapshot = sample_snapshot();
        let mut store = StateStore::new(MemoryStorage::new());
        store.persist(&snapshot).unwrap();

        snapshot.pools.clear();
        store.persist(&snapshot).unwrap();

        assert!(store.load().unwrap().pools.is_empty());
    }

    #[test]
    fn test_state_root_changes_with_balances() {
        let snapshot = sample_snapshot();
        let root1 = snapshot.state_root().unwrap();

        let mut changed = snapshot.clone();
        for account in changed.accounts.values_mut() {
            account.credit(&Address::derive("TKA"), Amount::from(1u64));
        }
        assert_ne!(root1, changed.state_root().unwrap());
    }

    #[test]
    fn test_inconsistent_pool_rejected_on_load() {
        let mut snapshot = sample_snapshot();
        snapshot.pools[0].total_liquidity = Amount::from(7u64);
        let mut store = StateStore::new(MemoryStorage::new());
        store.persist(&snapshot).unwrap();

        assert!(matches!(store.load(), Err(StateError::InconsistentPool(_))));
    }
}
