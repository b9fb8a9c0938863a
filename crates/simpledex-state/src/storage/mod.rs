pub mod memory;
pub mod persistent;

use std::collections::BTreeMap;

use crate::error::StateError;

/// Key-value storage for snapshots, with staged writes
pub trait Storage: Send + Sync {
    /// Get a value by key
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;

    /// Stage a key-value pair
    fn put(&mut self, key: &[u8], value: &[u8]);

    /// Stage a deletion
    fn delete(&mut self, key: &[u8]);

    /// Commit staged changes
    fn commit(&mut self) -> Result<(), StateError>;

    /// Drop staged changes
    fn rollback(&mut self);

    /// Get all keys with a given prefix
    fn keys_with_prefix(&self, prefix: &[u8]) -> Vec<Vec<u8>>;

    fn exists(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }
}

/// Committed data plus staged writes, shared by the storage backends
#[derive(Debug, Clone, Default)]
pub(crate) struct Staged {
    pub(crate) data: BTreeMap<Vec<u8>, Vec<u8>>,
    pending: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl Staged {
    pub(crate) fn with_data(data: BTreeMap<Vec<u8>, Vec<u8>>) -> Self {
        Staged {
            data,
            pending: BTreeMap::new(),
        }
    }

    pub(crate) fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        match self.pending.get(key) {
            Some(pending) => pending.clone(),
            None => self.data.get(key).cloned(),
        }
    }

    pub(crate) fn stage(&mut self, key: &[u8], value: Option<&[u8]>) {
        self.pending.insert(key.to_vec(), value.map(<[u8]>::to_vec));
    }

    pub(crate) fn apply(&mut self) {
        for (key, value) in std::mem::take(&mut self.pending) {
            match value {
                Some(v) => {
                    self.data.insert(key, v);
                }
                None => {
                    self.data.remove(&key);
                }
            }
        }
    }

    pub(crate) fn discard(&mut self) {
        self.pending.clear();
    }

    pub(crate) fn keys_with_prefix(&self, prefix: &[u8]) -> Vec<Vec<u8>> {
        let committed = self
            .data
            .keys()
            .filter(|key| key.starts_with(prefix))
            .filter(|key| !matches!(self.pending.get(*key), Some(None)));
        let staged = self
            .pending
            .iter()
            .filter(|(key, value)| {
                key.starts_with(prefix) && value.is_some() && !self.data.contains_key(*key)
            })
            .map(|(key, _)| key);

        let mut keys: Vec<Vec<u8>> = committed.chain(staged).cloned().collect();
        keys.sort();
        keys
    }
}

pub use memory::MemoryStorage;
pub use persistent::FileStorage;
