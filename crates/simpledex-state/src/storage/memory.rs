use super::{Staged, Storage};
use crate::error::StateError;

/// In-memory storage
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    inner: Staged,
}

impl MemoryStorage {
    pub fn new() -> Self {
        MemoryStorage::default()
    }

    /// Number of committed keys
    pub fn len(&self) -> usize {
        self.inner.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.data.is_empty()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.inner.get(key)
    }

    fn put(&mut self, key: &[u8], value: &[u8]) {
        self.inner.stage(key, Some(value));
    }

    fn delete(&mut self, key: &[u8]) {
        self.inner.stage(key, None);
    }

    fn commit(&mut self) -> Result<(), StateError> {
        self.inner.apply();
        Ok(())
    }

    fn rollback(&mut self) {
        self.inner.discard();
    }

    fn keys_with_prefix(&self, prefix: &[u8]) -> Vec<Vec<u8>> {
        self.inner.keys_with_prefix(prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staged_writes_visible_until_rollback() {
        let mut storage = MemoryStorage::new();

        storage.put(b"pool:1", b"reserves");
        assert_eq!(storage.get(b"pool:1"), Some(b"reserves".to_vec()));
        assert!(storage.is_empty());

        storage.rollback();
        assert_eq!(storage.get(b"pool:1"), None);
    }

    #[test]
    fn test_delete_then_rollback() {
        let mut storage = MemoryStorage::new();
        storage.put(b"acc:1", b"alice");
        storage.commit().unwrap();

        storage.delete(b"acc:1");
        assert!(!storage.exists(b"acc:1"));
        assert!(storage.keys_with_prefix(b"acc:").is_empty());

        storage.rollback();
        assert!(storage.exists(b"acc:1"));

        storage.delete(b"acc:1");
        storage.commit().unwrap();
        assert_eq!(storage.len(), 0);
    }

    #[test]
    fn test_prefix_query_merges_staged_and_committed() {
        let mut storage = MemoryStorage::new();
        storage.put(b"acc:1", b"alice");
        storage.put(b"pool:1", b"ab");
        storage.commit().unwrap();
        storage.put(b"acc:2", b"bob");

        let keys = storage.keys_with_prefix(b"acc:");
        assert_eq!(keys, vec![b"acc:1".to_vec(), b"acc:2".to_vec()]);
    }
}
