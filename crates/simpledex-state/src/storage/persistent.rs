use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use simpledex_core::serialize;
use tracing::debug;

use super::{Staged, Storage};
use crate::error::StateError;

/// File-backed storage using a single snapshot file
///
/// Every commit rewrites the file through a temporary file and a rename.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
    inner: Staged,
}

impl FileStorage {
    pub fn new<P: Into<PathBuf>>(path: P) -> Result<Self, StateError> {
        let path = path.into();
        let data: BTreeMap<Vec<u8>, Vec<u8>> = if path.exists() {
            let bytes = fs::read(&path).map_err(|e| StateError::Storage(e.to_string()))?;
            if bytes.is_empty() {
                BTreeMap::new()
            } else {
                serialize::from_bytes(&bytes)?
            }
        } else {
            BTreeMap::new()
        };

        Ok(FileStorage {
            path,
            inner: Staged::with_data(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush_to_disk(&self) -> Result<(), StateError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| StateError::Storage(e.to_string()))?;
        }

        let bytes = serialize::to_bytes(&self.inner.data)?;
        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, &bytes).map_err(|e| StateError::Storage(e.to_string()))?;
        fs::rename(&tmp_path, &self.path).map_err(|e| StateError::Storage(e.to_string()))?;
        debug!("Flushed {} keys to {:?}", self.inner.data.len(), self.path);
        Ok(())
    }
}

impl Storage for FileStorage {
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
        self.flush_to_disk()
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

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "simpledex-{}-{}-{}.bin",
            name,
            std::process::id(),
            rand_suffix()
        ))
    }

    fn rand_suffix() -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0)
    }

    #[test]
    fn test_commit_survives_reopen() {
        let path = temp_path("reopen");
        {
            let mut storage = FileStorage::new(&path).unwrap();
            storage.put(b"pool:1", b"reserves");
            storage.commit().unwrap();
        }

        let storage = FileStorage::new(&path).unwrap();
        assert_eq!(storage.get(b"pool:1"), Some(b"reserves".to_vec()));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_uncommitted_writes_not_persisted() {
        let path = temp_path("uncommitted");
        {
            let mut storage = FileStorage::new(&path).unwrap();
            storage.put(b"kept", b"1");
            storage.commit().unwrap();
            storage.put(b"dropped", b"2");
        }

        let storage = FileStorage::new(&path).unwrap();
        assert!(storage.exists(b"kept"));
        assert!(!storage.exists(b"dropped"));
        let _ = fs::remove_file(&path);
    }
}
