use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use kestrel_core::serialize;
use tracing::debug;

use super::{MemoryStorage, Storage, WriteSet};
use crate::error::StateError;

/// File-backed storage using a single snapshot file.
///
/// Every commit rewrites the whole snapshot through a temporary file and an
/// atomic rename, so a crash leaves either the old or the new contents.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
    inner: MemoryStorage,
}

impl FileStorage {
    pub fn open<P: Into<PathBuf>>(path: P) -> Result<Self, StateError> {
        let path = path.into();
        let data: BTreeMap<Vec<u8>, Vec<u8>> = match fs::read(&path) {
            Ok(bytes) if bytes.is_empty() => BTreeMap::new(),
            Ok(bytes) => serialize::from_bytes(&bytes)
                .map_err(|e| StateError::Serialization(e.to_string()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(StateError::Storage(e.to_string())),
        };

        debug!("Opened ledger snapshot {:?} with {} keys", path, data.len());

        Ok(FileStorage {
            path,
            inner: MemoryStorage::from_data(data),
        })
    }

    fn flush_to_disk(&self) -> Result<(), StateError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| StateError::Storage(e.to_string()))?;
        }

        let bytes = serialize::to_bytes(self.inner.data())
            .map_err(|e| StateError::Serialization(e.to_string()))?;
        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, &bytes).map_err(|e| StateError::Storage(e.to_string()))?;
        fs::rename(&tmp_path, &self.path).map_err(|e| StateError::Storage(e.to_string()))?;
        Ok(())
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.inner.get(key)
    }

    fn stage(&mut self, writes: WriteSet) {
        self.inner.stage(writes);
    }

    fn commit(&mut self) -> Result<(), StateError> {
        self.inner.commit()?;
        self.flush_to_disk()
    }

    fn rollback(&mut self) {
        self.inner.rollback();
    }

    fn keys_with_prefix(&self, prefix: &[u8]) -> Vec<Vec<u8>> {
        self.inner.keys_with_prefix(prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.bin");

        let mut storage = FileStorage::open(&path).unwrap();
        let mut writes = WriteSet::new();
        writes.put(b"acc:7".to_vec(), b"seven".to_vec());
        storage.stage(writes);
        storage.commit().unwrap();

        let reopened = FileStorage::open(&path).unwrap();
        assert_eq!(reopened.get(b"acc:7"), Some(b"seven".to_vec()));
    }

    #[test]
    fn test_uncommitted_writes_not_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ledger.bin");

        let mut storage = FileStorage::open(&path).unwrap();
        let mut writes = WriteSet::new();
        writes.put(b"acc:7".to_vec(), b"seven".to_vec());
        storage.stage(writes);

        let reopened = FileStorage::open(&path).unwrap();
        assert!(!reopened.exists(b"acc:7"));
    }
}
