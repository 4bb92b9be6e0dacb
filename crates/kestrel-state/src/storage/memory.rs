use std::collections::BTreeMap;

use super::{Storage, WriteSet};
use crate::error::StateError;

/// In-memory storage implementation using BTreeMap
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    /// Committed data
    data: BTreeMap<Vec<u8>, Vec<u8>>,
    /// Staged writes (not yet committed)
    staged: WriteSet,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build storage whose committed contents are `data`
    pub fn from_data(data: BTreeMap<Vec<u8>, Vec<u8>>) -> Self {
        MemoryStorage {
            data,
            staged: WriteSet::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Committed contents
    pub fn data(&self) -> &BTreeMap<Vec<u8>, Vec<u8>> {
        &self.data
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        match self.staged.get(key) {
            Some(staged) => staged.map(<[u8]>::to_vec),
            None => self.data.get(key).cloned(),
        }
    }

    fn stage(&mut self, writes: WriteSet) {
        self.staged.merge(writes);
    }

    fn commit(&mut self) -> Result<(), StateError> {
        for (key, value) in std::mem::take(&mut self.staged) {
            match value {
                Some(v) => {
                    self.data.insert(key, v);
                }
                None => {
                    self.data.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn rollback(&mut self) {
        self.staged = WriteSet::new();
    }

    fn keys_with_prefix(&self, prefix: &[u8]) -> Vec<Vec<u8>> {
        let committed = self
            .data
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key);
        let staged = self
            .staged
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key);

        let mut keys: Vec<Vec<u8>> = committed
            .chain(staged)
            .filter(|key| self.exists(key))
            .cloned()
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn writes(entries: &[(&[u8], Option<&[u8]>)]) -> WriteSet {
        let mut set = WriteSet::new();
        for (key, value) in entries {
            match value {
                Some(v) => set.put(key.to_vec(), v.to_vec()),
                None => set.delete(key.to_vec()),
            }
        }
        set
    }

    #[test]
    fn test_staged_writes_visible_before_commit() {
        let mut storage = MemoryStorage::new();

        storage.stage(writes(&[(b"acc:1", Some(b"alice"))]));
        assert_eq!(storage.get(b"acc:1"), Some(b"alice".to_vec()));
        assert!(storage.is_empty());

        storage.rollback();
        assert_eq!(storage.get(b"acc:1"), None);
    }

    #[test]
    fn test_commit_and_delete() {
        let mut storage = MemoryStorage::new();
        storage.stage(writes(&[(b"acc:1", Some(b"alice"))]));
        storage.commit().unwrap();

        storage.stage(writes(&[(b"acc:1", None)]));
        assert!(!storage.exists(b"acc:1"));

        storage.rollback();
        assert!(storage.exists(b"acc:1"));

        storage.stage(writes(&[(b"acc:1", None)]));
        storage.commit().unwrap();
        assert_eq!(storage.len(), 0);
    }

    #[test]
    fn test_prefix_query_merges_staged_and_committed() {
        let mut storage = MemoryStorage::new();
        storage.stage(writes(&[
            (b"acc:1", Some(b"a")),
            (b"acc:2", Some(b"b")),
            (b"tx:1", Some(b"t")),
        ]));
        storage.commit().unwrap();

        storage.stage(writes(&[(b"acc:2", None), (b"acc:3", Some(b"c"))]));

        assert_eq!(
            storage.keys_with_prefix(b"acc:"),
            vec![b"acc:1".to_vec(), b"acc:3".to_vec()]
        );
    }
}
