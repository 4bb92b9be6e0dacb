pub mod memory;
pub mod persistent;

use std::collections::BTreeMap;

use crate::error::StateError;

/// An ordered set of buffered writes. `None` marks a deletion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteSet {
    entries: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl WriteSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.entries.insert(key, Some(value));
    }

    pub fn delete(&mut self, key: Vec<u8>) {
        self.entries.insert(key, None);
    }

    /// `Some(None)` means the key was deleted by this write set
    pub fn get(&self, key: &[u8]) -> Option<Option<&[u8]>> {
        self.entries.get(key).map(|value| value.as_deref())
    }

    /// Layer `other` on top of this write set; later writes win
    pub fn merge(&mut self, other: WriteSet) {
        self.entries.extend(other.entries);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Vec<u8>, &Option<Vec<u8>>)> {
        self.entries.iter()
    }
}

impl IntoIterator for WriteSet {
    type Item = (Vec<u8>, Option<Vec<u8>>);
    type IntoIter = std::collections::btree_map::IntoIter<Vec<u8>, Option<Vec<u8>>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Key/value persistence underneath the ledger
pub trait Storage: Send + Sync {
    /// Read a key, seeing staged writes first
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;

    /// Stage writes until the next commit or rollback
    fn stage(&mut self, writes: WriteSet);

    /// Make staged writes durable
    fn commit(&mut self) -> Result<(), StateError>;

    /// Drop staged writes
    fn rollback(&mut self);

    fn exists(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }

    /// All live keys starting with `prefix`, in key order
    fn keys_with_prefix(&self, prefix: &[u8]) -> Vec<Vec<u8>>;
}

pub use memory::MemoryStorage;
pub use persistent::FileStorage;
