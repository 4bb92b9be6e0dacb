use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use kestrel_core::{serialize, Account, Address, PersistedTransaction, RoundEntry, TransactionId};
use parking_lot::Mutex;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::StateError;
use crate::storage::{Storage, WriteSet};

/// Key layout of ledger entities
pub mod keys {
    use kestrel_core::{Address, TransactionId};

    pub const ACCOUNT: &[u8] = b"acc:";
    pub const TRANSACTION: &[u8] = b"tx:";
    pub const ROUND: &[u8] = b"rnd:";

    pub fn account(address: &Address) -> Vec<u8> {
        [ACCOUNT, &address.to_be_bytes()[..]].concat()
    }

    pub fn transaction(id: &TransactionId) -> Vec<u8> {
        [TRANSACTION, &id.as_bytes()[..]].concat()
    }

    /// Entries are keyed by their ledger-wide recording sequence, so prefix
    /// scans return them in recording order
    pub fn round(sequence: u64) -> Vec<u8> {
        [ROUND, &sequence.to_be_bytes()[..]].concat()
    }

    pub(crate) fn round_sequence(key: &[u8]) -> Option<u64> {
        let bytes = key.strip_prefix(ROUND)?;
        Some(u64::from_be_bytes(bytes.try_into().ok()?))
    }
}

/// Caller-owned transactional context.
///
/// Overlays finalized against the same context stage their writes here
/// instead of in storage. Reads through the context see those staged writes,
/// so several processor calls compose into one atomic commit performed by
/// [`LedgerStorage::commit_transaction`].
#[derive(Debug, Clone, Default)]
pub struct DbTransaction {
    staged: Arc<Mutex<WriteSet>>,
}

impl DbTransaction {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self, key: &[u8]) -> Option<Option<Vec<u8>>> {
        self.staged
            .lock()
            .get(key)
            .map(|value| value.map(<[u8]>::to_vec))
    }

    fn stage(&self, writes: WriteSet) {
        self.staged.lock().merge(writes);
    }

    fn take(&self) -> WriteSet {
        std::mem::take(&mut *self.staged.lock())
    }

    /// Number of staged keys
    pub fn len(&self) -> usize {
        self.staged.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.lock().is_empty()
    }
}

/// Persistent ledger state as seen by the transaction processor
#[async_trait]
pub trait LedgerStorage: Send + Sync {
    /// Existing accounts among `addresses`; unknown addresses are omitted
    async fn get_accounts(
        &self,
        addresses: &[Address],
        tx: Option<&DbTransaction>,
    ) -> Result<Vec<Account>, StateError>;

    /// Confirmed transactions among `ids`, in one round trip
    async fn get_transactions_by_id(
        &self,
        ids: &[TransactionId],
        tx: Option<&DbTransaction>,
    ) -> Result<Vec<PersistedTransaction>, StateError>;

    /// Persist `writes` atomically, or stage them into `tx` when given
    async fn write(&self, writes: WriteSet, tx: Option<&DbTransaction>) -> Result<(), StateError>;

    /// Atomically commit everything staged in `tx`
    async fn commit_transaction(&self, tx: DbTransaction) -> Result<(), StateError>;

    /// Reserve `count` consecutive round entry sequence numbers and return
    /// the first. Numbers are never handed out twice, even when the writes
    /// using them are later discarded.
    async fn reserve_round_sequence(&self, count: u64) -> Result<u64, StateError>;
}

/// [`LedgerStorage`] over a key/value [`Storage`] backend
pub struct Ledger<S: Storage> {
    storage: RwLock<S>,
    next_round: AtomicU64,
}

impl<S: Storage> Ledger<S> {
    pub fn new(storage: S) -> Self {
        let next_round = storage
            .keys_with_prefix(keys::ROUND)
            .iter()
            .filter_map(|key| keys::round_sequence(key))
            .max()
            .map_or(0, |last| last + 1);
        debug!("Round entries resume at sequence {}", next_round);

        Ledger {
            storage: RwLock::new(storage),
            next_round: AtomicU64::new(next_round),
        }
    }

    async fn read(&self, key: &[u8], tx: Option<&DbTransaction>) -> Option<Vec<u8>> {
        if let Some(staged) = tx.and_then(|tx| tx.read(key)) {
            return staged;
        }
        self.storage.read().await.get(key)
    }

    async fn apply(&self, writes: WriteSet) -> Result<(), StateError> {
        let mut storage = self.storage.write().await;
        storage.stage(writes);
        if let Err(e) = storage.commit() {
            storage.rollback();
            return Err(e);
        }
        Ok(())
    }

    /// Write initial account balances, e.g. from a genesis configuration
    pub async fn seed_accounts(&self, accounts: &[Account]) -> Result<(), StateError> {
        let mut writes = WriteSet::new();
        for account in accounts {
            writes.put(keys::account(&account.address), serialize::to_bytes(account)?);
        }
        self.apply(writes).await
    }

    /// Every committed account, in address order
    pub async fn accounts(&self) -> Result<Vec<Account>, StateError> {
        self.decode_prefix(keys::ACCOUNT).await
    }

    /// Every committed round entry, in recording order
    pub async fn round_entries(&self) -> Result<Vec<RoundEntry>, StateError> {
        self.decode_prefix(keys::ROUND).await
    }

    async fn decode_prefix<T: serde::de::DeserializeOwned>(
        &self,
        prefix: &[u8],
    ) -> Result<Vec<T>, StateError> {
        let storage = self.storage.read().await;
        storage
            .keys_with_prefix(prefix)
            .iter()
            .filter_map(|key| storage.get(key))
            .map(|bytes| serialize::from_bytes(&bytes).map_err(StateError::from))
            .collect()
    }
}

#[async_trait]
impl<S: Storage> LedgerStorage for Ledger<S> {
    async fn get_accounts(
        &self,
        addresses: &[Address],
        tx: Option<&DbTransaction>,
    ) -> Result<Vec<Account>, StateError> {
        let mut accounts = Vec::with_capacity(addresses.len());
        for address in addresses {
            if let Some(bytes) = self.read(&keys::account(address), tx).await {
                accounts.push(serialize::from_bytes(&bytes)?);
            }
        }
        Ok(accounts)
    }

    async fn get_transactions_by_id(
        &self,
        ids: &[TransactionId],
        tx: Option<&DbTransaction>,
    ) -> Result<Vec<PersistedTransaction>, StateError> {
        let mut found = Vec::new();
        for id in ids {
            if let Some(bytes) = self.read(&keys::transaction(id), tx).await {
                found.push(serialize::from_bytes(&bytes)?);
            }
        }
        debug!("Found {} of {} transactions in ledger", found.len(), ids.len());
        Ok(found)
    }

    async fn write(&self, writes: WriteSet, tx: Option<&DbTransaction>) -> Result<(), StateError> {
        match tx {
            Some(tx) => {
                debug!("Staging {} ledger writes into transaction", writes.len());
                tx.stage(writes);
                Ok(())
            }
            None => {
                debug!("Committing {} ledger writes", writes.len());
                self.apply(writes).await
            }
        }
    }

    async fn commit_transaction(&self, tx: DbTransaction) -> Result<(), StateError> {
        let writes = tx.take();
        debug!("Committing transaction with {} ledger writes", writes.len());
        self.apply(writes).await
    }

    async fn reserve_round_sequence(&self, count: u64) -> Result<u64, StateError> {
        Ok(self.next_round.fetch_add(count, Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use kestrel_core::{hash_blake3, KeyPair, TransactionKind};

    fn persisted(seed: &[u8]) -> PersistedTransaction {
        PersistedTransaction {
            id: TransactionId(hash_blake3(seed)),
            kind: TransactionKind::Transfer,
            sender_public_key: KeyPair::generate().public,
            timestamp: 10,
            fee: 1,
            payload: seed.to_vec(),
        }
    }

    #[tokio::test]
    async fn test_get_accounts_skips_unknown() {
        let ledger = Ledger::new(MemoryStorage::new());
        ledger
            .seed_accounts(&[Account::with_balance(Address(1), 50)])
            .await
            .unwrap();

        let accounts = ledger
            .get_accounts(&[Address(1), Address(2)], None)
            .await
            .unwrap();
        assert_eq!(accounts, vec![Account::with_balance(Address(1), 50)]);
    }

    #[tokio::test]
    async fn test_transaction_context_defers_commit() {
        let ledger = Ledger::new(MemoryStorage::new());
        let confirmed = persisted(b"one");

        let mut writes = WriteSet::new();
        writes.put(
            keys::transaction(&confirmed.id),
            serialize::to_bytes(&confirmed).unwrap(),
        );

        let tx = DbTransaction::new();
        ledger.write(writes, Some(&tx)).await.unwrap();
        assert_eq!(tx.len(), 1);

        // Visible through the context, invisible outside it
        let inside = ledger
            .get_transactions_by_id(&[confirmed.id], Some(&tx))
            .await
            .unwrap();
        assert_eq!(inside, vec![confirmed.clone()]);
        let outside = ledger
            .get_transactions_by_id(&[confirmed.id], None)
            .await
            .unwrap();
        assert!(outside.is_empty());

        ledger.commit_transaction(tx).await.unwrap();
        let committed = ledger
            .get_transactions_by_id(&[confirmed.id], None)
            .await
            .unwrap();
        assert_eq!(committed, vec![confirmed]);
    }

    #[tokio::test]
    async fn test_round_sequence_resumes_after_existing_entries() {
        let mut storage = MemoryStorage::new();
        let entry = RoundEntry {
            transaction_id: TransactionId(hash_blake3(b"vote")),
            voter: Address(1),
            delegate: KeyPair::generate().public,
            delta: 40,
        };
        let mut writes = WriteSet::new();
        writes.put(keys::round(6), serialize::to_bytes(&entry).unwrap());
        storage.stage(writes);
        storage.commit().unwrap();

        let ledger = Ledger::new(storage);
        assert_eq!(ledger.reserve_round_sequence(3).await.unwrap(), 7);
        assert_eq!(ledger.reserve_round_sequence(1).await.unwrap(), 10);
        assert_eq!(ledger.round_entries().await.unwrap(), vec![entry]);
    }

    #[tokio::test]
    async fn test_corrupted_entry_is_hard_error() {
        let mut storage = MemoryStorage::new();
        let id = TransactionId(hash_blake3(b"bad"));
        let mut writes = WriteSet::new();
        writes.put(keys::transaction(&id), vec![0xff]);
        storage.stage(writes);
        storage.commit().unwrap();

        let ledger = Ledger::new(storage);
        let result = ledger.get_transactions_by_id(&[id], None).await;
        assert!(matches!(result, Err(StateError::Core(_))));
    }
}
