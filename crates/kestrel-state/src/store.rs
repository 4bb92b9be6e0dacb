use std::collections::BTreeMap;
use std::sync::Arc;

use kestrel_core::{serialize, Account, Address, PersistedTransaction, RoundEntry};
use parking_lot::RwLock;
use tracing::debug;

use crate::error::StateError;
use crate::ledger::{keys, DbTransaction, LedgerStorage};
use crate::storage::WriteSet;

/// How an overlay is opened
#[derive(Debug, Clone, Default)]
pub struct StoreOptions {
    /// Whether the overlay may be finalized into storage
    pub mutable: bool,
    /// Transactional context that reads and the final write go through
    pub tx: Option<DbTransaction>,
}

/// Everything written through the overlay since it was opened
#[derive(Debug, Clone, Default)]
struct Mutations {
    accounts: BTreeMap<Address, Account>,
    rounds: Vec<RoundEntry>,
    transactions: Vec<PersistedTransaction>,
}

/// Saved copy of an overlay's mutation buffer, consumed by
/// [`StateStore::restore`]
#[derive(Debug)]
#[must_use = "a checkpoint does nothing unless restored"]
pub struct Checkpoint {
    mutations: Mutations,
}

/// Buffered view over ledger state for one processing call.
///
/// Reads fall through the mutation buffer to a cache that `prepare` fills
/// from storage. The cache is filled through `&self` so that every
/// transaction in a batch can prepare concurrently; mutation needs
/// `&mut self` and therefore happens strictly one transaction at a time.
pub struct StateStore {
    storage: Arc<dyn LedgerStorage>,
    options: StoreOptions,
    /// `None` records an address known to have no account
    cache: RwLock<BTreeMap<Address, Option<Account>>>,
    mutations: Mutations,
}

impl StateStore {
    pub fn new(storage: Arc<dyn LedgerStorage>, options: StoreOptions) -> Self {
        StateStore {
            storage,
            options,
            cache: RwLock::new(BTreeMap::new()),
            mutations: Mutations::default(),
        }
    }

    /// Overlay whose buffered writes are never committed
    pub fn read_only(storage: Arc<dyn LedgerStorage>) -> Self {
        Self::new(storage, StoreOptions::default())
    }

    pub fn is_mutable(&self) -> bool {
        self.options.mutable
    }

    pub fn db_transaction(&self) -> Option<&DbTransaction> {
        self.options.tx.as_ref()
    }

    /// Load the accounts behind `addresses` that are not cached yet
    pub async fn cache_accounts(&self, addresses: &[Address]) -> Result<(), StateError> {
        let missing: Vec<Address> = {
            let cache = self.cache.read();
            let mut missing: Vec<Address> = addresses
                .iter()
                .filter(|address| !cache.contains_key(*address))
                .copied()
                .collect();
            missing.sort();
            missing.dedup();
            missing
        };
        if missing.is_empty() {
            return Ok(());
        }

        let found = self
            .storage
            .get_accounts(&missing, self.options.tx.as_ref())
            .await?;

        let mut cache = self.cache.write();
        for address in &missing {
            cache.entry(*address).or_insert(None);
        }
        for account in found {
            cache.insert(account.address, Some(account));
        }
        Ok(())
    }

    fn lookup(&self, address: &Address) -> Result<Option<Account>, StateError> {
        if let Some(account) = self.mutations.accounts.get(address) {
            return Ok(Some(account.clone()));
        }
        self.cache
            .read()
            .get(address)
            .cloned()
            .ok_or(StateError::AccountNotCached(*address))
    }

    /// Current account state; fails if the account does not exist
    pub fn get_account(&self, address: &Address) -> Result<Account, StateError> {
        self.lookup(address)?
            .ok_or(StateError::AccountNotFound(*address))
    }

    /// Current account state, or a fresh empty account for a new address
    pub fn get_or_default_account(&self, address: &Address) -> Result<Account, StateError> {
        Ok(self
            .lookup(address)?
            .unwrap_or_else(|| Account::new(*address)))
    }

    pub fn set_account(&mut self, account: Account) {
        self.mutations.accounts.insert(account.address, account);
    }

    /// Accounts written through this overlay, in address order
    pub fn updated_accounts(&self) -> impl Iterator<Item = &Account> {
        self.mutations.accounts.values()
    }

    pub fn add_round_entry(&mut self, entry: RoundEntry) {
        self.mutations.rounds.push(entry);
    }

    pub fn round_entries(&self) -> &[RoundEntry] {
        &self.mutations.rounds
    }

    /// Record a transaction as newly processed by this batch
    pub fn add_transaction(&mut self, transaction: PersistedTransaction) {
        self.mutations.transactions.push(transaction);
    }

    pub fn transactions(&self) -> &[PersistedTransaction] {
        &self.mutations.transactions
    }

    pub fn snapshot(&self) -> Checkpoint {
        Checkpoint {
            mutations: self.mutations.clone(),
        }
    }

    /// Drop every mutation made since `checkpoint` was taken
    pub fn restore(&mut self, checkpoint: Checkpoint) {
        self.mutations = checkpoint.mutations;
    }

    /// Serialize the mutation buffer. Round entries take consecutive
    /// sequence numbers starting at `first_round`.
    fn write_set(&self, first_round: u64) -> Result<WriteSet, StateError> {
        let mut writes = WriteSet::new();
        for (address, account) in &self.mutations.accounts {
            writes.put(keys::account(address), serialize::to_bytes(account)?);
        }
        for (sequence, entry) in (first_round..).zip(&self.mutations.rounds) {
            writes.put(keys::round(sequence), serialize::to_bytes(entry)?);
        }
        for transaction in &self.mutations.transactions {
            writes.put(
                keys::transaction(&transaction.id),
                serialize::to_bytes(transaction)?,
            );
        }
        Ok(writes)
    }

    /// Hand the buffered mutations to storage. With a transactional context
    /// they are staged there; otherwise they are committed atomically.
    pub async fn finalize(self) -> Result<(), StateError> {
        if !self.options.mutable {
            return Err(StateError::ImmutableStore);
        }
        let first_round = match self.mutations.rounds.len() {
            0 => 0,
            count => self.storage.reserve_round_sequence(count as u64).await?,
        };
        let writes = self.write_set(first_round)?;
        debug!(
            "Finalizing state store: {} accounts, {} round entries, {} transactions",
            self.mutations.accounts.len(),
            self.mutations.rounds.len(),
            self.mutations.transactions.len()
        );
        self.storage
            .write(writes, self.options.tx.as_ref())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Ledger;
    use crate::storage::MemoryStorage;
    use kestrel_core::{hash_blake3, KeyPair, TransactionId, TransactionKind};

    async fn seeded_ledger(accounts: &[Account]) -> Arc<Ledger<MemoryStorage>> {
        let ledger = Arc::new(Ledger::new(MemoryStorage::new()));
        ledger.seed_accounts(accounts).await.unwrap();
        ledger
    }

    fn mutating(ledger: Arc<Ledger<MemoryStorage>>, tx: Option<DbTransaction>) -> StateStore {
        StateStore::new(ledger, StoreOptions { mutable: true, tx })
    }

    #[tokio::test]
    async fn test_unprepared_account_is_error() {
        let ledger = seeded_ledger(&[Account::with_balance(Address(1), 10)]).await;
        let store = StateStore::read_only(ledger);

        assert!(matches!(
            store.get_account(&Address(1)),
            Err(StateError::AccountNotCached(_))
        ));
    }

    #[tokio::test]
    async fn test_prepared_absent_account_defaults() {
        let ledger = seeded_ledger(&[Account::with_balance(Address(1), 10)]).await;
        let store = StateStore::read_only(ledger);
        store.cache_accounts(&[Address(1), Address(2)]).await.unwrap();

        assert_eq!(store.get_account(&Address(1)).unwrap().balance, 10);
        assert!(matches!(
            store.get_account(&Address(2)),
            Err(StateError::AccountNotFound(_))
        ));
        assert_eq!(
            store.get_or_default_account(&Address(2)).unwrap(),
            Account::new(Address(2))
        );
    }

    #[tokio::test]
    async fn test_concurrent_caching() {
        let ledger = seeded_ledger(&[
            Account::with_balance(Address(1), 10),
            Account::with_balance(Address(2), 20),
        ])
        .await;
        let store = StateStore::read_only(ledger);

        let (a, b) = tokio::join!(
            store.cache_accounts(&[Address(1), Address(2)]),
            store.cache_accounts(&[Address(2)])
        );
        a.unwrap();
        b.unwrap();

        assert_eq!(store.get_account(&Address(2)).unwrap().balance, 20);
    }

    #[tokio::test]
    async fn test_snapshot_restore_discards_mutations() {
        let ledger = seeded_ledger(&[Account::with_balance(Address(1), 10)]).await;
        let mut store = StateStore::read_only(ledger);
        store.cache_accounts(&[Address(1)]).await.unwrap();

        let checkpoint = store.snapshot();
        store.set_account(Account::with_balance(Address(1), 99));
        store.add_round_entry(RoundEntry {
            transaction_id: TransactionId(hash_blake3(b"v")),
            voter: Address(1),
            delegate: KeyPair::generate().public,
            delta: 99,
        });
        assert_eq!(store.get_account(&Address(1)).unwrap().balance, 99);

        store.restore(checkpoint);
        assert_eq!(store.get_account(&Address(1)).unwrap().balance, 10);
        assert!(store.round_entries().is_empty());
        assert_eq!(store.updated_accounts().count(), 0);
    }

    #[tokio::test]
    async fn test_read_only_store_cannot_finalize() {
        let ledger = seeded_ledger(&[]).await;
        let store = StateStore::read_only(ledger);
        assert!(matches!(
            store.finalize().await,
            Err(StateError::ImmutableStore)
        ));
    }

    #[tokio::test]
    async fn test_finalize_commits_accounts_and_transactions() {
        let ledger = seeded_ledger(&[Account::with_balance(Address(1), 10)]).await;
        let mut store = mutating(ledger.clone(), None);
        store.cache_accounts(&[Address(1)]).await.unwrap();

        store.set_account(Account::with_balance(Address(1), 4));
        let processed = PersistedTransaction {
            id: TransactionId(hash_blake3(b"t")),
            kind: TransactionKind::Transfer,
            sender_public_key: KeyPair::generate().public,
            timestamp: 1,
            fee: 6,
            payload: vec![],
        };
        store.add_transaction(processed.clone());
        store.finalize().await.unwrap();

        let accounts = ledger.get_accounts(&[Address(1)], None).await.unwrap();
        assert_eq!(accounts[0].balance, 4);
        let confirmed = ledger
            .get_transactions_by_id(&[processed.id], None)
            .await
            .unwrap();
        assert_eq!(confirmed, vec![processed]);
    }

    #[tokio::test]
    async fn test_overlays_compose_through_transaction_context() {
        let ledger = seeded_ledger(&[Account::with_balance(Address(1), 10)]).await;
        let tx = DbTransaction::new();

        let mut first = mutating(ledger.clone(), Some(tx.clone()));
        first.cache_accounts(&[Address(1)]).await.unwrap();
        first.set_account(Account::with_balance(Address(1), 7));
        first.finalize().await.unwrap();

        // A second overlay in the same context reads the staged balance
        let second = mutating(ledger.clone(), Some(tx.clone()));
        second.cache_accounts(&[Address(1)]).await.unwrap();
        assert_eq!(second.get_account(&Address(1)).unwrap().balance, 7);

        let outside = ledger.get_accounts(&[Address(1)], None).await.unwrap();
        assert_eq!(outside[0].balance, 10);

        ledger.commit_transaction(tx).await.unwrap();
        let committed = ledger.get_accounts(&[Address(1)], None).await.unwrap();
        assert_eq!(committed[0].balance, 7);
    }
}
