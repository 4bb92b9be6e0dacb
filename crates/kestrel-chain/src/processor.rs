use std::collections::HashSet;
use std::sync::Arc;

use futures_util::future::try_join_all;
use kestrel_core::{TransactionError, TransactionId, TransactionResponse};
use kestrel_state::{DbTransaction, LedgerStorage, StateError, StateStore, StoreOptions};
use kestrel_transactions::{SignatureObject, Transaction};
use tracing::{debug, info};

use crate::config::ProcessorConfig;
use crate::error::ChainError;
use crate::exceptions::ExceptionPolicy;
use crate::rounds::{RoundAccumulator, RoundsInformation};
use crate::slots::{EpochSlots, SlotClock};

/// Responses of a mutating batch together with the overlay holding its
/// uncommitted effects
pub struct ProcessedBatch {
    pub transactions_responses: Vec<TransactionResponse>,
    /// Commit with [`StateStore::finalize`] or drop to discard
    pub state_store: StateStore,
}

/// Sequences transaction lifecycle calls over state overlays
pub struct TransactionProcessor {
    storage: Arc<dyn LedgerStorage>,
    policy: ExceptionPolicy,
    slots: Arc<dyn SlotClock>,
    rounds: Arc<dyn RoundAccumulator>,
}

impl TransactionProcessor {
    /// Processor with the wall-clock slot clock and vote round bookkeeping
    pub fn new(storage: Arc<dyn LedgerStorage>, config: &ProcessorConfig) -> Self {
        Self::with_collaborators(
            storage,
            ExceptionPolicy::new(config.exceptions.clone()),
            Arc::new(EpochSlots::new(config.epoch_unix, config.slot_interval)),
            Arc::new(RoundsInformation),
        )
    }

    pub fn with_collaborators(
        storage: Arc<dyn LedgerStorage>,
        policy: ExceptionPolicy,
        slots: Arc<dyn SlotClock>,
        rounds: Arc<dyn RoundAccumulator>,
    ) -> Self {
        TransactionProcessor {
            storage,
            policy,
            slots,
            rounds,
        }
    }

    /// Stateless checks of every transaction
    pub fn validate_transactions(
        &self,
        transactions: &[Box<dyn Transaction>],
    ) -> Vec<TransactionResponse> {
        let mut responses: Vec<TransactionResponse> =
            transactions.iter().map(|tx| tx.validate()).collect();
        self.policy.override_exceptions(&mut responses, transactions);
        responses
    }

    /// Fail every transaction that is already confirmed. Exceptions do not
    /// apply here.
    pub async fn check_persisted_transactions(
        &self,
        transactions: &[Box<dyn Transaction>],
    ) -> Result<Vec<TransactionResponse>, ChainError> {
        if transactions.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<TransactionId> = transactions.iter().map(|tx| tx.id()).collect();
        let confirmed: HashSet<TransactionId> = self
            .storage
            .get_transactions_by_id(&ids, None)
            .await?
            .into_iter()
            .map(|persisted| persisted.id)
            .collect();

        Ok(ids
            .into_iter()
            .map(|id| {
                if confirmed.contains(&id) {
                    TransactionResponse::from_errors(
                        id,
                        vec![TransactionError::new(
                            format!("Transaction is already confirmed: {id}"),
                            id,
                            ".id",
                        )],
                    )
                } else {
                    TransactionResponse::ok(id)
                }
            })
            .collect())
    }

    /// Apply the batch in order to a fresh mutating overlay
    pub async fn apply_transactions(
        &self,
        transactions: &[Box<dyn Transaction>],
        tx: Option<DbTransaction>,
    ) -> Result<ProcessedBatch, ChainError> {
        info!("Applying {} transactions", transactions.len());
        let mut store = self.mutating_store(tx);
        prepare_all(&store, transactions).await?;

        let mut responses = Vec::with_capacity(transactions.len());
        for transaction in transactions {
            let response = transaction.apply(&mut store)?;
            self.rounds.on_apply(&mut store, transaction.as_ref())?;
            store.add_transaction(transaction.to_persisted()?);
            debug!("Applied {}: {:?}", transaction.id(), response.status);
            responses.push(response);
        }

        self.policy.override_exceptions(&mut responses, transactions);
        Ok(ProcessedBatch {
            transactions_responses: responses,
            state_store: store,
        })
    }

    /// Undo the batch in the given order. Callers reverting a block pass its
    /// transactions newest first.
    pub async fn undo_transactions(
        &self,
        transactions: &[Box<dyn Transaction>],
        tx: Option<DbTransaction>,
    ) -> Result<ProcessedBatch, ChainError> {
        info!("Undoing {} transactions", transactions.len());
        let mut store = self.mutating_store(tx);
        prepare_all(&store, transactions).await?;

        let mut responses = Vec::with_capacity(transactions.len());
        for transaction in transactions {
            let response = transaction.undo(&mut store)?;
            self.rounds.on_undo(&mut store, transaction.as_ref())?;
            debug!("Undid {}: {:?}", transaction.id(), response.status);
            responses.push(response);
        }

        self.policy.override_exceptions(&mut responses, transactions);
        Ok(ProcessedBatch {
            transactions_responses: responses,
            state_store: store,
        })
    }

    /// Dry-run every transaction against the same pre-batch state
    pub async fn verify_transactions(
        &self,
        transactions: &[Box<dyn Transaction>],
    ) -> Result<Vec<TransactionResponse>, ChainError> {
        info!("Verifying {} transactions", transactions.len());
        let mut store = StateStore::read_only(self.storage.clone());
        prepare_all(&store, transactions).await?;

        let current_slot = self.slots.current_slot_number();
        let mut responses = Vec::with_capacity(transactions.len());
        for transaction in transactions {
            let checkpoint = store.snapshot();
            let mut response = transaction.apply(&mut store)?;

            if self.slots.slot_number(transaction.timestamp()) > current_slot {
                response.fail_with(TransactionError::new(
                    "Invalid transaction timestamp. Timestamp is in the future",
                    transaction.id(),
                    ".timestamp",
                ));
            }
            store.restore(checkpoint);

            debug!("Verified {}: {:?}", transaction.id(), response.status);
            responses.push(response);
        }

        self.policy.override_exceptions(&mut responses, transactions);
        Ok(responses)
    }

    /// Attach a co-signature to a pending multisignature transaction
    pub async fn process_signature(
        &self,
        transaction: &mut dyn Transaction,
        signature: &SignatureObject,
    ) -> Result<TransactionResponse, ChainError> {
        let mut store = StateStore::read_only(self.storage.clone());
        transaction.prepare(&store).await?;
        Ok(transaction.add_multisignature(&mut store, signature)?)
    }

    fn mutating_store(&self, tx: Option<DbTransaction>) -> StateStore {
        StateStore::new(
            self.storage.clone(),
            StoreOptions { mutable: true, tx },
        )
    }
}

/// Load the state of every transaction concurrently
async fn prepare_all(
    store: &StateStore,
    transactions: &[Box<dyn Transaction>],
) -> Result<(), StateError> {
    try_join_all(transactions.iter().map(|tx| tx.prepare(store))).await?;
    Ok(())
}
