use std::sync::Arc;

use anyhow::Result;
use kestrel_chain::TransactionProcessor;
use kestrel_core::{Account, TransactionResponse};
use kestrel_state::{FileStorage, Ledger};
use kestrel_transactions::{SignatureObject, Transaction};
use tracing::{info, warn};

use crate::config::NodeConfig;

/// A ledger on disk and the processor running batches against it
pub struct Node {
    ledger: Arc<Ledger<FileStorage>>,
    processor: TransactionProcessor,
}

impl Node {
    /// Open the node's ledger, writing genesis accounts into an empty one
    pub async fn open(config: &NodeConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;
        let storage = FileStorage::open(config.ledger_path())?;
        let ledger = Arc::new(Ledger::new(storage));

        if ledger.accounts().await?.is_empty() {
            let genesis = config.genesis_accounts()?;
            info!("Writing {} genesis accounts", genesis.len());
            ledger.seed_accounts(&genesis).await?;
        }

        let processor = TransactionProcessor::new(ledger.clone(), &config.processor);
        Ok(Node { ledger, processor })
    }

    pub fn validate(&self, transactions: &[Box<dyn Transaction>]) -> Vec<TransactionResponse> {
        self.processor.validate_transactions(transactions)
    }

    /// Already-confirmed check followed by a dry run
    pub async fn verify(
        &self,
        transactions: &[Box<dyn Transaction>],
    ) -> Result<Vec<TransactionResponse>> {
        let persisted = self
            .processor
            .check_persisted_transactions(transactions)
            .await?;
        let verified = self.processor.verify_transactions(transactions).await?;

        Ok(persisted
            .into_iter()
            .zip(verified)
            .map(|(persisted, verified)| if persisted.is_ok() { verified } else { persisted })
            .collect())
    }

    /// Apply a batch, committing only when every transaction succeeded
    pub async fn apply(
        &self,
        transactions: &[Box<dyn Transaction>],
    ) -> Result<(Vec<TransactionResponse>, bool)> {
        let persisted = self
            .processor
            .check_persisted_transactions(transactions)
            .await?;
        if persisted.iter().any(|r| !r.is_ok()) {
            warn!("Batch contains confirmed transactions; nothing applied");
            return Ok((persisted, false));
        }

        let batch = self.processor.apply_transactions(transactions, None).await?;
        let committed = Self::commit_if_ok(&batch.transactions_responses);
        if committed {
            batch.state_store.finalize().await?;
            info!("Committed {} transactions", transactions.len());
        }
        Ok((batch.transactions_responses, committed))
    }

    /// Undo a batch, committing only when every undo succeeded
    pub async fn undo(
        &self,
        transactions: &[Box<dyn Transaction>],
    ) -> Result<(Vec<TransactionResponse>, bool)> {
        let batch = self.processor.undo_transactions(transactions, None).await?;
        let committed = Self::commit_if_ok(&batch.transactions_responses);
        if committed {
            batch.state_store.finalize().await?;
            info!("Reverted {} transactions", transactions.len());
        }
        Ok((batch.transactions_responses, committed))
    }

    pub async fn process_signature(
        &self,
        transaction: &mut dyn Transaction,
        signature: &SignatureObject,
    ) -> Result<TransactionResponse> {
        Ok(self
            .processor
            .process_signature(transaction, signature)
            .await?)
    }

    pub async fn accounts(&self) -> Result<Vec<Account>> {
        Ok(self.ledger.accounts().await?)
    }

    fn commit_if_ok(responses: &[TransactionResponse]) -> bool {
        let failed = responses.iter().filter(|r| !r.is_ok()).count();
        if failed > 0 {
            warn!("{} transactions failed; batch discarded", failed);
        }
        failed == 0
    }
}
