use kestrel_core::{Account, RoundEntry, TransactionKind};
use kestrel_state::{StateError, StateStore};
use kestrel_transactions::{Transaction, VoteAction};

/// Delegate round bookkeeping fed once per processed transaction
pub trait RoundAccumulator: Send + Sync {
    /// Called with the overlay as it is right after `transaction` applied
    fn on_apply(
        &self,
        store: &mut StateStore,
        transaction: &dyn Transaction,
    ) -> Result<(), StateError>;

    /// Called with the overlay as it is right after `transaction` was undone
    fn on_undo(
        &self,
        store: &mut StateStore,
        transaction: &dyn Transaction,
    ) -> Result<(), StateError>;
}

/// Records vote-weight changes caused by vote transactions.
///
/// The weight of a vote is the voter's balance once the vote has been
/// applied, fee already paid. Undo records exactly the negation of what the
/// matching apply recorded.
#[derive(Debug, Clone, Default)]
pub struct RoundsInformation;

impl RoundsInformation {
    fn record(
        store: &mut StateStore,
        transaction: &dyn Transaction,
        sign: i128,
        weight: impl FnOnce(&Account) -> i128,
    ) -> Result<(), StateError> {
        if transaction.kind() != TransactionKind::Vote {
            return Ok(());
        }
        let voter = store.get_or_default_account(&transaction.sender_address())?;
        let weight = weight(&voter);

        for vote in transaction.votes() {
            let direction = match vote.action {
                VoteAction::Add => 1,
                VoteAction::Remove => -1,
            };
            store.add_round_entry(RoundEntry {
                transaction_id: transaction.id(),
                voter: voter.address,
                delegate: vote.delegate,
                delta: sign * direction * weight,
            });
        }
        Ok(())
    }
}

impl RoundAccumulator for RoundsInformation {
    fn on_apply(
        &self,
        store: &mut StateStore,
        transaction: &dyn Transaction,
    ) -> Result<(), StateError> {
        Self::record(store, transaction, 1, |voter| i128::from(voter.balance))
    }

    fn on_undo(
        &self,
        store: &mut StateStore,
        transaction: &dyn Transaction,
    ) -> Result<(), StateError> {
        // The fee has been refunded by now
        let fee = i128::from(transaction.fee());
        Self::record(store, transaction, -1, |voter| i128::from(voter.balance) - fee)
    }
}

/// Accumulator that records nothing
#[derive(Debug, Clone, Default)]
pub struct NoopRounds;

impl RoundAccumulator for NoopRounds {
    fn on_apply(
        &self,
        _store: &mut StateStore,
        _transaction: &dyn Transaction,
    ) -> Result<(), StateError> {
        Ok(())
    }

    fn on_undo(
        &self,
        _store: &mut StateStore,
        _transaction: &dyn Transaction,
    ) -> Result<(), StateError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_core::{Address, KeyPair, VOTE_FEE};
    use kestrel_state::{Ledger, MemoryStorage};
    use kestrel_transactions::{Vote, VoteAsset, VoteTransaction};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_undo_records_inverse_of_apply() {
        let voter = KeyPair::generate();
        let voter_address = Address::from_public_key(&voter.public);
        let up = KeyPair::generate().public;
        let down = KeyPair::generate().public;

        let mut account = Account::with_balance(voter_address, 5 * VOTE_FEE);
        account.votes.insert(down);
        let ledger = Arc::new(Ledger::new(MemoryStorage::new()));
        ledger.seed_accounts(&[account]).await.unwrap();
        let mut store = StateStore::read_only(ledger);

        let asset = VoteAsset {
            votes: vec![Vote::add(up), Vote::remove(down)],
        };
        let tx = VoteTransaction::new_signed(1, asset, &voter.secret).unwrap();
        tx.prepare(&store).await.unwrap();

        assert!(tx.apply(&mut store).unwrap().is_ok());
        RoundsInformation.on_apply(&mut store, &tx).unwrap();
        assert!(tx.undo(&mut store).unwrap().is_ok());
        RoundsInformation.on_undo(&mut store, &tx).unwrap();

        let weight = i128::from(4 * VOTE_FEE);
        let deltas: Vec<i128> = store.round_entries().iter().map(|e| e.delta).collect();
        assert_eq!(deltas, vec![weight, -weight, -weight, weight]);
        assert_eq!(deltas.iter().sum::<i128>(), 0);
        assert_eq!(store.round_entries()[0].delegate, up);
        assert_eq!(store.round_entries()[0].voter, voter_address);
    }

    #[tokio::test]
    async fn test_transfers_are_ignored() {
        let sender = KeyPair::generate();
        let ledger = Arc::new(Ledger::new(MemoryStorage::new()));
        let mut store = StateStore::read_only(ledger);

        let tx = kestrel_transactions::TransferTransaction::new_signed(
            1,
            kestrel_transactions::TransferAsset::new(Address(3), 1),
            &sender.secret,
        )
        .unwrap();
        tx.prepare(&store).await.unwrap();

        RoundsInformation.on_apply(&mut store, &tx).unwrap();
        assert!(store.round_entries().is_empty());
    }
}
