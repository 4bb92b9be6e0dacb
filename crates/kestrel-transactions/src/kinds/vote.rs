use std::collections::BTreeSet;

use kestrel_core::{Account, PublicKey, TransactionError, TransactionId, TransactionKind, VOTE_FEE};
use kestrel_state::{StateError, StateStore};
use serde::{Deserialize, Serialize};

use crate::signed::{Asset, SignedTransaction};

/// Most vote changes a single transaction may carry
pub const MAX_VOTES_PER_TRANSACTION: usize = 33;
/// Most delegates an account may vote for at once
pub const MAX_VOTES_PER_ACCOUNT: usize = 101;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteAction {
    Add,
    Remove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub delegate: PublicKey,
    pub action: VoteAction,
}

impl Vote {
    pub fn add(delegate: PublicKey) -> Self {
        Vote {
            delegate,
            action: VoteAction::Add,
        }
    }

    pub fn remove(delegate: PublicKey) -> Self {
        Vote {
            delegate,
            action: VoteAction::Remove,
        }
    }
}

/// Change the set of delegates the sender votes for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteAsset {
    pub votes: Vec<Vote>,
}

pub type VoteTransaction = SignedTransaction<VoteAsset>;

fn votes_error(id: TransactionId, message: impl Into<String>) -> TransactionError {
    TransactionError::new(message, id, ".asset.votes")
}

/// Apply `votes` to `current`, adding when `forward` and reversing otherwise
fn update_votes(
    id: TransactionId,
    current: &BTreeSet<PublicKey>,
    votes: &[Vote],
    forward: bool,
) -> Result<BTreeSet<PublicKey>, TransactionError> {
    let mut updated = current.clone();
    for vote in votes {
        let adding = (vote.action == VoteAction::Add) == forward;
        if adding && !updated.insert(vote.delegate) {
            return Err(votes_error(id, format!("{} is already voted", vote.delegate)));
        }
        if !adding && !updated.remove(&vote.delegate) {
            return Err(votes_error(id, format!("{} is not voted", vote.delegate)));
        }
    }

    if updated.len() > MAX_VOTES_PER_ACCOUNT {
        return Err(votes_error(
            id,
            format!("Vote cannot exceed {MAX_VOTES_PER_ACCOUNT} delegates"),
        ));
    }
    Ok(updated)
}

impl Asset for VoteAsset {
    const KIND: TransactionKind = TransactionKind::Vote;

    fn fee(&self) -> u64 {
        VOTE_FEE
    }

    fn validate(&self, id: TransactionId) -> Vec<TransactionError> {
        let mut errors = Vec::new();
        if self.votes.is_empty() {
            errors.push(votes_error(id, "Votes must contain at least one vote"));
        }
        if self.votes.len() > MAX_VOTES_PER_TRANSACTION {
            errors.push(votes_error(
                id,
                format!("Votes must contain at most {MAX_VOTES_PER_TRANSACTION} votes"),
            ));
        }
        let delegates: BTreeSet<&PublicKey> = self.votes.iter().map(|v| &v.delegate).collect();
        if delegates.len() != self.votes.len() {
            errors.push(votes_error(id, "Encountered duplicate delegate in votes"));
        }
        errors
    }

    fn votes(&self) -> &[Vote] {
        &self.votes
    }

    fn apply(
        &self,
        id: TransactionId,
        sender: &mut Account,
        _store: &mut StateStore,
    ) -> Result<Vec<TransactionError>, StateError> {
        Ok(match update_votes(id, &sender.votes, &self.votes, true) {
            Ok(votes) => {
                sender.votes = votes;
                Vec::new()
            }
            Err(error) => vec![error],
        })
    }

    fn undo(
        &self,
        id: TransactionId,
        sender: &mut Account,
        _store: &mut StateStore,
    ) -> Result<Vec<TransactionError>, StateError> {
        Ok(match update_votes(id, &sender.votes, &self.votes, false) {
            Ok(votes) => {
                sender.votes = votes;
                Vec::new()
            }
            Err(error) => vec![error],
        })
    }
}
