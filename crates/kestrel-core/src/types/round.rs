use serde::{Deserialize, Serialize};

use crate::crypto::PublicKey;
use crate::types::address::Address;
use crate::types::transaction::TransactionId;

/// One vote-weight change recorded for delegate round bookkeeping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundEntry {
    pub transaction_id: TransactionId,
    pub voter: Address,
    pub delegate: PublicKey,
    /// Signed change in the delegate's vote weight
    pub delta: i128,
}
