use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crypto::{Hash, PublicKey};
use crate::error::CoreError;

/// Fixed fee of a transfer, in base units
pub const TRANSFER_FEE: u64 = 10_000_000;
/// Fixed fee of a vote
pub const VOTE_FEE: u64 = 100_000_000;
/// Fee per keysgroup member (plus one) when registering a multisignature account
pub const MULTISIGNATURE_FEE: u64 = 500_000_000;

/// Transaction identifier: Blake3 digest of the canonical signed bytes
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct TransactionId(pub Hash);

impl TransactionId {
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }

    pub fn from_hex(s: &str) -> Result<Self, CoreError> {
        Ok(TransactionId(Hash::from_hex(s)?))
    }
}

impl fmt::Debug for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransactionId({})", self.0.to_hex())
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_hex())
    }
}

/// Numeric transaction type as recorded on chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TransactionKind {
    Transfer = 0,
    Vote = 3,
    Multisignature = 4,
}

impl TryFrom<u8> for TransactionKind {
    type Error = CoreError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(TransactionKind::Transfer),
            3 => Ok(TransactionKind::Vote),
            4 => Ok(TransactionKind::Multisignature),
            other => Err(CoreError::UnknownKind(other)),
        }
    }
}

/// A confirmed transaction as stored in the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedTransaction {
    pub id: TransactionId,
    pub kind: TransactionKind,
    pub sender_public_key: PublicKey,
    pub timestamp: u32,
    pub fee: u64,
    /// Canonical encoding of the full transaction
    pub payload: Vec<u8>,
}
