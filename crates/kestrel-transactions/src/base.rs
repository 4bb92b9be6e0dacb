use std::fmt;

use async_trait::async_trait;
use kestrel_core::{
    sign, Address, CoreError, PersistedTransaction, PublicKey, SecretKey, Sig, TransactionId,
    TransactionKind, TransactionResponse,
};
use kestrel_state::{StateError, StateStore};
use serde::{Deserialize, Serialize};

use crate::kinds::Vote;

/// A co-signature submitted for a multisignature transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureObject {
    pub transaction_id: TransactionId,
    pub public_key: PublicKey,
    pub signature: Sig,
}

impl SignatureObject {
    /// Co-sign `transaction_id` as the keysgroup member owning `member`
    pub fn new(transaction_id: TransactionId, member: &SecretKey) -> Self {
        SignatureObject {
            transaction_id,
            public_key: member.public_key(),
            signature: sign(member, transaction_id.as_bytes()),
        }
    }
}

/// Lifecycle contract every transaction kind implements.
///
/// Business-rule failures are reported in the returned
/// [`TransactionResponse`]; `Err` is reserved for infrastructural failures
/// such as reading an account that `prepare` never loaded.
#[async_trait]
pub trait Transaction: Send + Sync + fmt::Debug {
    fn id(&self) -> TransactionId;

    fn kind(&self) -> TransactionKind;

    /// Seconds since the chain epoch
    fn timestamp(&self) -> u32;

    fn sender_public_key(&self) -> &PublicKey;

    /// Fee debited from the sender on apply
    fn fee(&self) -> u64;

    fn sender_address(&self) -> Address {
        Address::from_public_key(self.sender_public_key())
    }

    /// Delegate vote changes carried by the transaction
    fn votes(&self) -> &[Vote] {
        &[]
    }

    /// Ledger record of this transaction
    fn to_persisted(&self) -> Result<PersistedTransaction, CoreError>;

    /// Stateless structural and signature checks
    fn validate(&self) -> TransactionResponse;

    /// Load every piece of state `apply`/`undo` will touch. Must only read.
    async fn prepare(&self, store: &StateStore) -> Result<(), StateError>;

    fn apply(&self, store: &mut StateStore) -> Result<TransactionResponse, StateError>;

    fn undo(&self, store: &mut StateStore) -> Result<TransactionResponse, StateError>;

    /// Attach a co-signature from a member of the sender's keysgroup
    fn add_multisignature(
        &mut self,
        store: &mut StateStore,
        signature: &SignatureObject,
    ) -> Result<TransactionResponse, StateError>;
}
