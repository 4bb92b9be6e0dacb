use std::collections::BTreeSet;
use std::fmt;

use async_trait::async_trait;
use kestrel_core::{
    hash_blake3, serialize, sign, verify, Account, Address, CoreError, PersistedTransaction,
    PublicKey, SecretKey, Sig, TransactionError, TransactionId, TransactionKind,
    TransactionResponse,
};
use kestrel_state::{StateError, StateStore};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::base::{SignatureObject, Transaction};
use crate::kinds::Vote;

/// Kind-specific payload and rules of a transaction
pub trait Asset: Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static {
    const KIND: TransactionKind;

    /// The exact fee a transaction carrying this asset must pay
    fn fee(&self) -> u64;

    fn validate(&self, id: TransactionId) -> Vec<TransactionError>;

    /// Accounts other than the sender that apply and undo touch
    fn related_addresses(&self) -> Vec<Address> {
        Vec::new()
    }

    /// Keysgroup whose members must all co-sign this transaction, when the
    /// asset itself registers one
    fn registering_keysgroup(&self) -> Option<&[PublicKey]> {
        None
    }

    fn votes(&self) -> &[Vote] {
        &[]
    }

    /// Apply the asset. `sender` is already fee-debited and is written back by
    /// the caller; nothing may be written to `store` when errors are returned.
    fn apply(
        &self,
        id: TransactionId,
        sender: &mut Account,
        store: &mut StateStore,
    ) -> Result<Vec<TransactionError>, StateError>;

    /// Exact inverse of [`Asset::apply`], under the same write rules
    fn undo(
        &self,
        id: TransactionId,
        sender: &mut Account,
        store: &mut StateStore,
    ) -> Result<Vec<TransactionError>, StateError>;
}

/// Wire fields of a transaction; the id is derived from them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionFields<A> {
    pub timestamp: u32,
    pub sender_public_key: PublicKey,
    pub fee: u64,
    pub asset: A,
    pub signature: Sig,
    /// Multisignature co-signatures, excluded from the id
    #[serde(default)]
    pub signatures: Vec<Sig>,
}

#[derive(Serialize)]
struct SigningData<'a, A> {
    kind: u8,
    timestamp: u32,
    sender_public_key: &'a PublicKey,
    fee: u64,
    asset: &'a A,
}

/// A signed transaction of one concrete kind
#[derive(Debug, Clone)]
pub struct SignedTransaction<A> {
    id: TransactionId,
    fields: TransactionFields<A>,
}

impl<A: Asset> SignedTransaction<A> {
    /// Seal wire fields, deriving the transaction id
    pub fn from_fields(fields: TransactionFields<A>) -> Result<Self, CoreError> {
        let mut bytes = signing_bytes(&fields)?;
        bytes.extend_from_slice(fields.signature.as_bytes());
        let id = TransactionId(hash_blake3(&bytes));
        Ok(SignedTransaction { id, fields })
    }

    /// Build and sign a transaction paying the asset's fee
    pub fn new_signed(timestamp: u32, asset: A, secret_key: &SecretKey) -> Result<Self, CoreError> {
        let mut fields = TransactionFields {
            timestamp,
            sender_public_key: secret_key.public_key(),
            fee: asset.fee(),
            asset,
            signature: Sig::default(),
            signatures: Vec::new(),
        };
        fields.signature = sign(secret_key, &signing_bytes(&fields)?);
        Self::from_fields(fields)
    }

    pub fn fields(&self) -> &TransactionFields<A> {
        &self.fields
    }

    pub fn asset(&self) -> &A {
        &self.fields.asset
    }

    pub fn signatures(&self) -> &[Sig] {
        &self.fields.signatures
    }

    /// Co-sign this transaction as a keysgroup member
    pub fn co_sign(&self, member: &SecretKey) -> SignatureObject {
        SignatureObject::new(self.id, member)
    }

    fn error(&self, message: impl Into<String>, data_path: &str) -> TransactionError {
        TransactionError::new(message, self.id, data_path)
    }

    /// Members whose co-signatures are required, and how many must sign
    fn required_signers(&self, sender: &Account) -> Option<(Vec<PublicKey>, usize)> {
        if sender.is_multisignature() {
            return Some((sender.keysgroup.clone(), usize::from(sender.multimin)));
        }
        self.fields
            .asset
            .registering_keysgroup()
            .map(|keysgroup| (keysgroup.to_vec(), keysgroup.len()))
    }

    fn missing_signatures(&self, sender: &Account) -> Option<TransactionError> {
        let (keysgroup, required) = self.required_signers(sender)?;
        let signed = keysgroup
            .iter()
            .filter(|member| {
                self.fields
                    .signatures
                    .iter()
                    .any(|sig| verify(member, self.id.as_bytes(), sig).is_ok())
            })
            .count();

        (signed < required).then(|| {
            self.error(
                format!("Missing signatures: {signed} of {required} provided"),
                ".signatures",
            )
        })
    }
}

fn signing_bytes<A: Asset>(fields: &TransactionFields<A>) -> Result<Vec<u8>, CoreError> {
    serialize::to_bytes(&SigningData {
        kind: A::KIND as u8,
        timestamp: fields.timestamp,
        sender_public_key: &fields.sender_public_key,
        fee: fields.fee,
        asset: &fields.asset,
    })
}

#[async_trait]
impl<A: Asset> Transaction for SignedTransaction<A> {
    fn id(&self) -> TransactionId {
        self.id
    }

    fn kind(&self) -> TransactionKind {
        A::KIND
    }

    fn timestamp(&self) -> u32 {
        self.fields.timestamp
    }

    fn sender_public_key(&self) -> &PublicKey {
        &self.fields.sender_public_key
    }

    fn fee(&self) -> u64 {
        self.fields.fee
    }

    fn votes(&self) -> &[Vote] {
        self.fields.asset.votes()
    }

    fn to_persisted(&self) -> Result<PersistedTransaction, CoreError> {
        Ok(PersistedTransaction {
            id: self.id,
            kind: A::KIND,
            sender_public_key: self.fields.sender_public_key,
            timestamp: self.fields.timestamp,
            fee: self.fields.fee,
            payload: serialize::to_bytes(&self.fields)?,
        })
    }

    fn validate(&self) -> TransactionResponse {
        let mut errors = Vec::new();

        // A malformed key makes the signature check meaningless, so it is the
        // only error reported for it
        if self.fields.sender_public_key.to_verifying_key().is_err() {
            errors.push(self.error("Invalid sender public key", ".senderPublicKey"));
        } else {
            let verified = signing_bytes(&self.fields).and_then(|bytes| {
                verify(&self.fields.sender_public_key, &bytes, &self.fields.signature)
            });
            if verified.is_err() {
                errors.push(self.error(
                    format!("Failed to validate signature {}", self.fields.signature),
                    ".signature",
                ));
            }
        }

        let distinct: BTreeSet<&Sig> = self.fields.signatures.iter().collect();
        if distinct.len() != self.fields.signatures.len() {
            errors.push(self.error(
                "Encountered duplicate signature in transaction",
                ".signatures",
            ));
        }

        let expected_fee = self.fields.asset.fee();
        if self.fields.fee != expected_fee {
            errors.push(self.error(
                format!("Invalid fee: expected {expected_fee}, got {}", self.fields.fee),
                ".fee",
            ));
        }

        errors.extend(self.fields.asset.validate(self.id));
        TransactionResponse::from_errors(self.id, errors)
    }

    async fn prepare(&self, store: &StateStore) -> Result<(), StateError> {
        let mut addresses = self.fields.asset.related_addresses();
        addresses.push(self.sender_address());
        store.cache_accounts(&addresses).await
    }

    fn apply(&self, store: &mut StateStore) -> Result<TransactionResponse, StateError> {
        let mut sender = store.get_or_default_account(&self.sender_address())?;
        let mut errors = Vec::new();

        if sender
            .public_key
            .is_some_and(|key| key != self.fields.sender_public_key)
        {
            errors.push(self.error("Invalid sender public key", ".senderPublicKey"));
        }
        if sender.balance < self.fields.fee {
            errors.push(self.error(
                format!(
                    "Account does not have enough balance: {}, balance: {}",
                    sender.address, sender.balance
                ),
                ".fee",
            ));
        }
        let missing = self.missing_signatures(&sender);

        match (errors.is_empty(), missing) {
            (true, Some(missing)) => {
                debug!("Transaction {} is waiting for signatures", self.id);
                return Ok(TransactionResponse::pending(self.id, missing));
            }
            (false, missing) => {
                errors.extend(missing);
                return Ok(TransactionResponse::from_errors(self.id, errors));
            }
            (true, None) => {}
        }

        sender.debit(self.fields.fee);
        sender.public_key.get_or_insert(self.fields.sender_public_key);

        let asset_errors = self.fields.asset.apply(self.id, &mut sender, store)?;
        if !asset_errors.is_empty() {
            return Ok(TransactionResponse::from_errors(self.id, asset_errors));
        }

        store.set_account(sender);
        Ok(TransactionResponse::ok(self.id))
    }

    fn undo(&self, store: &mut StateStore) -> Result<TransactionResponse, StateError> {
        let mut sender = store.get_or_default_account(&self.sender_address())?;

        if !sender.credit(self.fields.fee) {
            let error = self.error("Refunding the fee overflows the sender balance", ".fee");
            return Ok(TransactionResponse::from_errors(self.id, vec![error]));
        }

        let asset_errors = self.fields.asset.undo(self.id, &mut sender, store)?;
        if !asset_errors.is_empty() {
            return Ok(TransactionResponse::from_errors(self.id, asset_errors));
        }

        store.set_account(sender);
        Ok(TransactionResponse::ok(self.id))
    }

    fn add_multisignature(
        &mut self,
        store: &mut StateStore,
        signature: &SignatureObject,
    ) -> Result<TransactionResponse, StateError> {
        let sender = store.get_or_default_account(&self.sender_address())?;

        let error = if signature.transaction_id != self.id {
            Some(self.error(
                format!("Signature is for another transaction: {}", signature.transaction_id),
                ".id",
            ))
        } else if !self
            .required_signers(&sender)
            .is_some_and(|(keysgroup, _)| keysgroup.contains(&signature.public_key))
        {
            Some(self.error(
                format!(
                    "Public key {} is not a member of account {}",
                    signature.public_key, sender.address
                ),
                ".signatures",
            ))
        } else if self.fields.signatures.contains(&signature.signature) {
            Some(self.error("Encountered duplicate signature in transaction", ".signatures"))
        } else if verify(&signature.public_key, self.id.as_bytes(), &signature.signature).is_err()
        {
            Some(self.error(
                format!("Failed to add signature {}", signature.signature),
                ".signatures",
            ))
        } else {
            None
        };

        if let Some(error) = error {
            return Ok(TransactionResponse::from_errors(self.id, vec![error]));
        }

        self.fields.signatures.push(signature.signature);
        debug!(
            "Added co-signature from {} to transaction {}",
            signature.public_key, self.id
        );
        Ok(TransactionResponse::ok(self.id))
    }
}
