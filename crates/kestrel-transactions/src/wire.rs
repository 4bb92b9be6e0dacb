use kestrel_core::{serialize, CoreError, PersistedTransaction, TransactionKind};
use serde::{Deserialize, Serialize};

use crate::base::Transaction;
use crate::kinds::{MultisignatureAsset, TransferAsset, VoteAsset};
use crate::signed::{SignedTransaction, TransactionFields};

/// Externally tagged transaction as it arrives over JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireTransaction {
    Transfer(TransactionFields<TransferAsset>),
    Vote(TransactionFields<VoteAsset>),
    Multisignature(TransactionFields<MultisignatureAsset>),
}

impl WireTransaction {
    pub fn kind(&self) -> TransactionKind {
        match self {
            WireTransaction::Transfer(_) => TransactionKind::Transfer,
            WireTransaction::Vote(_) => TransactionKind::Vote,
            WireTransaction::Multisignature(_) => TransactionKind::Multisignature,
        }
    }

    /// Seal the fields into a processable transaction
    pub fn into_transaction(self) -> Result<Box<dyn Transaction>, CoreError> {
        Ok(match self {
            WireTransaction::Transfer(fields) => Box::new(SignedTransaction::from_fields(fields)?),
            WireTransaction::Vote(fields) => Box::new(SignedTransaction::from_fields(fields)?),
            WireTransaction::Multisignature(fields) => {
                Box::new(SignedTransaction::from_fields(fields)?)
            }
        })
    }

    /// Rebuild a wire transaction from its ledger record
    pub fn from_persisted(record: &PersistedTransaction) -> Result<Self, CoreError> {
        Ok(match record.kind {
            TransactionKind::Transfer => {
                WireTransaction::Transfer(serialize::from_bytes(&record.payload)?)
            }
            TransactionKind::Vote => WireTransaction::Vote(serialize::from_bytes(&record.payload)?),
            TransactionKind::Multisignature => {
                WireTransaction::Multisignature(serialize::from_bytes(&record.payload)?)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinds::TransferTransaction;
    use kestrel_core::{Address, KeyPair};

    #[test]
    fn test_json_transaction_keeps_its_id() {
        let sender = KeyPair::generate();
        let tx = TransferTransaction::new_signed(
            42,
            TransferAsset::new(Address(1234), 5),
            &sender.secret,
        )
        .unwrap();

        let json = serde_json::to_string(&WireTransaction::Transfer(tx.fields().clone())).unwrap();
        assert!(json.contains("\"type\":\"transfer\""));

        let decoded: WireTransaction = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.kind(), TransactionKind::Transfer);
        let sealed = decoded.into_transaction().unwrap();
        assert_eq!(sealed.id(), tx.id());
        assert!(sealed.validate().is_ok());
    }

    #[test]
    fn test_from_persisted_record() {
        let sender = KeyPair::generate();
        let tx = TransferTransaction::new_signed(
            42,
            TransferAsset::new(Address(1234), 5),
            &sender.secret,
        )
        .unwrap();

        let record = tx.to_persisted().unwrap();
        let rebuilt = WireTransaction::from_persisted(&record)
            .unwrap()
            .into_transaction()
            .unwrap();
        assert_eq!(rebuilt.id(), record.id);
    }
}
