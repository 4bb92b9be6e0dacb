use std::collections::BTreeSet;

use kestrel_core::{
    Account, PublicKey, TransactionError, TransactionId, TransactionKind, MULTISIGNATURE_FEE,
};
use kestrel_state::{StateError, StateStore};
use serde::{Deserialize, Serialize};

use crate::signed::{Asset, SignedTransaction};

pub const MAX_KEYSGROUP_SIZE: usize = 15;

/// Turn the sender into a multisignature account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultisignatureAsset {
    pub keysgroup: Vec<PublicKey>,
    /// Co-signatures required on every later transaction
    pub min: u8,
}

pub type MultisignatureTransaction = SignedTransaction<MultisignatureAsset>;

impl Asset for MultisignatureAsset {
    const KIND: TransactionKind = TransactionKind::Multisignature;

    fn fee(&self) -> u64 {
        MULTISIGNATURE_FEE * (self.keysgroup.len() as u64 + 1)
    }

    fn validate(&self, id: TransactionId) -> Vec<TransactionError> {
        let mut errors = Vec::new();
        let size = self.keysgroup.len();

        if size == 0 || size > MAX_KEYSGROUP_SIZE {
            errors.push(TransactionError::new(
                format!("Keysgroup must have between 1 and {MAX_KEYSGROUP_SIZE} members"),
                id,
                ".asset.multisignature.keysgroup",
            ));
        }
        let distinct: BTreeSet<&PublicKey> = self.keysgroup.iter().collect();
        if distinct.len() != size {
            errors.push(TransactionError::new(
                "Encountered duplicate public key in keysgroup",
                id,
                ".asset.multisignature.keysgroup",
            ));
        }
        if self.min == 0 || usize::from(self.min) > size {
            errors.push(TransactionError::new(
                format!("Invalid multisignature min: {}", self.min),
                id,
                ".asset.multisignature.min",
            ));
        }
        errors
    }

    fn registering_keysgroup(&self) -> Option<&[PublicKey]> {
        Some(&self.keysgroup)
    }

    fn apply(
        &self,
        id: TransactionId,
        sender: &mut Account,
        _store: &mut StateStore,
    ) -> Result<Vec<TransactionError>, StateError> {
        if sender.is_multisignature() {
            return Ok(vec![TransactionError::new(
                "Register multisignature only allowed once per account",
                id,
                ".signatures",
            )]);
        }
        if sender
            .public_key
            .is_some_and(|key| self.keysgroup.contains(&key))
        {
            return Ok(vec![TransactionError::new(
                "Invalid multisignature keysgroup. Can not contain sender",
                id,
                ".asset.multisignature.keysgroup",
            )]);
        }

        sender.keysgroup = self.keysgroup.clone();
        sender.multimin = self.min;
        Ok(Vec::new())
    }

    fn undo(
        &self,
        _id: TransactionId,
        sender: &mut Account,
        _store: &mut StateStore,
    ) -> Result<Vec<TransactionError>, StateError> {
        sender.keysgroup.clear();
        sender.multimin = 0;
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::Transaction;
    use kestrel_core::{Address, KeyPair, Status};
    use kestrel_state::{Ledger, MemoryStorage};
    use std::sync::Arc;

    #[test]
    fn test_fee_scales_with_keysgroup() {
        let asset = MultisignatureAsset {
            keysgroup: vec![KeyPair::generate().public, KeyPair::generate().public],
            min: 2,
        };
        assert_eq!(asset.fee(), 3 * MULTISIGNATURE_FEE);
    }

    #[test]
    fn test_validate_min_above_keysgroup() {
        let asset = MultisignatureAsset {
            keysgroup: vec![KeyPair::generate().public],
            min: 2,
        };
        let errors = asset.validate(TransactionId::default());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].data_path, ".asset.multisignature.min");
    }

    #[tokio::test]
    async fn test_registration_waits_for_every_member() {
        let sender = KeyPair::generate();
        let members = [KeyPair::generate(), KeyPair::generate()];
        let sender_address = Address::from_public_key(&sender.public);

        let ledger = Arc::new(Ledger::new(MemoryStorage::new()));
        ledger
            .seed_accounts(&[Account::with_balance(sender_address, 10 * MULTISIGNATURE_FEE)])
            .await
            .unwrap();
        let mut store = StateStore::read_only(ledger);

        let asset = MultisignatureAsset {
            keysgroup: members.iter().map(|m| m.public).collect(),
            min: 1,
        };
        let mut tx = MultisignatureTransaction::new_signed(5, asset, &sender.secret).unwrap();
        tx.prepare(&store).await.unwrap();

        let pending = tx.apply(&mut store).unwrap();
        assert_eq!(pending.status, Status::Pending);
        assert_eq!(pending.errors[0].data_path, ".signatures");

        for member in &members {
            let signature = tx.co_sign(&member.secret);
            assert!(tx.add_multisignature(&mut store, &signature).unwrap().is_ok());
        }

        assert!(tx.apply(&mut store).unwrap().is_ok());
        let account = store.get_account(&sender_address).unwrap();
        assert_eq!(account.keysgroup.len(), 2);
        assert_eq!(account.multimin, 1);
    }

    #[tokio::test]
    async fn test_outsider_cannot_co_sign() {
        let sender = KeyPair::generate();
        let outsider = KeyPair::generate();
        let ledger = Arc::new(Ledger::new(MemoryStorage::new()));
        let mut store = StateStore::read_only(ledger);

        let asset = MultisignatureAsset {
            keysgroup: vec![KeyPair::generate().public],
            min: 1,
        };
        let mut tx = MultisignatureTransaction::new_signed(5, asset, &sender.secret).unwrap();
        tx.prepare(&store).await.unwrap();

        let response = tx
            .add_multisignature(&mut store, &tx.co_sign(&outsider.secret))
            .unwrap();
        assert_eq!(response.status, Status::Fail);
        assert!(tx.signatures().is_empty());
    }
}
