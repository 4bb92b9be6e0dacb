use kestrel_core::{
    Account, Address, AddressError, TransactionError, TransactionId, TransactionKind, TRANSFER_FEE,
};
use kestrel_state::{StateError, StateStore};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::signed::{Asset, SignedTransaction};

/// Maximum size of the optional transfer memo, in bytes
pub const MAX_DATA_LENGTH: usize = 64;

/// Move `amount` from the sender to `recipient_id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferAsset {
    /// Recipient address in its textual `<digits>L` form
    pub recipient_id: String,
    pub amount: u64,
    #[serde(default)]
    pub data: Option<String>,
}

pub type TransferTransaction = SignedTransaction<TransferAsset>;

impl TransferAsset {
    pub fn new(recipient: Address, amount: u64) -> Self {
        TransferAsset {
            recipient_id: recipient.to_string(),
            amount,
            data: None,
        }
    }

    pub fn recipient(&self) -> Result<Address, AddressError> {
        self.recipient_id.parse()
    }

    fn recipient_error(&self, id: TransactionId) -> Option<TransactionError> {
        self.recipient()
            .err()
            .map(|e| TransactionError::new(e.to_string(), id, ".recipientId"))
    }
}

impl Asset for TransferAsset {
    const KIND: TransactionKind = TransactionKind::Transfer;

    fn fee(&self) -> u64 {
        TRANSFER_FEE
    }

    fn validate(&self, id: TransactionId) -> Vec<TransactionError> {
        let mut errors: Vec<TransactionError> = self.recipient_error(id).into_iter().collect();

        if self.amount == 0 {
            errors.push(TransactionError::new(
                "Amount must be greater than zero",
                id,
                ".amount",
            ));
        }

        if let Some(data) = &self.data {
            if data.len() > MAX_DATA_LENGTH {
                errors.push(TransactionError::new(
                    format!("Transfer data exceeds {MAX_DATA_LENGTH} bytes"),
                    id,
                    ".asset.data",
                ));
            }
            if data.contains('\0') {
                errors.push(TransactionError::new(
                    "Transfer data must not contain null bytes",
                    id,
                    ".asset.data",
                ));
            }
        }

        errors
    }

    fn related_addresses(&self) -> Vec<Address> {
        self.recipient().into_iter().collect()
    }

    fn apply(
        &self,
        id: TransactionId,
        sender: &mut Account,
        store: &mut StateStore,
    ) -> Result<Vec<TransactionError>, StateError> {
        let recipient_address = match self.recipient() {
            Ok(address) => address,
            Err(_) => return Ok(self.recipient_error(id).into_iter().collect()),
        };

        if sender.balance < self.amount {
            return Ok(vec![TransactionError::new(
                format!(
                    "Account does not have enough balance: {}, balance: {}",
                    sender.address, sender.balance
                ),
                id,
                ".amount",
            )]);
        }

        if recipient_address == sender.address {
            return Ok(Vec::new());
        }

        let mut recipient = store.get_or_default_account(&recipient_address)?;
        if !recipient.credit(self.amount) {
            return Ok(vec![TransactionError::new(
                "Recipient balance would overflow",
                id,
                ".amount",
            )]);
        }
        sender.debit(self.amount);
        store.set_account(recipient);

        debug!(
            "Transferred {} from {} to {}",
            self.amount, sender.address, recipient_address
        );
        Ok(Vec::new())
    }

    fn undo(
        &self,
        id: TransactionId,
        sender: &mut Account,
        store: &mut StateStore,
    ) -> Result<Vec<TransactionError>, StateError> {
        let recipient_address = match self.recipient() {
            Ok(address) => address,
            Err(_) => return Ok(self.recipient_error(id).into_iter().collect()),
        };

        if recipient_address == sender.address {
            return Ok(Vec::new());
        }

        let mut recipient = store.get_or_default_account(&recipient_address)?;
        if !recipient.debit(self.amount) {
            return Ok(vec![TransactionError::new(
                format!(
                    "Account does not have enough balance: {}, balance: {}",
                    recipient.address, recipient.balance
                ),
                id,
                ".amount",
            )]);
        }
        if !sender.credit(self.amount) {
            return Ok(vec![TransactionError::new(
                "Sender balance would overflow",
                id,
                ".amount",
            )]);
        }
        store.set_account(recipient);

        Ok(Vec::new())
    }
}
