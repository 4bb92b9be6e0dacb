use std::collections::{BTreeSet, HashMap};

use kestrel_core::{Status, TransactionId, TransactionKind, TransactionResponse};
use kestrel_transactions::Transaction;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Historically accepted transactions, by category, as hex transaction ids.
///
/// Each category forgives exactly one kind of failure: a listed
/// transaction whose response carries a single error at the category's
/// property path is accepted anyway.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Exceptions {
    pub sender_public_key: BTreeSet<String>,
    pub multisignatures: BTreeSet<String>,
    pub duplicated_signatures: BTreeSet<String>,
    pub votes: BTreeSet<String>,
    pub recipient_leading_zero: BTreeSet<String>,
    pub recipient_exceeding_uint64: BTreeSet<String>,
    pub transaction_with_null_byte: BTreeSet<String>,
}

/// Decides which failed transactions are force-accepted
#[derive(Debug, Clone, Default)]
pub struct ExceptionPolicy {
    exceptions: Exceptions,
}

impl ExceptionPolicy {
    pub fn new(exceptions: Exceptions) -> Self {
        ExceptionPolicy { exceptions }
    }

    /// Whether a failed `response` of `transaction` is a known exception
    pub fn is_exception(
        &self,
        response: &TransactionResponse,
        transaction: &dyn Transaction,
    ) -> bool {
        let [error] = response.errors.as_slice() else {
            return false;
        };
        let id = transaction.id().to_string();
        let e = &self.exceptions;
        let rules: [(&BTreeSet<String>, &str, Option<TransactionKind>); 7] = [
            (&e.sender_public_key, ".senderPublicKey", None),
            (&e.multisignatures, ".signatures", None),
            (&e.duplicated_signatures, ".signatures", None),
            (&e.votes, ".asset.votes", Some(TransactionKind::Vote)),
            (
                &e.recipient_leading_zero,
                ".recipientId",
                Some(TransactionKind::Transfer),
            ),
            (
                &e.recipient_exceeding_uint64,
                ".recipientId",
                Some(TransactionKind::Transfer),
            ),
            (&e.transaction_with_null_byte, ".asset.data", None),
        ];

        rules.iter().any(|(ids, data_path, kind)| {
            error.data_path == *data_path
                && kind.map_or(true, |kind| kind == transaction.kind())
                && ids.contains(&id)
        })
    }

    /// Turn every failed response that is a known exception into a success.
    ///
    /// # Panics
    ///
    /// If a response names a transaction that is not in `transactions`.
    pub fn override_exceptions(
        &self,
        responses: &mut [TransactionResponse],
        transactions: &[Box<dyn Transaction>],
    ) {
        let by_id: HashMap<TransactionId, &dyn Transaction> = transactions
            .iter()
            .map(|tx| (tx.id(), tx.as_ref()))
            .collect();

        for response in responses.iter_mut().filter(|r| r.status != Status::Ok) {
            let transaction = by_id.get(&response.id).unwrap_or_else(|| {
                panic!(
                    "response for transaction {} has no matching transaction in the batch",
                    response.id
                )
            });
            if self.is_exception(response, *transaction) {
                warn!(
                    "Accepting transaction {} as a known exception: {}",
                    response.id, response.errors[0]
                );
                response.force_ok();
            }
        }
    }
}
