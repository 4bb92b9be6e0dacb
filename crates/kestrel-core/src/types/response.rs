use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::transaction::TransactionId;

/// Outcome of a lifecycle call on one transaction.
///
/// The discriminants are the on-chain status codes, so a raw `0` is
/// `Fail`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Status {
    Fail = 0,
    Ok = 1,
    /// Well-formed, but still waiting for multisignature co-signatures
    Pending = 2,
}

/// A business-rule failure attached to one property of a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionError {
    pub message: String,
    pub id: TransactionId,
    /// Property path of the offending field, e.g. `.timestamp`
    pub data_path: String,
}

impl TransactionError {
    pub fn new(message: impl Into<String>, id: TransactionId, data_path: &str) -> Self {
        TransactionError {
            message: message.into(),
            id,
            data_path: data_path.to_string(),
        }
    }
}

impl fmt::Display for TransactionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (at {})", self.message, self.data_path)
    }
}

impl std::error::Error for TransactionError {}

/// Per-transaction result returned by every batch operation.
///
/// Invariant: `status == Ok` exactly when `errors` is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResponse {
    pub id: TransactionId,
    pub status: Status,
    pub errors: Vec<TransactionError>,
}

impl TransactionResponse {
    pub fn ok(id: TransactionId) -> Self {
        TransactionResponse {
            id,
            status: Status::Ok,
            errors: Vec::new(),
        }
    }

    /// `Ok` when `errors` is empty, `Fail` otherwise
    pub fn from_errors(id: TransactionId, errors: Vec<TransactionError>) -> Self {
        let status = if errors.is_empty() {
            Status::Ok
        } else {
            Status::Fail
        };
        TransactionResponse { id, status, errors }
    }

    pub fn pending(id: TransactionId, error: TransactionError) -> Self {
        TransactionResponse {
            id,
            status: Status::Pending,
            errors: vec![error],
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }

    /// Mark the response failed and attach `error`
    pub fn fail_with(&mut self, error: TransactionError) {
        self.status = Status::Fail;
        self.errors.push(error);
    }

    /// Clear every error and mark the response successful
    pub fn force_ok(&mut self) {
        self.status = Status::Ok;
        self.errors.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::hash_blake3;

    fn id() -> TransactionId {
        TransactionId(hash_blake3(b"tx"))
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(Status::Fail as u8, 0);
        assert_eq!(Status::Ok as u8, 1);
        assert_eq!(Status::Pending as u8, 2);
    }

    #[test]
    fn test_from_errors_status() {
        assert!(TransactionResponse::from_errors(id(), vec![]).is_ok());

        let failed = TransactionResponse::from_errors(
            id(),
            vec![TransactionError::new("bad fee", id(), ".fee")],
        );
        assert_eq!(failed.status, Status::Fail);
        assert_eq!(failed.errors.len(), 1);
    }

    #[test]
    fn test_fail_with_appends() {
        let mut response = TransactionResponse::pending(
            id(),
            TransactionError::new("Missing signatures", id(), ".signatures"),
        );
        response.fail_with(TransactionError::new("future", id(), ".timestamp"));

        assert_eq!(response.status, Status::Fail);
        assert_eq!(response.errors[1].data_path, ".timestamp");
    }

    #[test]
    fn test_force_ok_clears_errors() {
        let mut response =
            TransactionResponse::from_errors(id(), vec![TransactionError::new("x", id(), ".id")]);
        response.force_ok();
        assert!(response.is_ok());
        assert!(response.errors.is_empty());
    }
}
