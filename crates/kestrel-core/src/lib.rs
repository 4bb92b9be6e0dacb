//! Kestrel Core - Ledger types, cryptography, and canonical serialization
//!
//! This crate provides the identifiers, account model and transaction
//! response types shared by the state overlay, the transaction kinds and
//! the ledger processor.

pub mod crypto;
pub mod error;
pub mod serialize;
pub mod types;

pub use crypto::{hash_blake3, sign, verify, Hash, KeyPair, PublicKey, SecretKey, Sig};
pub use error::CoreError;
pub use types::*;
