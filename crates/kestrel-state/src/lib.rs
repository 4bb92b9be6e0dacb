//! Kestrel State - Ledger storage and the per-batch state overlay
//!
//! This crate provides the key/value storage backends, the async ledger
//! storage collaborator with its optional transactional context, and the
//! `StateStore` overlay that transactions prepare, mutate and commit.

pub mod error;
pub mod ledger;
pub mod storage;
pub mod store;

pub use error::StateError;
pub use ledger::{DbTransaction, Ledger, LedgerStorage};
pub use storage::{FileStorage, MemoryStorage, Storage, WriteSet};
pub use store::{Checkpoint, StateStore, StoreOptions};
