//! Kestrel Transactions - Transaction capability trait and concrete kinds
//!
//! The ledger processor only ever sees `dyn Transaction`. Concrete kinds are
//! a signed envelope around a kind-specific asset.

pub mod base;
pub mod kinds;
pub mod signed;
pub mod wire;

pub use base::{SignatureObject, Transaction};
pub use kinds::{
    MultisignatureAsset, MultisignatureTransaction, TransferAsset, TransferTransaction, Vote,
    VoteAction, VoteAsset, VoteTransaction,
};
pub use signed::{Asset, SignedTransaction, TransactionFields};
pub use wire::WireTransaction;
