pub mod account;
pub mod address;
pub mod response;
pub mod round;
pub mod transaction;

pub use account::Account;
pub use address::{Address, AddressError};
pub use response::{Status, TransactionError, TransactionResponse};
pub use round::RoundEntry;
pub use transaction::{
    PersistedTransaction, TransactionId, TransactionKind, MULTISIGNATURE_FEE, TRANSFER_FEE,
    VOTE_FEE,
};
