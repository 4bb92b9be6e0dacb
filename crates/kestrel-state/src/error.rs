use kestrel_core::Address;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("Account was not prepared in this state store: {0}")]
    AccountNotCached(Address),

    #[error("Account not found: {0}")]
    AccountNotFound(Address),

    #[error("State store was opened read-only and cannot be finalized")]
    ImmutableStore,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Core error: {0}")]
    Core(#[from] kestrel_core::CoreError),
}
