use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Invalid public key")]
    InvalidPublicKey,

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(#[from] crate::types::AddressError),

    #[error("Unknown transaction kind: {0}")]
    UnknownKind(u8),

    #[error("Hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),
}
