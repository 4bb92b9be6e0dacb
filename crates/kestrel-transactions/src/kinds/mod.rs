pub mod multisignature;
pub mod transfer;
pub mod vote;

pub use multisignature::{MultisignatureAsset, MultisignatureTransaction};
pub use transfer::{TransferAsset, TransferTransaction};
pub use vote::{Vote, VoteAction, VoteAsset, VoteTransaction};
