//! Kestrel Chain - Transaction ledger processing
//!
//! This crate sequences transaction lifecycle calls over a state overlay,
//! applies the exception allowlist and feeds round bookkeeping.

pub mod config;
pub mod error;
pub mod exceptions;
pub mod processor;
pub mod rounds;
pub mod slots;

pub use config::ProcessorConfig;
pub use error::ChainError;
pub use exceptions::{ExceptionPolicy, Exceptions};
pub use processor::{ProcessedBatch, TransactionProcessor};
pub use rounds::{NoopRounds, RoundAccumulator, RoundsInformation};
pub use slots::{EpochSlots, FixedSlots, SlotClock};
