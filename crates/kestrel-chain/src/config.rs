use serde::{Deserialize, Serialize};

use crate::exceptions::Exceptions;

/// 2016-05-24T17:00:00Z, the default chain epoch
pub const DEFAULT_EPOCH_UNIX: u64 = 1_464_109_200;
pub const DEFAULT_SLOT_INTERVAL: u64 = 10;

/// Settings of the transaction processor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Unix time of slot zero
    pub epoch_unix: u64,
    /// Slot length in seconds
    pub slot_interval: u64,
    #[serde(default)]
    pub exceptions: Exceptions,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        ProcessorConfig {
            epoch_unix: DEFAULT_EPOCH_UNIX,
            slot_interval: DEFAULT_SLOT_INTERVAL,
            exceptions: Exceptions::default(),
        }
    }
}
