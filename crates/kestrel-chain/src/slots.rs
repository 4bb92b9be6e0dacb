use std::time::{SystemTime, UNIX_EPOCH};

/// Logical time discretization of the chain
pub trait SlotClock: Send + Sync {
    /// Slot that a transaction timestamp falls in
    fn slot_number(&self, timestamp: u32) -> u64;

    fn current_slot_number(&self) -> u64;
}

/// Slots of `interval` seconds counted from a fixed chain epoch
#[derive(Debug, Clone)]
pub struct EpochSlots {
    epoch_unix: u64,
    interval: u64,
}

impl EpochSlots {
    pub fn new(epoch_unix: u64, interval: u64) -> Self {
        EpochSlots {
            epoch_unix,
            interval: interval.max(1),
        }
    }

    /// Seconds elapsed since the chain epoch, per the wall clock
    pub fn epoch_time(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        now.saturating_sub(self.epoch_unix)
    }
}

impl SlotClock for EpochSlots {
    fn slot_number(&self, timestamp: u32) -> u64 {
        u64::from(timestamp) / self.interval
    }

    fn current_slot_number(&self) -> u64 {
        self.epoch_time() / self.interval
    }
}

/// Slot clock pinned to a fixed "now"
#[derive(Debug, Clone)]
pub struct FixedSlots {
    pub now: u32,
    pub interval: u64,
}

impl SlotClock for FixedSlots {
    fn slot_number(&self, timestamp: u32) -> u64 {
        u64::from(timestamp) / self.interval.max(1)
    }

    fn current_slot_number(&self) -> u64 {
        self.slot_number(self.now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_number_truncates() {
        let slots = EpochSlots::new(0, 10);
        assert_eq!(slots.slot_number(0), 0);
        assert_eq!(slots.slot_number(19), 1);
        assert_eq!(slots.slot_number(20), 2);
    }

    #[test]
    fn test_epoch_in_future_saturates() {
        let slots = EpochSlots::new(u64::MAX, 10);
        assert_eq!(slots.current_slot_number(), 0);
    }

    #[test]
    fn test_fixed_slots() {
        let slots = FixedSlots {
            now: 100,
            interval: 10,
        };
        assert_eq!(slots.current_slot_number(), 10);
        assert!(slots.slot_number(110) > slots.current_slot_number());
        assert_eq!(slots.slot_number(109), slots.current_slot_number());
    }
}
