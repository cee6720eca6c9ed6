//! Manually driven ledger clock

use parking_lot::Mutex;
use slowgate_core::{Result, SlowGateError, Timepoint};
use std::sync::Arc;

/// Ledger time source that only moves when a test moves it
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<Mutex<Timepoint>>,
}

impl ManualClock {
    /// Clock starting at `start`
    pub fn new(start: Timepoint) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Current ledger time
    pub fn now(&self) -> Timepoint {
        *self.now.lock()
    }

    /// Move forward by `units`, saturating at the end of time
    pub fn advance(&self, units: u64) -> Timepoint {
        let mut now = self.now.lock();
        *now = Timepoint::new(now.units().saturating_add(units));
        *now
    }

    /// Jump to `at`. Ledger time never runs backwards.
    pub fn set(&self, at: Timepoint) -> Result<()> {
        let mut now = self.now.lock();
        if at < *now {
            return Err(SlowGateError::invalid(format!(
                "clock cannot move back from {} to {at}",
                *now
            )));
        }
        *now = at;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_moves_forward_only() {
        let clock = ManualClock::new(Timepoint::new(10));
        assert_eq!(clock.advance(5), Timepoint::new(15));
        clock.set(Timepoint::new(100)).unwrap();
        assert_eq!(clock.now(), Timepoint::new(100));
        assert!(clock.set(Timepoint::new(99)).is_err());
        assert_eq!(clock.now(), Timepoint::new(100));
    }

    #[test]
    fn test_clones_share_time() {
        let clock = ManualClock::default();
        let other = clock.clone();
        other.advance(3);
        assert_eq!(clock.now(), Timepoint::new(3));
    }
}
