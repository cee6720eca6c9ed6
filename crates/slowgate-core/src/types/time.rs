//! Ledger time
//!
//! The host supplies "now" as an opaque monotone counter (block time or round
//! number). The core never reads a wall clock.

use crate::{Result, SlowGateError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A point on the host ledger's time axis
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timepoint(pub u64);

impl Timepoint {
    /// Genesis
    pub const ZERO: Timepoint = Timepoint(0);

    /// Create a timepoint
    pub fn new(units: u64) -> Self {
        Self(units)
    }

    /// Raw time units
    pub fn units(&self) -> u64 {
        self.0
    }

    /// `self + delay`, rejecting overflow
    pub fn checked_add(self, delay: Delay) -> Result<Timepoint> {
        self.0.checked_add(delay.0).map(Timepoint).ok_or_else(|| {
            SlowGateError::invalid(format!("timepoint {} + delay {} overflows", self.0, delay.0))
        })
    }

    /// Time units elapsed since `earlier`, zero if `earlier` is later
    pub fn saturating_since(self, earlier: Timepoint) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Display for Timepoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t={}", self.0)
    }
}

impl From<u64> for Timepoint {
    fn from(units: u64) -> Self {
        Self(units)
    }
}

/// A number of time units a staged change must wait
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Delay(pub u64);

impl Delay {
    /// Create a delay
    pub fn new(units: u64) -> Self {
        Self(units)
    }

    /// Raw time units
    pub fn units(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Delay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} units", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_add() {
        assert_eq!(
            Timepoint::new(150).checked_add(Delay::new(100)).unwrap(),
            Timepoint::new(250)
        );
        assert!(Timepoint::new(u64::MAX).checked_add(Delay::new(1)).is_err());
    }

    #[test]
    fn test_saturating_since() {
        assert_eq!(Timepoint::new(10).saturating_since(Timepoint::new(4)), 6);
        assert_eq!(Timepoint::new(4).saturating_since(Timepoint::new(10)), 0);
    }
}
