//! Tree leaves: a current value plus at most one pending change

use serde::{Deserialize, Serialize};
use slowgate_core::crypto::hash_domain;
use slowgate_core::{Field, Timepoint};

/// Domain tag for leaf commitments
pub const LEAF_DOMAIN: u32 = 0x534c_4f57; // "SLOW"

/// A staged value waiting for its effective time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingChange {
    /// Value that becomes effective
    pub value: Field,
    /// First time at which `value` is observed by reads
    pub effective_at: Timepoint,
}

/// One slot of the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SlowLeaf {
    /// Value observed before the pending change takes effect
    pub current: Field,
    /// At most one staged change
    pub pending: Option<PendingChange>,
}

impl SlowLeaf {
    /// A leaf whose value is effective immediately
    pub fn settled(value: Field) -> Self {
        Self {
            current: value,
            pending: None,
        }
    }

    /// Effective value at time `at`
    pub fn value_at(&self, at: Timepoint) -> Field {
        match self.pending {
            Some(change) if change.effective_at <= at => change.value,
            _ => self.current,
        }
    }

    /// The pending change if it is not yet effective at `at`
    pub fn pending_at(&self, at: Timepoint) -> Option<PendingChange> {
        self.pending.filter(|change| change.effective_at > at)
    }

    /// True once any value has been written to the slot
    pub fn is_touched(&self) -> bool {
        *self != Self::default()
    }

    /// Move a pending change that is effective at `now` into `current`.
    ///
    /// Does not alter `value_at(t)` for any `t >= now`.
    pub fn fold(&mut self, now: Timepoint) -> bool {
        match self.pending {
            Some(change) if change.effective_at <= now => {
                self.current = change.value;
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    /// Commitment stored in the Merkle tree.
    ///
    /// `H(LEAF_DOMAIN || current || flag || pending_value || effective_at)`
    /// with `flag` one byte (0 = no pending change, in which case the pending
    /// fields are zero) and `effective_at` as a 32-byte big-endian word.
    pub fn commitment(&self) -> [u8; 32] {
        let (flag, pending_value, effective_at) = match self.pending {
            Some(change) => (1u8, change.value, change.effective_at.units()),
            None => (0u8, Field::ZERO, 0),
        };
        let effective = Field::from_u64(effective_at);
        let flag = [flag];
        hash_domain(
            LEAF_DOMAIN,
            &[
                &self.current.as_bytes()[..],
                &flag[..],
                &pending_value.as_bytes()[..],
                &effective.as_bytes()[..],
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staged(current: u64, value: u64, at: u64) -> SlowLeaf {
        SlowLeaf {
            current: Field::from_u64(current),
            pending: Some(PendingChange {
                value: Field::from_u64(value),
                effective_at: Timepoint::new(at),
            }),
        }
    }

    #[test]
    fn test_value_switches_exactly_at_effective_time() {
        let leaf = staged(1, 2, 100);
        assert_eq!(leaf.value_at(Timepoint::new(99)), Field::from_u64(1));
        assert_eq!(leaf.value_at(Timepoint::new(100)), Field::from_u64(2));
        assert_eq!(leaf.pending_at(Timepoint::new(99)).map(|c| c.value), Some(Field::from_u64(2)));
        assert_eq!(leaf.pending_at(Timepoint::new(100)), None);
    }

    #[test]
    fn test_fold_only_when_effective() {
        let mut leaf = staged(1, 2, 100);
        assert!(!leaf.fold(Timepoint::new(50)));
        assert_eq!(leaf, staged(1, 2, 100));

        assert!(leaf.fold(Timepoint::new(100)));
        assert_eq!(leaf, SlowLeaf::settled(Field::from_u64(2)));
    }

    #[test]
    fn test_commitment_distinguishes_pending_state() {
        let settled = SlowLeaf::settled(Field::from_u64(1));
        let pending_same = staged(1, 1, 0);
        assert_ne!(settled.commitment(), pending_same.commitment());
        assert_ne!(staged(1, 2, 100).commitment(), staged(1, 2, 101).commitment());
    }

    #[test]
    fn test_default_leaf_is_untouched_zero() {
        let leaf = SlowLeaf::default();
        assert!(!leaf.is_touched());
        assert_eq!(leaf.value_at(Timepoint::new(u64::MAX)), Field::ZERO);
    }
}
