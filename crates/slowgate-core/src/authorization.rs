//! Write authority over tree slots
//!
//! Who may stage a change is a predicate over `(caller, slot)`. The stock
//! policy is an admin who may write anything plus an access list of writers,
//! each scoped to all slots or a fixed set of slots.

use crate::{Address, Result, Slot, SlowGateError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Decides whether a caller may stage a change to a slot
pub trait WriteAuthority {
    /// True if `caller` may stage a change to `slot`
    fn may_write(&self, caller: &Address, slot: Slot) -> bool;

    /// `Ok(())` if permitted, `Unauthorized` otherwise
    fn ensure_may_write(&self, caller: &Address, slot: Slot) -> Result<()> {
        if self.may_write(caller, slot) {
            Ok(())
        } else {
            Err(SlowGateError::unauthorized(format!(
                "{caller} may not stage changes to {slot}"
            )))
        }
    }
}

/// Slots covered by a writer grant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotScope {
    /// Every slot of the tree
    All,
    /// Only the listed slots
    Only(BTreeSet<Slot>),
}

impl SlotScope {
    /// Scope covering exactly one slot
    pub fn single(slot: Slot) -> Self {
        Self::Only(BTreeSet::from([slot]))
    }

    /// True if the scope covers `slot`
    pub fn covers(&self, slot: Slot) -> bool {
        match self {
            SlotScope::All => true,
            SlotScope::Only(slots) => slots.contains(&slot),
        }
    }

    fn widen(&mut self, other: SlotScope) {
        match (&mut *self, other) {
            (SlotScope::All, _) => {}
            (_, SlotScope::All) => *self = SlotScope::All,
            (SlotScope::Only(mine), SlotScope::Only(theirs)) => mine.extend(theirs),
        }
    }
}

/// Admin plus per-writer slot grants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriterPolicy {
    admin: Address,
    writers: BTreeMap<Address, SlotScope>,
}

impl WriterPolicy {
    /// Policy where only `admin` may write
    pub fn admin_only(admin: Address) -> Self {
        Self {
            admin,
            writers: BTreeMap::new(),
        }
    }

    /// The admin identity
    pub fn admin(&self) -> Address {
        self.admin
    }

    /// True if `caller` is the admin
    pub fn is_admin(&self, caller: &Address) -> bool {
        *caller == self.admin
    }

    /// Grant `writer` the slots in `scope`. Existing grants are widened, never
    /// narrowed.
    pub fn grant(&mut self, writer: Address, scope: SlotScope) -> Result<()> {
        if writer.is_zero() {
            return Err(SlowGateError::invalid("cannot grant writes to the zero address"));
        }
        match self.writers.get_mut(&writer) {
            Some(existing) => existing.widen(scope),
            None => {
                self.writers.insert(writer, scope);
            }
        }
        Ok(())
    }

    /// Remove every grant held by `writer`. Returns whether one existed.
    pub fn revoke(&mut self, writer: &Address) -> bool {
        self.writers.remove(writer).is_some()
    }

    /// Scope granted to `writer`, if any
    pub fn scope_of(&self, writer: &Address) -> Option<&SlotScope> {
        self.writers.get(writer)
    }
}

impl WriteAuthority for WriterPolicy {
    fn may_write(&self, caller: &Address, slot: Slot) -> bool {
        if caller.is_zero() {
            return false;
        }
        self.is_admin(caller)
            || self
                .writers
                .get(caller)
                .is_some_and(|scope| scope.covers(slot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(label: &str) -> Address {
        Address::new_from_entropy(label.as_bytes())
    }

    #[test]
    fn test_admin_writes_everything() {
        let policy = WriterPolicy::admin_only(addr("admin"));
        assert!(policy.may_write(&addr("admin"), Slot(0)));
        assert!(policy.may_write(&addr("admin"), Slot(u64::MAX)));
        assert!(!policy.may_write(&addr("mallory"), Slot(0)));
    }

    #[test]
    fn test_scoped_writer_is_limited_to_its_slots() {
        let mut policy = WriterPolicy::admin_only(addr("admin"));
        policy.grant(addr("proxy"), SlotScope::single(Slot(3))).unwrap();

        assert!(policy.may_write(&addr("proxy"), Slot(3)));
        assert!(!policy.may_write(&addr("proxy"), Slot(4)));
        assert!(policy.ensure_may_write(&addr("proxy"), Slot(4)).is_err());
    }

    #[test]
    fn test_grants_widen() {
        let mut policy = WriterPolicy::admin_only(addr("admin"));
        policy.grant(addr("w"), SlotScope::single(Slot(1))).unwrap();
        policy.grant(addr("w"), SlotScope::single(Slot(2))).unwrap();
        assert!(policy.may_write(&addr("w"), Slot(1)));
        assert!(policy.may_write(&addr("w"), Slot(2)));

        policy.grant(addr("w"), SlotScope::All).unwrap();
        policy.grant(addr("w"), SlotScope::single(Slot(9))).unwrap();
        assert_eq!(policy.scope_of(&addr("w")), Some(&SlotScope::All));
    }

    #[test]
    fn test_revoke_and_zero_address() {
        let mut policy = WriterPolicy::admin_only(addr("admin"));
        policy.grant(addr("w"), SlotScope::All).unwrap();
        assert!(policy.revoke(&addr("w")));
        assert!(!policy.may_write(&addr("w"), Slot(0)));
        assert!(!policy.revoke(&addr("w")));

        assert!(policy.grant(Address::ZERO, SlotScope::All).is_err());
        assert!(!WriterPolicy::admin_only(Address::ZERO).may_write(&Address::ZERO, Slot(0)));
    }
}
