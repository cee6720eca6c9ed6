//! Identifier types: contract/caller addresses and tree slots

use crate::crypto::hash;
use crate::{Field, Result, SlowGateError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Address of a contract instance or a caller identity
///
/// Opaque 32-byte value. The zero address is reserved: it is never a valid
/// logic target and never a valid caller.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Address(pub Field);

impl Address {
    /// The reserved zero address
    pub const ZERO: Address = Address(Field::ZERO);

    /// Derive an address from caller-provided entropy.
    pub fn new_from_entropy(entropy: &[u8]) -> Self {
        let mut input = Vec::with_capacity(entropy.len() + 8);
        input.extend_from_slice(b"address:");
        input.extend_from_slice(entropy);
        Self(Field::new(hash::hash(&input)))
    }

    /// Interpret a field element as an address
    pub fn from_field(field: Field) -> Self {
        Self(field)
    }

    /// The address as a field element
    pub fn to_field(self) -> Field {
        self.0
    }

    /// True for the reserved zero address
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Address {
    type Err = SlowGateError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(Self(s.parse()?))
    }
}

impl From<Field> for Address {
    fn from(field: Field) -> Self {
        Self(field)
    }
}

impl From<Address> for Field {
    fn from(address: Address) -> Self {
        address.0
    }
}

/// Integer key of a tree entry; doubles as the leaf index.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Slot(pub u64);

impl Slot {
    /// Create a slot from its index
    pub fn new(index: u64) -> Self {
        Self(index)
    }

    /// The leaf index this slot occupies
    pub fn index(&self) -> u64 {
        self.0
    }

    /// Derive a slot in `[0, 2^depth)` from a domain label and an address.
    ///
    /// Used to give every proxy sharing a tree its own reserved slot.
    pub fn derive(label: &[u8], owner: &Address, depth: u8) -> Self {
        let mut input = Vec::with_capacity(label.len() + 32);
        input.extend_from_slice(label);
        input.extend_from_slice(owner.0.as_bytes());
        let digest = hash::hash(&input);
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        let raw = u64::from_be_bytes(head);
        if depth >= 64 {
            Self(raw)
        } else {
            Self(raw & ((1u64 << depth) - 1))
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot-{}", self.0)
    }
}

impl From<u64> for Slot {
    fn from(index: u64) -> Self {
        Self(index)
    }
}
