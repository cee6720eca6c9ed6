//! 32-byte field elements
//!
//! Values stored in the tree, addresses and commitments are all opaque 32-byte
//! big-endian words. Serialized as `0x`-prefixed lowercase hex so they are
//! usable as map keys in canonical encodings.

use crate::{Result, SlowGateError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A 32-byte big-endian field element
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Field([u8; 32]);

impl Field {
    /// The zero element. Untouched tree slots read as this value.
    pub const ZERO: Field = Field([0u8; 32]);

    /// Wrap raw bytes
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Build from an unsigned integer (right-aligned, big-endian)
    pub fn from_u64(value: u64) -> Self {
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }

    /// Build from a 128-bit unsigned integer (right-aligned, big-endian)
    pub fn from_u128(value: u128) -> Self {
        let mut bytes = [0u8; 32];
        bytes[16..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }

    /// Interpret as `u64` if the value fits
    pub fn to_u64(&self) -> Option<u64> {
        if self.0[..24].iter().any(|b| *b != 0) {
            return None;
        }
        let mut tail = [0u8; 8];
        tail.copy_from_slice(&self.0[24..]);
        Some(u64::from_be_bytes(tail))
    }

    /// Borrow the raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Copy out the raw bytes
    pub fn to_bytes(self) -> [u8; 32] {
        self.0
    }

    /// True for the zero element
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl From<[u8; 32]> for Field {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl From<u64> for Field {
    fn from(value: u64) -> Self {
        Self::from_u64(value)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form keeps tracing output readable
        write!(f, "Field(0x{}..)", hex::encode(&self.0[..6]))
    }
}

impl FromStr for Field {
    type Err = SlowGateError;

    fn from_str(s: &str) -> Result<Self> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        if digits.len() > 64 {
            return Err(SlowGateError::invalid(format!(
                "field literal has {} hex digits, at most 64 allowed",
                digits.len()
            )));
        }
        // Left-pad so short literals like "0x2a" are accepted
        let padded = format!("{digits:0>64}");
        let decoded = hex::decode(&padded)
            .map_err(|e| SlowGateError::invalid(format!("invalid field literal {s}: {e}")))?;
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&decoded);
        Ok(Self(bytes))
    }
}

impl Serialize for Field {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Field {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
