//! DAG-CBOR serialization for persisted contract state
//!
//! DAG-CBOR is the canonical encoding: deterministic, so the same state always
//! produces the same bytes and the same `hash_canonical` digest.

use crate::crypto::hash;
use crate::SlowGateError;
use serde::{Deserialize, Serialize};

/// Serialize any serde-compatible type to DAG-CBOR bytes
pub fn to_vec<T: Serialize>(value: &T) -> crate::Result<Vec<u8>> {
    serde_ipld_dagcbor::to_vec(value).map_err(|e| {
        SlowGateError::serialization(format!("Failed to serialize to DAG-CBOR: {e}"))
    })
}

/// Deserialize DAG-CBOR bytes to any serde-compatible type
pub fn from_slice<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> crate::Result<T> {
    serde_ipld_dagcbor::from_slice(bytes).map_err(|e| {
        SlowGateError::serialization(format!("Failed to deserialize DAG-CBOR: {e}"))
    })
}

/// Serialize to DAG-CBOR and return the canonical hash
pub fn hash_canonical<T: Serialize>(value: &T) -> crate::Result<[u8; 32]> {
    let bytes = to_vec(value)?;
    Ok(hash::hash(&bytes))
}
