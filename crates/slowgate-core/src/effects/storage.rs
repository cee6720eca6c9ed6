//! Persistent key-value storage supplied by the host ledger
//!
//! Each contract instance owns the keys under its own address. Values are
//! opaque bytes; contracts persist their state as DAG-CBOR through
//! [`load_state`] / [`store_state`].

use crate::{serialization, Address, SlowGateError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Error type for storage operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum StorageError {
    #[error("Invalid key: {reason}")]
    InvalidKey { reason: String },
    #[error("Read failed: {0}")]
    ReadFailed(String),
    #[error("Write failed: {0}")]
    WriteFailed(String),
}

impl From<StorageError> for SlowGateError {
    fn from(err: StorageError) -> Self {
        SlowGateError::storage(err.to_string())
    }
}

/// Byte-level storage operations
pub trait StorageEffects: Send + Sync {
    /// Store `value` under `key`, replacing any previous value
    fn store(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

    /// Fetch the value under `key`
    fn retrieve(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Delete `key`. Returns whether it existed.
    fn remove(&self, key: &str) -> Result<bool, StorageError>;

    /// Keys starting with `prefix` (all keys if `None`), sorted
    fn list_keys(&self, prefix: Option<&str>) -> Result<Vec<String>, StorageError>;

    /// True if `key` holds a value
    fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.retrieve(key)?.is_some())
    }
}

impl<T: StorageEffects + ?Sized> StorageEffects for Arc<T> {
    fn store(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        (**self).store(key, value)
    }

    fn retrieve(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        (**self).retrieve(key)
    }

    fn remove(&self, key: &str) -> Result<bool, StorageError> {
        (**self).remove(key)
    }

    fn list_keys(&self, prefix: Option<&str>) -> Result<Vec<String>, StorageError> {
        (**self).list_keys(prefix)
    }
}

/// Storage key prefix for contract state.
pub const CONTRACT_STATE_PREFIX: &str = "contracts/";

/// Storage key holding the state of the contract at `address`
pub fn contract_key(address: &Address) -> String {
    format!("{CONTRACT_STATE_PREFIX}{}", hex::encode(address.0.as_bytes()))
}

/// Load and decode the state of the contract at `address`
pub fn load_state<T, S>(storage: &S, address: &Address) -> crate::Result<Option<T>>
where
    T: for<'de> Deserialize<'de>,
    S: StorageEffects + ?Sized,
{
    match storage.retrieve(&contract_key(address))? {
        Some(bytes) => Ok(Some(serialization::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

/// Encode and store the state of the contract at `address`
pub fn store_state<T, S>(storage: &S, address: &Address, state: &T) -> crate::Result<()>
where
    T: Serialize,
    S: StorageEffects + ?Sized,
{
    let bytes = serialization::to_vec(state)?;
    storage.store(&contract_key(address), bytes)?;
    Ok(())
}
