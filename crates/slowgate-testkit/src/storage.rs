//! In-memory storage handler

use parking_lot::RwLock;
use slowgate_core::effects::{StorageEffects, StorageError};
use std::collections::HashMap;
use std::sync::Arc;

/// Memory storage handler for testing
#[derive(Debug, Clone, Default)]
pub struct MemoryStorageHandler {
    data: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryStorageHandler {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// True if nothing is stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of every stored entry
    pub fn snapshot(&self) -> HashMap<String, Vec<u8>> {
        self.data.read().clone()
    }
}

impl StorageEffects for MemoryStorageHandler {
    fn store(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey {
                reason: "empty key".to_string(),
            });
        }
        self.data.write().insert(key.to_string(), value);
        Ok(())
    }

    fn retrieve(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.data.read().get(key).cloned())
    }

    fn remove(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.data.write().remove(key).is_some())
    }

    fn list_keys(&self, prefix: Option<&str>) -> Result<Vec<String>, StorageError> {
        let data = self.data.read();
        let mut keys: Vec<String> = match prefix {
            Some(prefix) => data.keys().filter(|k| k.starts_with(prefix)).cloned().collect(),
            None => data.keys().cloned().collect(),
        };
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slowgate_core::effects::{load_state, store_state};
    use slowgate_core::Address;

    #[test]
    fn test_store_retrieve_remove() {
        let storage = MemoryStorageHandler::new();
        storage.store("a/1", vec![1]).unwrap();
        storage.store("a/2", vec![2]).unwrap();
        storage.store("b/1", vec![3]).unwrap();

        assert_eq!(storage.retrieve("a/2").unwrap(), Some(vec![2]));
        assert_eq!(storage.list_keys(Some("a/")).unwrap(), vec!["a/1", "a/2"]);
        assert!(storage.remove("a/1").unwrap());
        assert!(!storage.remove("a/1").unwrap());
        assert!(!storage.exists("a/1").unwrap());
        assert_eq!(storage.len(), 2);
    }

    #[test]
    fn test_empty_key_rejected() {
        let storage = MemoryStorageHandler::new();
        assert!(storage.store("", vec![]).is_err());
        assert!(storage.is_empty());
    }

    #[test]
    fn test_contract_state_roundtrip() {
        let storage = MemoryStorageHandler::new();
        let owner = Address::new_from_entropy(b"contract");
        store_state(&storage, &owner, &(7u64, owner)).unwrap();

        let loaded: Option<(u64, Address)> = load_state(&storage, &owner).unwrap();
        assert_eq!(loaded, Some((7, owner)));

        let missing: Option<u64> =
            load_state(&storage, &Address::new_from_entropy(b"other")).unwrap();
        assert_eq!(missing, None);
    }
}
