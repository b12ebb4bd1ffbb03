use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::traits::{validate_key, DurableStore};

/// In-memory, HashMap-based durable store.
///
/// Intended for tests and embedding. Values are held behind a `RwLock` and
/// cloned on read/write.
pub struct InMemoryDurableStore {
    values: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryDurableStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            values: RwLock::new(HashMap::new()),
        }
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.values.read().map(|map| map.len()).unwrap_or(0)
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total bytes across all stored values.
    pub fn total_bytes(&self) -> u64 {
        self.values
            .read()
            .map(|map| map.values().map(|v| v.len() as u64).sum())
            .unwrap_or(0)
    }
}

impl Default for InMemoryDurableStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DurableStore for InMemoryDurableStore {
    fn read(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        validate_key(key)?;
        let map = self.values.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(map.get(key).cloned())
    }

    fn write(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        validate_key(key)?;
        let mut map = self.values.write().map_err(|_| StoreError::LockPoisoned)?;
        map.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<bool> {
        validate_key(key)?;
        let mut map = self.values.write().map_err(|_| StoreError::LockPoisoned)?;
        Ok(map.remove(key).is_some())
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        let map = self.values.read().map_err(|_| StoreError::LockPoisoned)?;
        let mut keys: Vec<String> = map.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

impl std::fmt::Debug for InMemoryDurableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryDurableStore")
            .field("key_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_and_read() {
        let store = InMemoryDurableStore::new();
        store.write("overworld/state", b"hello").unwrap();
        assert_eq!(store.read("overworld/state").unwrap().unwrap(), b"hello");
    }

    #[test]
    fn write_replaces_previous_value() {
        let store = InMemoryDurableStore::new();
        store.write("k", b"first").unwrap();
        store.write("k", b"second").unwrap();
        assert_eq!(store.read("k").unwrap().unwrap(), b"second");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn read_missing_returns_none() {
        let store = InMemoryDurableStore::new();
        assert!(store.read("missing").unwrap().is_none());
        assert!(!store.exists("missing").unwrap());
    }

    #[test]
    fn delete_present_and_missing() {
        let store = InMemoryDurableStore::new();
        store.write("gone", b"x").unwrap();
        assert!(store.delete("gone").unwrap());
        assert!(!store.exists("gone").unwrap());
        assert!(!store.delete("gone").unwrap());
    }

    #[test]
    fn keys_are_sorted() {
        let store = InMemoryDurableStore::new();
        store.write("b", b"2").unwrap();
        store.write("a", b"1").unwrap();
        store.write("c/d", b"3").unwrap();
        assert_eq!(store.keys().unwrap(), vec!["a", "b", "c/d"]);
    }

    #[test]
    fn invalid_keys_rejected() {
        let store = InMemoryDurableStore::new();
        assert!(matches!(
            store.write("../escape", b"x"),
            Err(StoreError::InvalidKey(_))
        ));
    }

    #[test]
    fn len_and_total_bytes() {
        let store = InMemoryDurableStore::new();
        assert!(store.is_empty());
        store.write("a", b"12345").unwrap();
        store.write("b", b"123456789").unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.total_bytes(), 14);
    }

    #[test]
    fn debug_format() {
        let store = InMemoryDurableStore::new();
        store.write("x", b"x").unwrap();
        let debug = format!("{store:?}");
        assert!(debug.contains("InMemoryDurableStore"));
        assert!(debug.contains("key_count"));
    }
}
