//! In-memory implementation of the `KeyValueStore` trait.

use std::collections::HashMap;
use std::sync::Mutex;

use storyloom_core::error::DomainError;
use storyloom_core::store::KeyValueStore;

/// A store that lives as long as the process. Used for guest sessions.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with one entry.
    #[must_use]
    pub fn with_entry(key: impl Into<String>, value: impl Into<String>) -> Self {
        let store = Self::new();
        if let Ok(mut entries) = store.entries.lock() {
            entries.insert(key.into(), value.into());
        }
        store
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, DomainError> {
        self.entries
            .lock()
            .map_err(|_| DomainError::Infrastructure("memory store lock poisoned".into()))
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, DomainError> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<(), DomainError> {
        self.entries()?.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), DomainError> {
        self.entries()?.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_remove() {
        // Arrange
        let store = MemoryKeyValueStore::new();

        // Act
        store.put("k", "v1").unwrap();
        store.put("k", "v2").unwrap();
        let read = store.get("k").unwrap();
        store.remove("k").unwrap();

        // Assert
        assert_eq!(read.as_deref(), Some("v2"));
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn test_with_entry_is_readable() {
        let store = MemoryKeyValueStore::with_entry("k", "v");

        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
    }
}
