//! Test stores — mock `KeyValueStore` implementations for tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use storyloom_core::error::DomainError;
use storyloom_core::store::KeyValueStore;

/// An in-memory store that records every `put` and `remove` in order.
/// Reads and single writes can be made to fail.
#[derive(Debug, Default)]
pub struct RecordingKeyValueStore {
    entries: Mutex<HashMap<String, String>>,
    puts: Mutex<Vec<(String, String)>>,
    removes: Mutex<Vec<String>>,
    failing_reads: AtomicUsize,
    put_attempts: AtomicUsize,
    failing_put: Option<usize>,
}

impl RecordingKeyValueStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding one entry. The seed is not recorded as a put.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn seeded(key: &str, value: &str) -> Self {
        let store = Self::new();
        store
            .entries
            .lock()
            .unwrap()
            .insert(key.to_owned(), value.to_owned());
        store
    }

    /// Makes the next `count` reads fail with an infrastructure error.
    #[must_use]
    pub fn with_failing_reads(self, count: usize) -> Self {
        self.failing_reads.store(count, Ordering::SeqCst);
        self
    }

    /// Makes the `nth` write (1-based) fail with an infrastructure error.
    /// The failed write is neither stored nor recorded.
    #[must_use]
    pub fn with_failing_put(mut self, nth: usize) -> Self {
        self.failing_put = Some(nth);
        self
    }

    /// Returns every `(key, value)` written, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn puts(&self) -> Vec<(String, String)> {
        self.puts.lock().unwrap().clone()
    }

    /// Returns every key removed, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn removes(&self) -> Vec<String> {
        self.removes.lock().unwrap().clone()
    }

    /// Returns the current value for `key`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn value(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }
}

impl KeyValueStore for RecordingKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, DomainError> {
        let pending = self
            .failing_reads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if pending.is_ok() {
            return Err(DomainError::Infrastructure("read timed out".into()));
        }
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<(), DomainError> {
        let attempt = self.put_attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.failing_put == Some(attempt) {
            return Err(DomainError::Infrastructure("disk full".into()));
        }
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_owned(), value.to_owned());
        self.puts
            .lock()
            .unwrap()
            .push((key.to_owned(), value.to_owned()));
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), DomainError> {
        self.entries.lock().unwrap().remove(key);
        self.removes.lock().unwrap().push(key.to_owned());
        Ok(())
    }
}

/// A store whose reads succeed empty and whose writes always fail. Useful
/// for testing persistence-failure paths.
#[derive(Debug)]
pub struct FailingKeyValueStore;

impl KeyValueStore for FailingKeyValueStore {
    fn get(&self, _key: &str) -> Result<Option<String>, DomainError> {
        Ok(None)
    }

    fn put(&self, _key: &str, _value: &str) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("disk full".into()))
    }

    fn remove(&self, _key: &str) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("disk full".into()))
    }
}
