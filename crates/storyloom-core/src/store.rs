//! Durable key-value store abstraction.

use crate::error::DomainError;

/// A synchronous string key-value store. Writes are durable when `put`
/// returns.
pub trait KeyValueStore: Send + Sync {
    /// Reads the value under `key`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, DomainError>;

    /// Writes `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the write fails.
    fn put(&self, key: &str, value: &str) -> Result<(), DomainError>;

    /// Removes `key`. Removing a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the removal fails.
    fn remove(&self, key: &str) -> Result<(), DomainError>;
}
