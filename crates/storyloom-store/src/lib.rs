//! Storyloom Store — `KeyValueStore` implementations.
//!
//! The file store keeps one document per key under a data directory; the
//! memory store backs guest sessions and tests.

pub mod file_store;
pub mod memory_store;

pub use file_store::FileKeyValueStore;
pub use memory_store::MemoryKeyValueStore;
