//! Storyloom — Progress Ledger.
//!
//! Responsible for the per-account points economy, visited and unlocked
//! sets, cosmetic purchases and preferences, and their write-through
//! persistence.

pub mod application;
pub mod config;
pub mod domain;

pub use application::ledger::{LedgerUpdate, ProgressLedger, SubscriptionId, storage_key};
pub use config::LedgerConfig;
