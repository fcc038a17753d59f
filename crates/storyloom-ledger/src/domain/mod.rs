//! Ledger domain model.

pub mod aggregates;
pub mod commands;
pub mod events;
pub mod state;
