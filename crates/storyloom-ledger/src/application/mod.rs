//! Application services for the ledger.

pub mod ledger;
