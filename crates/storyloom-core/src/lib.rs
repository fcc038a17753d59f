//! Storyloom Core — shared narrative abstractions.
//!
//! This crate defines the node model, the story state fold, and the traits
//! that the resolver, ledger and walker crates meet at. It contains no
//! infrastructure code.

pub mod aggregate;
pub mod clock;
pub mod command;
pub mod error;
pub mod event;
pub mod ids;
pub mod node;
pub mod rich_text;
pub mod source;
pub mod state;
pub mod store;
