//! Application layer for the Graph Walker.

pub mod walker;
