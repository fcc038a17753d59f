//! Domain layer for the Graph Walker.

pub mod history;
pub mod step;
