//! Application services for node resolution.

pub mod resolver;
