//! Storyloom — Story Map Layout.
//!
//! Pure functions that place a story graph on a 2-D canvas and classify
//! each node for a map view.

pub mod config;
pub mod engine;
pub mod status;

pub use config::LayoutConfig;
pub use engine::{LayoutPosition, layout, layout_with};
pub use status::{NodeStatus, classify_nodes};
