//! Manifest model, normalization and the resolved story graph.

pub mod branch;
pub mod graph;
pub mod manifest;
pub mod normalize;
