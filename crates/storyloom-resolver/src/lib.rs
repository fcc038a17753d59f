//! Storyloom — node resolution.
//!
//! Responsible for turning scene/panel manifests into story graphs,
//! fetching nodes from the structured backend, remote manifests and the
//! bundled manifest, and walking that chain in order until a source answers.

pub mod application;
pub mod config;
pub mod domain;
pub mod sources;

pub use application::resolver::NodeResolver;
pub use config::ResolverConfig;
pub use domain::graph::StoryGraph;
