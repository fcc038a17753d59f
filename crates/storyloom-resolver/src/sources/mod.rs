//! `NodeSource` implementations, in fallback order.

pub mod backend;
pub mod embedded;
pub mod manifest_source;

pub use backend::{BackendSource, RestStoryBackend, StoryBackend};
pub use embedded::EmbeddedSource;
pub use manifest_source::{HttpManifestFetcher, ManifestFetcher, ManifestSource};
