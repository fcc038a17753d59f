//! Shared test mocks and fixtures for the Storyloom engine.

mod clock;
mod fixtures;
mod source;
mod store;
mod tracing;

pub use clock::FixedClock;
pub use fixtures::{FOREST_STORY, forest_nodes};
pub use source::{EmptyNodeSource, FailingNodeSource, InMemoryNodeSource};
pub use store::{FailingKeyValueStore, RecordingKeyValueStore};
pub use tracing::init_test_tracing;
