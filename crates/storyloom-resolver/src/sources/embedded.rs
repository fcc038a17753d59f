//! Manifests compiled into the binary.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use storyloom_core::error::DomainError;
use storyloom_core::ids::{NodeId, StoryId};
use storyloom_core::node::Node;
use storyloom_core::source::{NodeSource, StoryContext};
use tracing::debug;

use crate::domain::graph::StoryGraph;
use crate::domain::manifest::{Manifest, ManifestFormat};
use crate::domain::normalize::{NormalizeOptions, normalize};

/// Story id of the bundled demo.
pub const BUNDLED_STORY_ID: &str = "forest";

const BUNDLED_FOREST: &str = include_str!("../../assets/forest_demo.json");

/// Last source of the chain: graphs normalized once at construction.
#[derive(Debug, Default, Clone)]
pub struct EmbeddedSource {
    graphs: HashMap<StoryId, Arc<StoryGraph>>,
}

impl EmbeddedSource {
    /// Creates a source with no stories.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a source holding the bundled demo story.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the bundled manifest is malformed.
    pub fn bundled() -> Result<Self, DomainError> {
        Self::new().with_manifest(
            BUNDLED_STORY_ID,
            BUNDLED_FOREST,
            ManifestFormat::Json,
            &NormalizeOptions::default().with_asset_base_url(format!("/assets/{BUNDLED_STORY_ID}")),
        )
    }

    /// Adds an already built graph.
    #[must_use]
    pub fn with_graph(mut self, graph: StoryGraph) -> Self {
        self.graphs.insert(graph.story_id().clone(), Arc::new(graph));
        self
    }

    /// Parses and normalizes a manifest document, then adds it.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the manifest cannot be parsed or
    /// normalized.
    pub fn with_manifest(
        self,
        story_id: impl Into<StoryId>,
        text: &str,
        format: ManifestFormat,
        options: &NormalizeOptions,
    ) -> Result<Self, DomainError> {
        let story_id = story_id.into();
        let manifest = Manifest::parse(text, format)?;
        let graph = normalize(&story_id, &manifest, options)?.with_source_digest(text);
        debug!(story_id = %story_id, nodes = graph.len(), "embedded manifest loaded");
        Ok(self.with_graph(graph))
    }

    fn graph(&self, story: &StoryContext) -> Option<&Arc<StoryGraph>> {
        self.graphs.get(&story.story_id)
    }
}

#[async_trait]
impl NodeSource for EmbeddedSource {
    fn name(&self) -> &'static str {
        "embedded"
    }

    async fn resolve(
        &self,
        node_id: &NodeId,
        story: &StoryContext,
    ) -> Result<Option<Node>, DomainError> {
        Ok(self.graph(story).and_then(|g| g.get(node_id)).cloned())
    }

    async fn resolve_start(&self, story: &StoryContext) -> Result<Option<Node>, DomainError> {
        Ok(self.graph(story).and_then(|g| g.start_node()).cloned())
    }

    async fn load_graph(&self, story: &StoryContext) -> Result<Option<Vec<Node>>, DomainError> {
        Ok(self.graph(story).map(|g| g.nodes().to_vec()))
    }
}
