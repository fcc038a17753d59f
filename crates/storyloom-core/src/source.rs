//! Node source abstraction.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::ids::{NodeId, StoryId};
use crate::node::Node;

/// Where a story's content may be found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryContext {
    /// Story (series) identifier.
    pub story_id: StoryId,
    /// URL of the story's flat-file manifest, if it has one.
    #[serde(default)]
    pub manifest_url: Option<String>,
    /// Base URL for panel images. Overrides the manifest source's own base;
    /// without either, images resolve against the manifest's directory.
    #[serde(default)]
    pub asset_base_url: Option<String>,
}

impl StoryContext {
    /// A context with only a story id.
    #[must_use]
    pub fn new(story_id: impl Into<StoryId>) -> Self {
        Self {
            story_id: story_id.into(),
            manifest_url: None,
            asset_base_url: None,
        }
    }

    /// Sets the manifest URL.
    #[must_use]
    pub fn with_manifest_url(mut self, url: impl Into<String>) -> Self {
        self.manifest_url = Some(url.into());
        self
    }

    /// Sets the asset base URL.
    #[must_use]
    pub fn with_asset_base_url(mut self, url: impl Into<String>) -> Self {
        self.asset_base_url = Some(url.into());
        self
    }
}

/// One backing store the resolver can query.
///
/// Every method distinguishes three outcomes: `Ok(Some(_))` is a hit,
/// `Ok(None)` means the source has nothing for the request and the next
/// source should be asked, `Err(_)` is a failure that must reach the caller.
#[async_trait]
pub trait NodeSource: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Fetches one node.
    async fn resolve(
        &self,
        node_id: &NodeId,
        story: &StoryContext,
    ) -> Result<Option<Node>, DomainError>;

    /// Fetches the story's designated start node.
    async fn resolve_start(&self, story: &StoryContext) -> Result<Option<Node>, DomainError>;

    /// Fetches every node of the story, in a stable order.
    async fn load_graph(&self, story: &StoryContext) -> Result<Option<Vec<Node>>, DomainError>;
}
