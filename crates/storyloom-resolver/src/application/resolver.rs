//! The source fallback chain.

use std::sync::Arc;

use storyloom_core::error::DomainError;
use storyloom_core::ids::NodeId;
use storyloom_core::node::Node;
use storyloom_core::source::{NodeSource, StoryContext};
use tracing::{debug, instrument, warn};

use crate::config::ResolverConfig;
use crate::domain::graph::StoryGraph;
use crate::sources::{
    BackendSource, EmbeddedSource, HttpManifestFetcher, ManifestSource, RestStoryBackend,
};

/// Resolves nodes by asking each source in order. The first source that
/// knows the node wins; a source error stops the chain.
#[derive(Clone)]
pub struct NodeResolver {
    sources: Vec<Arc<dyn NodeSource>>,
}

impl std::fmt::Debug for NodeResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeResolver")
            .field("sources", &self.source_names())
            .finish()
    }
}

impl NodeResolver {
    /// Creates a resolver over `sources`, consulted in order.
    #[must_use]
    pub fn new(sources: Vec<Arc<dyn NodeSource>>) -> Self {
        Self { sources }
    }

    /// Builds the standard chain: structured backend (when configured),
    /// remote manifests, then the bundled manifest.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the bundled manifest is malformed.
    pub fn from_config(config: &ResolverConfig) -> Result<Self, DomainError> {
        let mut sources: Vec<Arc<dyn NodeSource>> = Vec::with_capacity(3);
        if let Some(url) = &config.backend_url {
            let key = config.backend_key.as_deref().unwrap_or_default();
            sources.push(Arc::new(BackendSource::new(RestStoryBackend::new(
                url,
                key,
                config.http_timeout,
            ))));
        }
        sources.push(Arc::new(ManifestSource::new(
            HttpManifestFetcher::new(config.http_timeout),
            config.normalize.clone(),
        )));
        sources.push(Arc::new(EmbeddedSource::bundled()?));
        Ok(Self::new(sources))
    }

    /// Names of the sources, in consultation order.
    #[must_use]
    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Resolves `node_id` within `story`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NodeNotFound` if no source knows the node, or
    /// the first source error encountered.
    #[instrument(skip(self, story), fields(story_id = %story.story_id))]
    pub async fn resolve(&self, node_id: &NodeId, story: &StoryContext) -> Result<Node, DomainError> {
        for source in &self.sources {
            match source.resolve(node_id, story).await {
                Ok(Some(node)) => {
                    debug!(source = source.name(), "node resolved");
                    return Ok(node);
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(source = source.name(), error = %err, "source failed");
                    return Err(err);
                }
            }
        }
        Err(DomainError::NodeNotFound {
            story_id: story.story_id.clone(),
            node_id: node_id.clone(),
        })
    }

    /// Resolves the first node of `story`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::StoryNotFound` if no source knows the story, or
    /// the first source error encountered.
    #[instrument(skip(self, story), fields(story_id = %story.story_id))]
    pub async fn resolve_start(&self, story: &StoryContext) -> Result<Node, DomainError> {
        for source in &self.sources {
            if let Some(node) = source.resolve_start(story).await? {
                debug!(source = source.name(), node_id = %node.id, "start resolved");
                return Ok(node);
            }
        }
        Err(DomainError::StoryNotFound(story.story_id.clone()))
    }

    /// Loads every node of `story` from the first source holding it.
    ///
    /// The graph's version hash is the sha256 of its serialized nodes.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::StoryNotFound` if no source holds the story, or
    /// the first source error encountered.
    #[instrument(skip(self, story), fields(story_id = %story.story_id))]
    pub async fn story_graph(&self, story: &StoryContext) -> Result<StoryGraph, DomainError> {
        for source in &self.sources {
            let Some(nodes) = source.load_graph(story).await?.filter(|n| !n.is_empty()) else {
                continue;
            };
            let start = match source.resolve_start(story).await? {
                Some(start) => start.id,
                None => nodes[0].id.clone(),
            };
            let digest = serde_json::to_string(&nodes)
                .map_err(|e| DomainError::Infrastructure(format!("graph digest failed: {e}")))?;
            let graph = StoryGraph::new(story.story_id.clone(), start, nodes)?
                .with_source_digest(&digest);
            debug!(source = source.name(), nodes = graph.len(), "graph loaded");
            return Ok(graph);
        }
        Err(DomainError::StoryNotFound(story.story_id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storyloom_core::ids::StoryId;
    use storyloom_test_support::{
        EmptyNodeSource, FOREST_STORY, FailingNodeSource, InMemoryNodeSource, forest_nodes,
    };

    fn forest() -> StoryContext {
        StoryContext::new(FOREST_STORY)
    }

    #[tokio::test]
    async fn test_first_source_with_the_node_wins() {
        // Arrange
        let primary = Arc::new(InMemoryNodeSource::new("primary", forest_nodes()));
        let secondary = Arc::new(InMemoryNodeSource::new("secondary", forest_nodes()));
        let resolver = NodeResolver::new(vec![primary.clone(), secondary.clone()]);

        // Act
        let node = resolver.resolve(&NodeId::from("B"), &forest()).await.unwrap();

        // Assert
        assert_eq!(node.id.as_str(), "B");
        assert_eq!(primary.resolve_calls(), 1);
        assert_eq!(secondary.resolve_calls(), 0);
    }

    #[tokio::test]
    async fn test_absent_node_falls_through_to_later_sources() {
        let fallback = Arc::new(InMemoryNodeSource::new("fallback", forest_nodes()));
        let resolver = NodeResolver::new(vec![Arc::new(EmptyNodeSource), fallback.clone()]);

        let node = resolver.resolve(&NodeId::from("D"), &forest()).await.unwrap();

        assert_eq!(node.id.as_str(), "D");
        assert_eq!(fallback.resolve_calls(), 1);
    }

    #[tokio::test]
    async fn test_transport_error_stops_the_chain() {
        let fallback = Arc::new(InMemoryNodeSource::new("fallback", forest_nodes()));
        let resolver = NodeResolver::new(vec![Arc::new(FailingNodeSource), fallback.clone()]);

        let result = resolver.resolve(&NodeId::from("A"), &forest()).await;

        assert!(result.unwrap_err().is_transport());
        assert_eq!(fallback.resolve_calls(), 0);
    }

    #[tokio::test]
    async fn test_unknown_node_is_node_not_found() {
        let resolver = NodeResolver::new(vec![
            Arc::new(EmptyNodeSource),
            Arc::new(InMemoryNodeSource::new("mem", forest_nodes())),
        ]);

        let result = resolver.resolve(&NodeId::from("Z"), &forest()).await;

        match result.unwrap_err() {
            DomainError::NodeNotFound { story_id, node_id } => {
                assert_eq!(story_id, StoryId::from(FOREST_STORY));
                assert_eq!(node_id, NodeId::from("Z"));
            }
            other => panic!("expected NodeNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_resolve_start_and_unknown_story() {
        let resolver = NodeResolver::new(vec![Arc::new(
            InMemoryNodeSource::new("mem", forest_nodes()).for_story(FOREST_STORY),
        )]);

        let start = resolver.resolve_start(&forest()).await.unwrap();
        let missing = resolver.resolve_start(&StoryContext::new("desert")).await;

        assert_eq!(start.id.as_str(), "A");
        assert!(matches!(missing, Err(DomainError::StoryNotFound(_))));
    }

    #[tokio::test]
    async fn test_story_graph_skips_sources_without_graphs() {
        // Arrange
        let resolver = NodeResolver::new(vec![
            Arc::new(InMemoryNodeSource::new("no-graph", forest_nodes()).without_graph()),
            Arc::new(InMemoryNodeSource::new("mem", forest_nodes()).with_start("A")),
        ]);

        // Act
        let graph = resolver.story_graph(&forest()).await.unwrap();

        // Assert
        assert_eq!(graph.len(), 4);
        assert_eq!(graph.start_node_id().as_str(), "A");
        assert_eq!(graph.total_endings(), 1);
        assert!(graph.version_hash().is_some());
    }

    #[test]
    fn test_from_config_builds_the_standard_chain() {
        let without_backend = NodeResolver::from_config(&ResolverConfig::default()).unwrap();
        let with_backend = NodeResolver::from_config(&ResolverConfig {
            backend_url: Some("https://db.test/rest/v1".to_owned()),
            ..ResolverConfig::default()
        })
        .unwrap();

        assert_eq!(without_backend.source_names(), vec!["manifest", "embedded"]);
        assert_eq!(
            with_backend.source_names(),
            vec!["backend", "manifest", "embedded"]
        );
    }

    #[tokio::test]
    async fn test_from_config_serves_the_bundled_story() {
        let resolver = NodeResolver::from_config(&ResolverConfig::default()).unwrap();

        let start = resolver.resolve_start(&forest()).await.unwrap();

        assert_eq!(start.id.as_str(), "scene_01_p1_d0");
    }
}
