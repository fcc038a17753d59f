//! Test node sources — mock `NodeSource` implementations for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use storyloom_core::error::DomainError;
use storyloom_core::ids::{NodeId, StoryId};
use storyloom_core::node::Node;
use storyloom_core::source::{NodeSource, StoryContext};

/// A source backed by a fixed set of nodes. Counts `resolve` calls so tests
/// can assert on fallthrough and caching.
#[derive(Debug)]
pub struct InMemoryNodeSource {
    name: &'static str,
    story: Option<StoryId>,
    start: Option<NodeId>,
    order: Vec<NodeId>,
    nodes: HashMap<NodeId, Node>,
    serves_graph: bool,
    resolve_calls: AtomicUsize,
}

impl InMemoryNodeSource {
    /// Creates a source answering for every story. The first node is the
    /// start node.
    #[must_use]
    pub fn new(name: &'static str, nodes: Vec<Node>) -> Self {
        let order: Vec<NodeId> = nodes.iter().map(|n| n.id.clone()).collect();
        Self {
            name,
            story: None,
            start: order.first().cloned(),
            order,
            nodes: nodes.into_iter().map(|n| (n.id.clone(), n)).collect(),
            serves_graph: true,
            resolve_calls: AtomicUsize::new(0),
        }
    }

    /// Restricts the source to a single story.
    #[must_use]
    pub fn for_story(mut self, story: impl Into<StoryId>) -> Self {
        self.story = Some(story.into());
        self
    }

    /// Overrides the start node.
    #[must_use]
    pub fn with_start(mut self, start: impl Into<NodeId>) -> Self {
        self.start = Some(start.into());
        self
    }

    /// Makes `load_graph` answer `None`.
    #[must_use]
    pub fn without_graph(mut self) -> Self {
        self.serves_graph = false;
        self
    }

    /// Number of `resolve` calls seen so far.
    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }

    fn answers(&self, story: &StoryContext) -> bool {
        self.story.as_ref().is_none_or(|s| *s == story.story_id)
    }
}

#[async_trait]
impl NodeSource for InMemoryNodeSource {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn resolve(
        &self,
        node_id: &NodeId,
        story: &StoryContext,
    ) -> Result<Option<Node>, DomainError> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        if !self.answers(story) {
            return Ok(None);
        }
        Ok(self.nodes.get(node_id).cloned())
    }

    async fn resolve_start(&self, story: &StoryContext) -> Result<Option<Node>, DomainError> {
        if !self.answers(story) {
            return Ok(None);
        }
        Ok(self.start.as_ref().and_then(|id| self.nodes.get(id)).cloned())
    }

    async fn load_graph(&self, story: &StoryContext) -> Result<Option<Vec<Node>>, DomainError> {
        if !self.serves_graph || !self.answers(story) {
            return Ok(None);
        }
        Ok(Some(
            self.order
                .iter()
                .filter_map(|id| self.nodes.get(id).cloned())
                .collect(),
        ))
    }
}

/// A source that never knows anything.
#[derive(Debug)]
pub struct EmptyNodeSource;

#[async_trait]
impl NodeSource for EmptyNodeSource {
    fn name(&self) -> &'static str {
        "empty"
    }

    async fn resolve(
        &self,
        _node_id: &NodeId,
        _story: &StoryContext,
    ) -> Result<Option<Node>, DomainError> {
        Ok(None)
    }

    async fn resolve_start(&self, _story: &StoryContext) -> Result<Option<Node>, DomainError> {
        Ok(None)
    }

    async fn load_graph(&self, _story: &StoryContext) -> Result<Option<Vec<Node>>, DomainError> {
        Ok(None)
    }
}

/// A source whose every call fails with a transport error. Useful for
/// testing error-propagation paths.
#[derive(Debug)]
pub struct FailingNodeSource;

#[async_trait]
impl NodeSource for FailingNodeSource {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn resolve(
        &self,
        _node_id: &NodeId,
        _story: &StoryContext,
    ) -> Result<Option<Node>, DomainError> {
        Err(DomainError::Transport("connection refused".into()))
    }

    async fn resolve_start(&self, _story: &StoryContext) -> Result<Option<Node>, DomainError> {
        Err(DomainError::Transport("connection refused".into()))
    }

    async fn load_graph(&self, _story: &StoryContext) -> Result<Option<Vec<Node>>, DomainError> {
        Err(DomainError::Transport("connection refused".into()))
    }
}
