//! The resolved, indexed node set of one story.

use std::collections::HashMap;

use sha2::{Digest, Sha256};
use storyloom_core::error::DomainError;
use storyloom_core::ids::{NodeId, StoryId};
use storyloom_core::node::Node;

/// All nodes of a story, indexed by id, in source order.
#[derive(Debug, Clone)]
pub struct StoryGraph {
    story_id: StoryId,
    start_node_id: NodeId,
    nodes: Vec<Node>,
    index: HashMap<NodeId, usize>,
    version_hash: Option<String>,
}

impl StoryGraph {
    /// Builds a graph from nodes in source order.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if two nodes share an id or the
    /// start node is not among the nodes.
    pub fn new(
        story_id: StoryId,
        start_node_id: NodeId,
        nodes: Vec<Node>,
    ) -> Result<Self, DomainError> {
        let mut index = HashMap::with_capacity(nodes.len());
        for (position, node) in nodes.iter().enumerate() {
            if index.insert(node.id.clone(), position).is_some() {
                return Err(DomainError::Validation(format!(
                    "duplicate node id {} in story {story_id}",
                    node.id
                )));
            }
        }
        if !index.contains_key(&start_node_id) {
            return Err(DomainError::Validation(format!(
                "start node {start_node_id} missing from story {story_id}"
            )));
        }
        Ok(Self {
            story_id,
            start_node_id,
            nodes,
            index,
            version_hash: None,
        })
    }

    /// Stamps the graph with the sha256 of the document it came from.
    #[must_use]
    pub fn with_source_digest(mut self, source: &str) -> Self {
        self.version_hash = Some(format!("{:x}", Sha256::digest(source.as_bytes())));
        self
    }

    /// The story this graph belongs to.
    #[must_use]
    pub fn story_id(&self) -> &StoryId {
        &self.story_id
    }

    /// Id of the first node of the story.
    #[must_use]
    pub fn start_node_id(&self) -> &NodeId {
        &self.start_node_id
    }

    /// The first node of the story.
    #[must_use]
    pub fn start_node(&self) -> Option<&Node> {
        self.get(&self.start_node_id)
    }

    /// Looks up a node by id.
    #[must_use]
    pub fn get(&self, id: &NodeId) -> Option<&Node> {
        self.index.get(id).map(|&position| &self.nodes[position])
    }

    /// All nodes in source order.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of nodes that end a route.
    #[must_use]
    pub fn total_endings(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_ending()).count()
    }

    /// Hex sha256 of the source manifest, when the graph came from one.
    #[must_use]
    pub fn version_hash(&self) -> Option<&str> {
        self.version_hash.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storyloom_test_support::forest_nodes;

    #[test]
    fn test_graph_indexes_nodes_and_counts_endings() {
        // Arrange / Act
        let graph = StoryGraph::new("forest".into(), "A".into(), forest_nodes()).unwrap();

        // Assert
        assert_eq!(graph.len(), 4);
        assert_eq!(graph.start_node().unwrap().id.as_str(), "A");
        assert!(graph.get(&NodeId::from("C")).is_some());
        assert!(graph.get(&NodeId::from("Z")).is_none());
        assert_eq!(graph.total_endings(), 1);
        assert_eq!(graph.version_hash(), None);
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let result = StoryGraph::new(
            "s".into(),
            "a".into(),
            vec![Node::new("a"), Node::new("a")],
        );

        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_missing_start_is_rejected() {
        let result = StoryGraph::new("s".into(), "zz".into(), vec![Node::new("a")]);

        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_source_digest_is_stable_hex() {
        let a = StoryGraph::new("s".into(), "a".into(), vec![Node::new("a")])
            .unwrap()
            .with_source_digest("{}");
        let b = StoryGraph::new("s".into(), "a".into(), vec![Node::new("a")])
            .unwrap()
            .with_source_digest("{}");

        let hash = a.version_hash().unwrap();
        assert_eq!(hash.len(), 64);
        assert_eq!(Some(hash), b.version_hash());
    }
}
