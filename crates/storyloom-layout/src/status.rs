//! Map status of each node given a player's progress.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use storyloom_core::ids::NodeId;
use storyloom_core::node::Node;

/// How a node is shown on the story map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    /// Where the walk currently is.
    Current,
    /// Visited before.
    Visited,
    /// Not visited but one step away from a visited or current node.
    Available,
    /// Everything else.
    Locked,
}

/// Classifies every node. `current` wins over `visited`.
#[must_use]
pub fn classify_nodes(
    nodes: &[Node],
    visited: &BTreeSet<NodeId>,
    current: Option<&NodeId>,
) -> BTreeMap<NodeId, NodeStatus> {
    let reached = |id: &NodeId| visited.contains(id) || current == Some(id);
    let frontier: BTreeSet<&NodeId> = nodes
        .iter()
        .filter(|node| reached(&node.id))
        .flat_map(|node| node.children.iter())
        .collect();

    let mut statuses = BTreeMap::new();
    for node in nodes {
        let status = if current == Some(&node.id) {
            NodeStatus::Current
        } else if visited.contains(&node.id) {
            NodeStatus::Visited
        } else if frontier.contains(&node.id) {
            NodeStatus::Available
        } else {
            NodeStatus::Locked
        };
        statuses.entry(node.id.clone()).or_insert(status);
    }
    statuses
}
