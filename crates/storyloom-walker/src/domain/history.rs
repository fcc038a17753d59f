//! The ordered list of nodes entered in the current walk.

use std::collections::HashSet;

use storyloom_core::ids::NodeId;

/// Nodes entered in the current walk, in order. Repeats are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkHistory {
    entries: Vec<NodeId>,
}

impl WalkHistory {
    /// An empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a node.
    pub fn push(&mut self, node_id: NodeId) {
        self.entries.push(node_id);
    }

    /// Empties the history.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Cuts the history back to the most recent occurrence of `node_id`,
    /// keeping it. Returns `false` and leaves the history alone when the
    /// node was never entered.
    pub fn truncate_to(&mut self, node_id: &NodeId) -> bool {
        match self.entries.iter().rposition(|id| id == node_id) {
            Some(position) => {
                self.entries.truncate(position + 1);
                true
            }
            None => false,
        }
    }

    /// Number of different nodes in the walk.
    #[must_use]
    pub fn distinct_len(&self) -> usize {
        self.entries.iter().collect::<HashSet<_>>().len()
    }

    /// Entered nodes, oldest first.
    #[must_use]
    pub fn entries(&self) -> &[NodeId] {
        &self.entries
    }

    /// Number of entries, repeats included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been entered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
