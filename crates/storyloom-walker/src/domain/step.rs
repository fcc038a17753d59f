//! Results of walker navigation.

use storyloom_core::node::{Choice, Node};
use storyloom_ledger::domain::aggregates::RouteReward;

/// Where a navigation landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// The node now current.
    pub node: Node,
    /// Its choices that pass the story state, in order.
    pub choices: Vec<Choice>,
    /// Visit points granted by this navigation.
    pub points_awarded: u64,
    /// Set when the node ended a route.
    pub route: Option<RouteReward>,
    /// Whether the node ended a route.
    pub is_terminal: bool,
}

/// Result of [`crate::GraphWalker::choose`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChoiceOutcome {
    /// The choice led to another node.
    Advanced(Step),
    /// The choice left the story.
    Exited,
}

/// Size of a story as used for route rewards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoryTotals {
    /// Ending nodes in the story; 0 when unknown.
    pub total_endings: usize,
    /// `None` when the full graph could not be loaded.
    pub total_nodes: Option<usize>,
}

impl StoryTotals {
    /// Totals for a story whose graph is unavailable.
    #[must_use]
    pub fn unknown() -> Self {
        Self {
            total_endings: 0,
            total_nodes: None,
        }
    }
}

/// Whether `node` ends a route given the choices the story state allows:
/// it is marked terminal, it has neither displayable choices nor a
/// successor, or every displayable choice is an exit.
#[must_use]
pub fn ends_route(node: &Node, displayable: &[Choice]) -> bool {
    if node.is_terminal {
        return true;
    }
    if displayable.is_empty() {
        return node.next.is_none();
    }
    displayable.iter().all(Choice::is_exit)
}
