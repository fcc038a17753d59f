//! Commands for the progress ledger.

use storyloom_core::command::Command;
use storyloom_core::ids::{NodeId, StoryId};

use super::state::ItemCategory;

/// Command to report that a route reached an ending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompleteRoute {
    /// The story.
    pub story_id: StoryId,
    /// The ending node reached.
    pub ending_id: NodeId,
    /// Distinct nodes on the route.
    pub route_length: usize,
    /// Endings the story has in total; 0 when unknown.
    pub total_endings: usize,
    /// Nodes the story has in total, when known.
    pub total_nodes: Option<usize>,
}

impl Command for CompleteRoute {
    fn command_type(&self) -> &'static str {
        "ledger.complete_route"
    }
}

/// Command to record the player reaching a node: the choice that led there,
/// the visit and, at an ending, the completed route. Applied as one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arrive {
    /// The story.
    pub story_id: StoryId,
    /// The node reached.
    pub node_id: NodeId,
    /// Node and label of the choice taken to get here.
    pub via: Option<(NodeId, String)>,
    /// Set when the node ends a route.
    pub route: Option<CompleteRoute>,
}

impl Command for Arrive {
    fn command_type(&self) -> &'static str {
        "ledger.arrive"
    }
}

/// Command to buy a cosmetic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Purchase {
    /// Item category.
    pub category: ItemCategory,
    /// Item id.
    pub item_id: String,
    /// Price in points.
    pub cost: u64,
}

impl Command for Purchase {
    fn command_type(&self) -> &'static str {
        "ledger.purchase"
    }
}
