//! Domain events for the progress ledger.

use serde::{Deserialize, Serialize};
use storyloom_core::event::{DomainEvent, EventMetadata};
use storyloom_core::ids::{NodeId, StoryId};

use super::state::{ItemCategory, Preference};

/// Event type for `NodeVisited`.
pub const NODE_VISITED_EVENT_TYPE: &str = "ledger.node_visited";
/// Event type for `ChoiceRecorded`.
pub const CHOICE_RECORDED_EVENT_TYPE: &str = "ledger.choice_recorded";
/// Event type for `RouteCompleted`.
pub const ROUTE_COMPLETED_EVENT_TYPE: &str = "ledger.route_completed";
/// Event type for `EndingUnlocked`.
pub const ENDING_UNLOCKED_EVENT_TYPE: &str = "ledger.ending_unlocked";
/// Event type for `StoryCompleted`.
pub const STORY_COMPLETED_EVENT_TYPE: &str = "ledger.story_completed";
/// Event type for `ItemPurchased`.
pub const ITEM_PURCHASED_EVENT_TYPE: &str = "ledger.item_purchased";
/// Event type for `PreferenceChanged`.
pub const PREFERENCE_CHANGED_EVENT_TYPE: &str = "ledger.preference_changed";
/// Event type for `FavoriteToggled`.
pub const FAVORITE_TOGGLED_EVENT_TYPE: &str = "ledger.favorite_toggled";
/// Event type for `LedgerReset`.
pub const LEDGER_RESET_EVENT_TYPE: &str = "ledger.reset";

/// Emitted the first time a node of a story is visited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeVisited {
    /// The story.
    pub story_id: StoryId,
    /// The node.
    pub node_id: NodeId,
    /// Points granted for the visit.
    pub points_awarded: u64,
}

/// Emitted when the player picks a choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceRecorded {
    /// The story.
    pub story_id: StoryId,
    /// Node the choice was made on.
    pub node_id: NodeId,
    /// Label of the chosen option.
    pub label: String,
    /// Where the choice led; `None` for exits.
    pub target: Option<NodeId>,
}

/// Emitted each time a route reaches an ending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteCompleted {
    /// The story.
    pub story_id: StoryId,
    /// The ending reached.
    pub ending_id: NodeId,
    /// Distinct nodes on the route.
    pub route_length: usize,
    /// Points granted for the route.
    pub route_bonus: u64,
}

/// Emitted the first time an ending is reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndingUnlocked {
    /// The story.
    pub story_id: StoryId,
    /// The ending.
    pub ending_id: NodeId,
}

/// Emitted once per story when every ending has been unlocked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryCompleted {
    /// The story.
    pub story_id: StoryId,
    /// Points granted for completion.
    pub completion_bonus: u64,
}

/// Emitted when a cosmetic is bought.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPurchased {
    /// Item category.
    pub category: ItemCategory,
    /// Item id.
    pub item_id: String,
    /// Points spent.
    pub cost: u64,
}

/// Emitted when an active cosmetic changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceChanged {
    /// The new selection.
    pub preference: Preference,
}

/// Emitted when a series is added to or removed from favourites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteToggled {
    /// The series.
    pub series_id: String,
    /// Whether the series is now a favourite.
    pub favorite: bool,
}

/// Emitted when the whole record is wiped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerReset {
    /// Balance of the fresh record.
    pub starting_points: u64,
}

/// Event payload variants for the progress ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEventKind {
    /// A node was visited for the first time.
    NodeVisited(NodeVisited),
    /// A choice was made.
    ChoiceRecorded(ChoiceRecorded),
    /// A route reached an ending.
    RouteCompleted(RouteCompleted),
    /// An ending was reached for the first time.
    EndingUnlocked(EndingUnlocked),
    /// A story's completion bonus was paid.
    StoryCompleted(StoryCompleted),
    /// A cosmetic was bought.
    ItemPurchased(ItemPurchased),
    /// An active cosmetic changed.
    PreferenceChanged(PreferenceChanged),
    /// A favourite was toggled.
    FavoriteToggled(FavoriteToggled),
    /// The record was wiped.
    LedgerReset(LedgerReset),
}

/// Domain event envelope for the progress ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: LedgerEventKind,
}

impl LedgerEventKind {
    /// The event type string of this payload.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::NodeVisited(_) => NODE_VISITED_EVENT_TYPE,
            Self::ChoiceRecorded(_) => CHOICE_RECORDED_EVENT_TYPE,
            Self::RouteCompleted(_) => ROUTE_COMPLETED_EVENT_TYPE,
            Self::EndingUnlocked(_) => ENDING_UNLOCKED_EVENT_TYPE,
            Self::StoryCompleted(_) => STORY_COMPLETED_EVENT_TYPE,
            Self::ItemPurchased(_) => ITEM_PURCHASED_EVENT_TYPE,
            Self::PreferenceChanged(_) => PREFERENCE_CHANGED_EVENT_TYPE,
            Self::FavoriteToggled(_) => FAVORITE_TOGGLED_EVENT_TYPE,
            Self::LedgerReset(_) => LEDGER_RESET_EVENT_TYPE,
        }
    }
}

impl DomainEvent for LedgerEvent {
    fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}
