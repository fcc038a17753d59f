//! The persisted progress document and its value types.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storyloom_core::ids::{NodeId, StoryId};
use uuid::Uuid;

/// Points a fresh account starts with.
pub const STARTING_POINTS: u64 = 500;
/// Theme every account owns.
pub const DEFAULT_THEME: &str = "default";
/// Font every account owns.
pub const DEFAULT_FONT: &str = "Inter";
/// Border style every account owns.
pub const DEFAULT_BORDER: &str = "black";
/// Font size, in percent.
pub const DEFAULT_FONT_SIZE: u16 = 100;

/// Purchasable cosmetic category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemCategory {
    /// Colour themes.
    Themes,
    /// Reader fonts.
    Fonts,
    /// Visual effects.
    Effects,
    /// Panel border styles.
    Borders,
}

impl ItemCategory {
    /// The item of this category every account owns, if any.
    #[must_use]
    pub fn default_item(self) -> Option<&'static str> {
        match self {
            Self::Themes => Some(DEFAULT_THEME),
            Self::Fonts => Some(DEFAULT_FONT),
            Self::Borders => Some(DEFAULT_BORDER),
            Self::Effects => None,
        }
    }
}

/// An active cosmetic selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preference {
    /// Active theme.
    Theme(String),
    /// Active font.
    Font(String),
    /// Font size, in percent.
    FontSize(u16),
    /// Active border style.
    BorderStyle(String),
}

/// Currently active cosmetics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Active theme.
    pub theme: String,
    /// Active font.
    pub font: String,
    /// Font size, in percent.
    pub font_size: u16,
    /// Active border style.
    pub border_style: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: DEFAULT_THEME.to_owned(),
            font: DEFAULT_FONT.to_owned(),
            font_size: DEFAULT_FONT_SIZE,
            border_style: DEFAULT_BORDER.to_owned(),
        }
    }
}

impl Preferences {
    pub(crate) fn set(&mut self, preference: &Preference) {
        match preference {
            Preference::Theme(theme) => self.theme.clone_from(theme),
            Preference::Font(font) => self.font.clone_from(font),
            Preference::FontSize(size) => self.font_size = *size,
            Preference::BorderStyle(style) => self.border_style.clone_from(style),
        }
    }
}

/// Owned cosmetics by category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Purchases {
    /// Owned themes.
    pub themes: BTreeSet<String>,
    /// Owned fonts.
    pub fonts: BTreeSet<String>,
    /// Owned effects.
    pub effects: BTreeSet<String>,
    /// Owned border styles.
    pub borders: BTreeSet<String>,
}

impl Default for Purchases {
    fn default() -> Self {
        Self {
            themes: BTreeSet::from([DEFAULT_THEME.to_owned()]),
            fonts: BTreeSet::from([DEFAULT_FONT.to_owned()]),
            effects: BTreeSet::new(),
            borders: BTreeSet::from([DEFAULT_BORDER.to_owned()]),
        }
    }
}

impl Purchases {
    /// Items owned in `category`.
    #[must_use]
    pub fn get(&self, category: ItemCategory) -> &BTreeSet<String> {
        match category {
            ItemCategory::Themes => &self.themes,
            ItemCategory::Fonts => &self.fonts,
            ItemCategory::Effects => &self.effects,
            ItemCategory::Borders => &self.borders,
        }
    }

    pub(crate) fn get_mut(&mut self, category: ItemCategory) -> &mut BTreeSet<String> {
        match category {
            ItemCategory::Themes => &mut self.themes,
            ItemCategory::Fonts => &mut self.fonts,
            ItemCategory::Effects => &mut self.effects,
            ItemCategory::Borders => &mut self.borders,
        }
    }
}

/// One recorded player choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceRecord {
    /// Node the choice was made on.
    pub node_id: NodeId,
    /// Label of the chosen option.
    pub label: String,
    /// Where the choice led; `None` for exits.
    pub target: Option<NodeId>,
    /// When the choice was made.
    pub made_at: DateTime<Utc>,
}

/// Lifetime counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifetimeStats {
    /// Choices recorded.
    pub total_choices_made: u64,
    /// Distinct (story, node) pairs visited.
    pub total_nodes_visited: u64,
}

/// Everything the ledger knows about one account. Serialized as one JSON
/// document; sets serialize as sorted lists. Missing fields take their
/// defaults on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressState {
    /// Owning account.
    pub account_id: Uuid,
    /// Number of events applied.
    pub version: i64,
    /// Spendable points; shared across stories.
    pub points: u64,
    /// Visited nodes per story.
    pub visited_nodes: BTreeMap<StoryId, BTreeSet<NodeId>>,
    /// Unlocked ending nodes per story.
    pub unlocked_endings: BTreeMap<StoryId, BTreeSet<NodeId>>,
    /// Stories whose completion bonus has been paid.
    pub completed_stories: BTreeSet<StoryId>,
    /// Choice history per story.
    pub choices: BTreeMap<StoryId, Vec<ChoiceRecord>>,
    /// Owned cosmetics.
    pub purchases: Purchases,
    /// Active cosmetics.
    pub preferences: Preferences,
    /// Favourite series ids.
    pub favorites: BTreeSet<String>,
    /// Lifetime counters.
    pub stats: LifetimeStats,
    /// Time of the last applied event.
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for ProgressState {
    fn default() -> Self {
        Self::new(Uuid::nil(), STARTING_POINTS)
    }
}

impl ProgressState {
    /// A fresh record for `account_id`.
    #[must_use]
    pub fn new(account_id: Uuid, starting_points: u64) -> Self {
        Self {
            account_id,
            version: 0,
            points: starting_points,
            visited_nodes: BTreeMap::new(),
            unlocked_endings: BTreeMap::new(),
            completed_stories: BTreeSet::new(),
            choices: BTreeMap::new(),
            purchases: Purchases::default(),
            preferences: Preferences::default(),
            favorites: BTreeSet::new(),
            stats: LifetimeStats::default(),
            updated_at: None,
        }
    }

    /// Whether `node_id` has been visited in `story_id`.
    #[must_use]
    pub fn has_visited(&self, story_id: &StoryId, node_id: &NodeId) -> bool {
        self.visited_nodes
            .get(story_id)
            .is_some_and(|nodes| nodes.contains(node_id))
    }

    /// Number of distinct nodes visited in `story_id`.
    #[must_use]
    pub fn visited_count(&self, story_id: &StoryId) -> usize {
        self.visited_nodes.get(story_id).map_or(0, BTreeSet::len)
    }

    /// Whether `ending_id` is unlocked in `story_id`.
    #[must_use]
    pub fn has_unlocked(&self, story_id: &StoryId, ending_id: &NodeId) -> bool {
        self.unlocked_endings
            .get(story_id)
            .is_some_and(|endings| endings.contains(ending_id))
    }

    /// Number of endings unlocked in `story_id`.
    #[must_use]
    pub fn unlocked_count(&self, story_id: &StoryId) -> usize {
        self.unlocked_endings.get(story_id).map_or(0, BTreeSet::len)
    }

    /// Whether the item is owned. Default theme, font and border always are.
    #[must_use]
    pub fn is_owned(&self, category: ItemCategory, item_id: &str) -> bool {
        category.default_item() == Some(item_id) || self.purchases.get(category).contains(item_id)
    }

    /// Whether `series_id` is a favourite.
    #[must_use]
    pub fn is_favorite(&self, series_id: &str) -> bool {
        self.favorites.contains(series_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_always_owned() {
        let state = ProgressState::new(Uuid::new_v4(), STARTING_POINTS);

        assert_eq!(state.points, 500);
        assert!(state.is_owned(ItemCategory::Themes, "default"));
        assert!(state.is_owned(ItemCategory::Fonts, "Inter"));
        assert!(state.is_owned(ItemCategory::Borders, "black"));
        assert!(!state.is_owned(ItemCategory::Themes, "noir"));
        assert!(!state.is_owned(ItemCategory::Effects, "rain"));
    }

    #[test]
    fn test_partial_document_fills_defaults() {
        // Arrange
        let account = Uuid::new_v4();
        let json = format!(
            r#"{{"account_id":"{account}","points":42,"visited_nodes":{{"forest":["B","A"]}}}}"#
        );

        // Act
        let state: ProgressState = serde_json::from_str(&json).unwrap();

        // Assert
        assert_eq!(state.account_id, account);
        assert_eq!(state.points, 42);
        assert_eq!(state.visited_count(&StoryId::from("forest")), 2);
        assert_eq!(state.preferences, Preferences::default());
        assert!(state.is_owned(ItemCategory::Fonts, "Inter"));
    }

    #[test]
    fn test_sets_serialize_as_sorted_lists() {
        let mut state = ProgressState::new(Uuid::nil(), 0);
        state
            .visited_nodes
            .entry(StoryId::from("forest"))
            .or_default()
            .extend([NodeId::from("C"), NodeId::from("A")]);

        let value = serde_json::to_value(&state).unwrap();

        assert_eq!(value["visited_nodes"]["forest"], serde_json::json!(["A", "C"]));
        assert_eq!(value["purchases"]["themes"], serde_json::json!(["default"]));
    }
}
