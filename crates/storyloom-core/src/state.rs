//! Flags and inventory accumulated along a walk.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::node::{Choice, Condition, Consequence, Node};

/// Story state derived by folding node consequences in history order.
/// Never persisted; rebuilt from the walk history when it changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoryState {
    flags: BTreeSet<String>,
    inventory: Vec<String>,
}

impl StoryState {
    /// Creates an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds the consequences of `nodes` in order.
    #[must_use]
    pub fn fold<'a>(nodes: impl IntoIterator<Item = &'a Node>) -> Self {
        let mut state = Self::new();
        for node in nodes {
            state.enter(node);
        }
        state
    }

    /// Applies every consequence of `node`.
    pub fn enter(&mut self, node: &Node) {
        for consequence in &node.consequences {
            self.apply(consequence);
        }
    }

    /// Applies one consequence. Setting a set flag or adding a held item is
    /// a no-op.
    pub fn apply(&mut self, consequence: &Consequence) {
        match consequence {
            Consequence::SetFlag(flag) => {
                self.flags.insert(flag.clone());
            }
            Consequence::AddItem(item) => {
                if !self.inventory.contains(item) {
                    self.inventory.push(item.clone());
                }
            }
        }
    }

    /// Whether `condition` holds.
    #[must_use]
    pub fn satisfies(&self, condition: &Condition) -> bool {
        match condition {
            Condition::RequiredFlag(flag) => self.flags.contains(flag),
            Condition::RequiredItem(item) => self.inventory.contains(item),
        }
    }

    /// Whether `choice` may be displayed.
    #[must_use]
    pub fn allows(&self, choice: &Choice) -> bool {
        choice.condition.as_ref().is_none_or(|c| self.satisfies(c))
    }

    /// Returns the choices of `node` that may be displayed, in order.
    #[must_use]
    pub fn displayable_choices(&self, node: &Node) -> Vec<Choice> {
        node.choices
            .iter()
            .filter(|choice| self.allows(choice))
            .cloned()
            .collect()
    }

    /// Returns whether `flag` is set.
    #[must_use]
    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.contains(flag)
    }

    /// Returns whether `item` is held.
    #[must_use]
    pub fn has_item(&self, item: &str) -> bool {
        self.inventory.iter().any(|held| held == item)
    }

    /// Returns the set flags.
    #[must_use]
    pub fn flags(&self) -> &BTreeSet<String> {
        &self.flags
    }

    /// Returns the inventory in acquisition order.
    #[must_use]
    pub fn inventory(&self) -> &[String] {
        &self.inventory
    }
}
