//! The story node model shared by every source.

use serde::{Deserialize, Serialize};

use crate::ids::NodeId;
use crate::rich_text::RichText;

/// A gate on a choice, evaluated against the current story state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// The named flag must be set.
    RequiredFlag(String),
    /// The named item must be held.
    RequiredItem(String),
}

/// Action tag carried by a choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChoiceAction {
    /// Leave the story.
    Exit,
}

/// A state-changing effect attached to a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Consequence {
    /// Set a boolean flag.
    SetFlag(String),
    /// Add an item to the inventory.
    AddItem(String),
}

/// A labeled, optionally gated edge to another node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    /// Display label.
    pub label: String,
    /// Target node; `None` leaves the story.
    #[serde(default)]
    pub target: Option<NodeId>,
    /// Gate evaluated against the story state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    /// Optional action tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ChoiceAction>,
}

impl Choice {
    /// A choice leading to `target`.
    #[must_use]
    pub fn to(label: impl Into<String>, target: impl Into<NodeId>) -> Self {
        Self {
            label: label.into(),
            target: Some(target.into()),
            condition: None,
            action: None,
        }
    }

    /// A choice that leaves the story.
    #[must_use]
    pub fn exit(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            target: None,
            condition: None,
            action: Some(ChoiceAction::Exit),
        }
    }

    /// Gates the choice behind `condition`.
    #[must_use]
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Whether taking this choice leaves the story.
    #[must_use]
    pub fn is_exit(&self) -> bool {
        self.target.is_none() || self.action == Some(ChoiceAction::Exit)
    }
}

/// One spoken line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueLine {
    /// Speaker name; empty for narration.
    #[serde(default)]
    pub speaker: String,
    /// Text with inline emphasis markers.
    pub text: RichText,
}

/// One atomic unit of narrative content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Identifier, unique within the story graph.
    pub id: NodeId,
    /// Panel image, if any.
    #[serde(default)]
    pub image_url: Option<String>,
    /// Ordered dialogue lines.
    #[serde(default)]
    pub dialogue: Vec<DialogueLine>,
    /// Outgoing choices, unfiltered.
    #[serde(default)]
    pub choices: Vec<Choice>,
    /// Linear successor.
    #[serde(default)]
    pub next: Option<NodeId>,
    /// Effects applied when the node is entered.
    #[serde(default)]
    pub consequences: Vec<Consequence>,
    /// Child ids for layout; mirrors `next` and the choice targets.
    #[serde(default)]
    pub children: Vec<NodeId>,
    /// Explicit terminal marker.
    #[serde(default)]
    pub is_terminal: bool,
}

impl Node {
    /// Creates an empty node.
    #[must_use]
    pub fn new(id: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            image_url: None,
            dialogue: Vec::new(),
            choices: Vec::new(),
            next: None,
            consequences: Vec::new(),
            children: Vec::new(),
            is_terminal: false,
        }
    }

    /// Sets the panel image.
    #[must_use]
    pub fn with_image(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }

    /// Appends a dialogue line.
    #[must_use]
    pub fn with_line(mut self, speaker: impl Into<String>, text: impl Into<RichText>) -> Self {
        self.dialogue.push(DialogueLine {
            speaker: speaker.into(),
            text: text.into(),
        });
        self
    }

    /// Appends a choice.
    #[must_use]
    pub fn with_choice(mut self, choice: Choice) -> Self {
        self.choices.push(choice);
        self.refresh_children();
        self
    }

    /// Sets the linear successor.
    #[must_use]
    pub fn with_next(mut self, next: impl Into<NodeId>) -> Self {
        self.next = Some(next.into());
        self.refresh_children();
        self
    }

    /// Appends a consequence.
    #[must_use]
    pub fn with_consequence(mut self, consequence: Consequence) -> Self {
        self.consequences.push(consequence);
        self
    }

    /// Marks the node terminal.
    #[must_use]
    pub fn terminal(mut self) -> Self {
        self.is_terminal = true;
        self
    }

    /// Recomputes `children` from the successor and the choice targets,
    /// successor first, without duplicates.
    pub fn refresh_children(&mut self) {
        let mut children: Vec<NodeId> = Vec::new();
        let targets = self
            .next
            .iter()
            .chain(self.choices.iter().filter_map(|c| c.target.as_ref()));
        for target in targets {
            if !children.contains(target) {
                children.push(target.clone());
            }
        }
        self.children = children;
    }

    /// Whether the node ends a route regardless of story state: explicitly
    /// terminal, or without a successor and with only exit choices (or none).
    #[must_use]
    pub fn is_ending(&self) -> bool {
        self.is_terminal || (self.next.is_none() && self.choices.iter().all(Choice::is_exit))
    }
}
