//! Domain error types.

use thiserror::Error;

use crate::ids::{NodeId, StoryId};

/// Top-level error type shared by every Storyloom crate.
#[derive(Debug, Error)]
pub enum DomainError {
    /// No source could supply the requested node.
    #[error("node {node_id} not found in any source for story {story_id}")]
    NodeNotFound {
        /// The story that was searched.
        story_id: StoryId,
        /// The node that was requested.
        node_id: NodeId,
    },

    /// No source knows the requested story.
    #[error("story not found: {0}")]
    StoryNotFound(StoryId),

    /// A backend or network failure. Never treated as "not present".
    #[error("transport error: {0}")]
    Transport(String),

    /// A validation error in domain logic or content.
    #[error("validation error: {0}")]
    Validation(String),

    /// A local persistence or locking failure.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),

    /// A required setting is missing or malformed.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl DomainError {
    /// Returns `true` for failures of a remote collaborator.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_not_found_message_names_story_and_node() {
        let err = DomainError::NodeNotFound {
            story_id: StoryId::from("forest"),
            node_id: NodeId::from("b"),
        };

        assert_eq!(
            err.to_string(),
            "node b not found in any source for story forest"
        );
        assert!(!err.is_transport());
    }

    #[test]
    fn test_transport_is_flagged() {
        assert!(DomainError::Transport("timed out".into()).is_transport());
    }
}
