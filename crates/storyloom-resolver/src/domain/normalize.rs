//! Flattening of scene/panel manifests into story nodes.
//!
//! Nodes are emitted one per dialogue line (`{scene}_p{panel}_d{line}`) or,
//! in compatibility mode, one per panel (`{scene}_panel_{panel}`). A node's
//! successor is, in priority order: the next line, the panel's own options,
//! the next panel, the scene's choice prompt, and finally a "Continue" to
//! the shared terminal node for end-of-chapter scenes. Whatever is still a
//! leaf afterwards is wired to that terminal node.

use std::collections::HashMap;

use storyloom_core::error::DomainError;
use storyloom_core::ids::{NodeId, StoryId};
use storyloom_core::node::{Choice, Node};
use tracing::warn;

use super::branch::{asset_path, branch_prefix};
use super::graph::StoryGraph;
use super::manifest::{DialogueEntry, Manifest, ManifestOption, Panel, Scene};

/// Id of the synthetic node every route of a manifest story ends on.
pub const TERMINAL_NODE_ID: &str = "__story_end__";

/// Label of the synthetic continue/exit choices.
pub const CONTINUE_LABEL: &str = "Continue";

/// Default panel art extension.
pub const DEFAULT_ASSET_EXTENSION: &str = "jpg";

/// Node granularity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NormalizeMode {
    /// One node per dialogue line.
    #[default]
    PerLine,
    /// One node per panel, carrying all of its lines.
    PerPanel,
}

impl NormalizeMode {
    /// Parses `line`/`per_line` or `panel`/`per_panel`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "line" | "per_line" | "per-line" => Some(Self::PerLine),
            "panel" | "per_panel" | "per-panel" => Some(Self::PerPanel),
            _ => None,
        }
    }
}

/// Knobs for normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Node granularity.
    pub mode: NormalizeMode,
    /// Base URL prepended to panel art file names.
    pub asset_base_url: Option<String>,
    /// Panel art file extension.
    pub asset_extension: String,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            mode: NormalizeMode::PerLine,
            asset_base_url: None,
            asset_extension: DEFAULT_ASSET_EXTENSION.to_owned(),
        }
    }
}

impl NormalizeOptions {
    /// Returns a copy using `base` for panel art.
    #[must_use]
    pub fn with_asset_base_url(mut self, base: impl Into<String>) -> Self {
        self.asset_base_url = Some(base.into());
        self
    }

    /// Returns a copy using `mode`.
    #[must_use]
    pub fn with_mode(mut self, mode: NormalizeMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Flattens `manifest` into the story graph of `story_id`.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the initial scene is missing or two
/// generated nodes collide.
pub fn normalize(
    story_id: &StoryId,
    manifest: &Manifest,
    options: &NormalizeOptions,
) -> Result<StoryGraph, DomainError> {
    let normalizer = Normalizer::new(story_id, manifest, options);

    let Some(start) = normalizer.entries.get(manifest.initial_scene_id.as_str()).cloned() else {
        return Err(DomainError::Validation(format!(
            "initial scene {} not found in manifest for story {story_id}",
            manifest.initial_scene_id
        )));
    };

    let mut nodes = Vec::new();
    for (key, scene) in &manifest.scenes {
        normalizer.emit_scene(Manifest::scene_id(key, scene), scene, &mut nodes);
    }

    let terminal = NodeId::from(TERMINAL_NODE_ID);
    for node in &mut nodes {
        if node.next.is_none() && node.choices.is_empty() {
            node.next = Some(terminal.clone());
            node.refresh_children();
        }
    }
    nodes.push(
        Node::new(terminal)
            .with_choice(Choice::exit(CONTINUE_LABEL))
            .terminal(),
    );

    StoryGraph::new(story_id.clone(), start, nodes)
}

struct Normalizer<'a> {
    story_id: &'a StoryId,
    options: &'a NormalizeOptions,
    entries: HashMap<&'a str, NodeId>,
}

impl<'a> Normalizer<'a> {
    fn new(story_id: &'a StoryId, manifest: &'a Manifest, options: &'a NormalizeOptions) -> Self {
        let mut entries = HashMap::new();
        for (key, scene) in &manifest.scenes {
            let scene_id = Manifest::scene_id(key, scene);
            let first_panel = scene.panels.first().map_or_else(|| "1".to_owned(), |p| p.key(0));
            let entry = node_id(options.mode, scene_id, &first_panel, 0);
            entries.insert(key.as_str(), entry.clone());
            entries.insert(scene_id, entry);
        }
        Self {
            story_id,
            options,
            entries,
        }
    }

    fn emit_scene(&self, scene_id: &str, scene: &Scene, nodes: &mut Vec<Node>) {
        let placeholder = [Panel::default()];
        let panels: &[Panel] = if scene.panels.is_empty() {
            &placeholder
        } else {
            &scene.panels
        };
        let prefix = branch_prefix(scene_id, scene.branch.as_deref());

        for (panel_index, panel) in panels.iter().enumerate() {
            let key = panel.key(panel_index);
            let image = asset_path(
                self.options.asset_base_url.as_deref(),
                &prefix,
                &key,
                &self.options.asset_extension,
            );

            let placeholder_line = [DialogueEntry {
                character: String::new(),
                text: "...".to_owned(),
            }];
            let lines: &[DialogueEntry] = if panel.dialogues.is_empty() {
                &placeholder_line
            } else {
                &panel.dialogues
            };
            let groups: Vec<&[DialogueEntry]> = match self.options.mode {
                NormalizeMode::PerLine => lines.chunks(1).collect(),
                NormalizeMode::PerPanel => vec![lines],
            };
            let last_group = groups.len() - 1;

            for (group_index, group) in groups.into_iter().enumerate() {
                let mut node = Node::new(node_id(self.options.mode, scene_id, &key, group_index))
                    .with_image(image.clone());
                for line in group {
                    node = node.with_line(line.character.clone(), line.text.clone());
                }

                if group_index == 0 {
                    if panel_index == 0 {
                        node.consequences.extend(scene.consequences.iter().cloned());
                    }
                    node.consequences.extend(panel.consequences.iter().cloned());
                }

                if group_index < last_group {
                    node.next = Some(node_id(self.options.mode, scene_id, &key, group_index + 1));
                } else if !panel.options.is_empty() {
                    node.choices = self.choices(&panel.options);
                } else if let Some(next_panel) = panels.get(panel_index + 1) {
                    let next_key = next_panel.key(panel_index + 1);
                    node.next = Some(node_id(self.options.mode, scene_id, &next_key, 0));
                } else if let Some(prompt) =
                    scene.choice_prompt.as_ref().filter(|p| !p.options.is_empty())
                {
                    node.choices = self.choices(&prompt.options);
                } else if scene.ends_chapter() {
                    node.choices = vec![Choice::to(CONTINUE_LABEL, TERMINAL_NODE_ID)];
                }

                node.refresh_children();
                nodes.push(node);
            }
        }
    }

    fn choices(&self, options: &[ManifestOption]) -> Vec<Choice> {
        options
            .iter()
            .map(|option| {
                let mut choice = match &option.next_scene_id {
                    Some(scene) => Choice::to(option.text.clone(), self.entry(scene)),
                    None => Choice::exit(option.text.clone()),
                };
                choice.condition.clone_from(&option.condition);
                choice
            })
            .collect()
    }

    fn entry(&self, scene_id: &str) -> NodeId {
        if let Some(entry) = self.entries.get(scene_id) {
            return entry.clone();
        }
        warn!(
            story_id = %self.story_id,
            scene_id,
            "choice targets unknown scene; assuming panel 1"
        );
        node_id(self.options.mode, scene_id, "1", 0)
    }
}

fn node_id(mode: NormalizeMode, scene_id: &str, panel: &str, line: usize) -> NodeId {
    match mode {
        NormalizeMode::PerLine => NodeId::new(format!("{scene_id}_p{panel}_d{line}")),
        NormalizeMode::PerPanel => NodeId::new(format!("{scene_id}_panel_{panel}")),
    }
}
