//! Scene/panel manifest documents.
//!
//! A manifest is `scenes → ordered panels → dialogue lines`, keyed by scene
//! id, with an initial scene and optional choice prompts.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use storyloom_core::error::DomainError;
use storyloom_core::node::{Condition, Consequence};

/// Serialization format of a manifest document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    /// JSON document.
    Json,
    /// YAML document.
    Yaml,
}

impl ManifestFormat {
    /// Chooses the format from a file name or URL extension. Anything other
    /// than `.yaml`/`.yml` is JSON.
    #[must_use]
    pub fn from_path(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or(path);
        let lower = path.to_ascii_lowercase();
        if lower.ends_with(".yaml") || lower.ends_with(".yml") {
            Self::Yaml
        } else {
            Self::Json
        }
    }
}

/// A whole story manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Display title.
    #[serde(default)]
    pub title: Option<String>,
    /// Scene the story starts in.
    pub initial_scene_id: String,
    /// Scenes keyed by id.
    #[serde(default)]
    pub scenes: BTreeMap<String, Scene>,
}

impl Manifest {
    /// Parses a manifest document.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the document is malformed.
    pub fn parse(text: &str, format: ManifestFormat) -> Result<Self, DomainError> {
        match format {
            ManifestFormat::Json => serde_json::from_str(text)
                .map_err(|e| DomainError::Validation(format!("invalid JSON manifest: {e}"))),
            ManifestFormat::Yaml => serde_yaml::from_str(text)
                .map_err(|e| DomainError::Validation(format!("invalid YAML manifest: {e}"))),
        }
    }

    /// Returns the scene id as declared inside the scene, falling back to its
    /// map key.
    #[must_use]
    pub fn scene_id<'a>(key: &'a str, scene: &'a Scene) -> &'a str {
        scene.id.as_deref().unwrap_or(key)
    }
}

/// One scene: a run of panels, optionally ending in a choice prompt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    /// Explicit scene id; the map key is used when absent.
    #[serde(default)]
    pub id: Option<String>,
    /// Branch-variant prefix for panel art (`A`, `B`, ...).
    #[serde(default)]
    pub branch: Option<String>,
    /// Panels in reading order.
    #[serde(default)]
    pub panels: Vec<Panel>,
    /// Choices offered after the last panel.
    #[serde(default)]
    pub choice_prompt: Option<ChoicePrompt>,
    /// Present when the scene closes the chapter.
    #[serde(default)]
    pub end_of_chapter_status: Option<serde_json::Value>,
    /// Effects applied on entering the scene.
    #[serde(default)]
    pub consequences: Vec<Consequence>,
}

impl Scene {
    /// Whether the scene is marked as the end of a chapter.
    #[must_use]
    pub fn ends_chapter(&self) -> bool {
        match &self.end_of_chapter_status {
            None | Some(serde_json::Value::Null | serde_json::Value::Bool(false)) => false,
            Some(_) => true,
        }
    }
}

/// Panel key as written in manifests: numeric or free text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PanelKey {
    /// `panel_id: 3`
    Number(u64),
    /// `panel_id: "3b"`
    Text(String),
}

impl fmt::Display for PanelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// One illustrated panel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Panel {
    /// Panel key; the 1-based position is used when absent.
    #[serde(default)]
    pub panel_id: Option<PanelKey>,
    /// Dialogue lines in reading order.
    #[serde(default)]
    pub dialogues: Vec<DialogueEntry>,
    /// Choices offered after the panel's last line.
    #[serde(default)]
    pub options: Vec<ManifestOption>,
    /// Effects applied on entering the panel.
    #[serde(default)]
    pub consequences: Vec<Consequence>,
}

impl Panel {
    /// The panel key, or its 1-based position.
    #[must_use]
    pub fn key(&self, index: usize) -> String {
        self.panel_id
            .as_ref()
            .map_or_else(|| (index + 1).to_string(), ToString::to_string)
    }
}

/// One spoken line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DialogueEntry {
    /// Speaker name; empty for narration.
    #[serde(default, alias = "speaker")]
    pub character: String,
    /// Line text with `**bold**` emphasis.
    #[serde(default)]
    pub text: String,
}

/// Choice list shown at the end of a scene.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChoicePrompt {
    /// Optional prompt text.
    #[serde(default)]
    pub prompt: Option<String>,
    /// The options.
    #[serde(default)]
    pub options: Vec<ManifestOption>,
}

/// One option of a choice list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManifestOption {
    /// Display label.
    #[serde(alias = "label")]
    pub text: String,
    /// Target scene; absent means the option exits the story.
    #[serde(default, alias = "target_scene_id")]
    pub next_scene_id: Option<String>,
    /// Gate on the option.
    #[serde(default)]
    pub condition: Option<Condition>,
}
