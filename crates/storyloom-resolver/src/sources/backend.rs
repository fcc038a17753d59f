//! The structured remote backend: series → chapters → story nodes, each
//! node embedding its dialogue and choice rows.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use storyloom_core::error::DomainError;
use storyloom_core::ids::NodeId;
use storyloom_core::node::{Choice, Condition, Consequence, DialogueLine, Node};
use storyloom_core::rich_text::RichText;
use storyloom_core::source::{NodeSource, StoryContext};
use tracing::{debug, instrument};
use uuid::Uuid;

/// A chapter row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterRecord {
    /// Chapter id.
    pub id: Uuid,
    /// Owning series (story).
    pub series_id: Uuid,
    /// 1-based reading order.
    #[serde(default)]
    pub order_index: i32,
    /// Display title.
    #[serde(default)]
    pub title: Option<String>,
}

/// A dialogue row embedded in a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueRecord {
    /// Speaker; absent for narration.
    #[serde(default)]
    pub speaker_name: Option<String>,
    /// Line text.
    pub content: String,
    /// Position within the node.
    #[serde(default)]
    pub order_index: Option<i32>,
}

/// A choice row embedded in a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceRecord {
    /// Target node; absent means the choice exits the story.
    #[serde(default)]
    pub to_node_id: Option<Uuid>,
    /// Display label.
    pub label: String,
    /// Gate on the choice.
    #[serde(default)]
    pub condition_logic: Option<Condition>,
}

/// A story node row with its embedded children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Node id.
    pub id: Uuid,
    /// Owning chapter.
    #[serde(default)]
    pub chapter_id: Option<Uuid>,
    /// Panel art.
    #[serde(default)]
    pub image_url: Option<String>,
    /// Linear successor.
    #[serde(default)]
    pub next_node_id: Option<Uuid>,
    /// Explicit ending marker.
    #[serde(default)]
    pub is_ending: bool,
    /// Effects applied on entry.
    #[serde(default)]
    pub consequences: Vec<Consequence>,
    /// Insertion time; the earliest node of the first chapter starts the story.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Dialogue rows.
    #[serde(default)]
    pub dialogues: Vec<DialogueRecord>,
    /// Outgoing choice rows.
    #[serde(default)]
    pub story_choices: Vec<ChoiceRecord>,
}

impl From<NodeRecord> for Node {
    fn from(record: NodeRecord) -> Self {
        let mut dialogues = record.dialogues;
        dialogues.sort_by_key(|d| d.order_index.unwrap_or(i32::MAX));

        let mut node = Node::new(record.id.to_string());
        node.image_url = record.image_url;
        node.dialogue = dialogues
            .into_iter()
            .map(|d| DialogueLine {
                speaker: d.speaker_name.unwrap_or_default(),
                text: RichText::new(d.content),
            })
            .collect();
        node.choices = record
            .story_choices
            .into_iter()
            .map(|c| {
                let mut choice = match c.to_node_id {
                    Some(target) => Choice::to(c.label, target.to_string()),
                    None => Choice::exit(c.label),
                };
                choice.condition = c.condition_logic;
                choice
            })
            .collect();
        node.next = record.next_node_id.map(|id| NodeId::new(id.to_string()));
        node.consequences = record.consequences;
        node.is_terminal = record.is_ending;
        node.refresh_children();
        node
    }
}

/// Read access to the structured backend.
#[async_trait]
pub trait StoryBackend: Send + Sync {
    /// Fetches one node with its dialogue and choices.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Transport` if the backend cannot be reached.
    async fn fetch_node(&self, node_id: Uuid) -> Result<Option<NodeRecord>, DomainError>;

    /// Fetches a series' chapters in reading order.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Transport` if the backend cannot be reached.
    async fn fetch_chapters(&self, series_id: Uuid) -> Result<Vec<ChapterRecord>, DomainError>;

    /// Fetches every node of the given chapters, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Transport` if the backend cannot be reached.
    async fn fetch_chapter_nodes(
        &self,
        chapter_ids: &[Uuid],
    ) -> Result<Vec<NodeRecord>, DomainError>;
}

const NODE_SELECT: &str = "*,dialogues(speaker_name,content,order_index),story_choices!from_node_id(to_node_id,label,condition_logic)";

/// `StoryBackend` over a PostgREST-style HTTP API.
#[derive(Debug, Clone)]
pub struct RestStoryBackend {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RestStoryBackend {
    /// Creates a client for the REST root at `base_url`.
    #[must_use]
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_key: api_key.to_owned(),
        }
    }

    async fn rows<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, DomainError> {
        let url = format!("{}/{table}", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .query(query)
            .send()
            .await
            .map_err(|e| DomainError::Transport(format!("{table} request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DomainError::Transport(format!(
                "{table} request answered {status}: {body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| DomainError::Transport(format!("{table} rows undecodable: {e}")))
    }
}

#[async_trait]
impl StoryBackend for RestStoryBackend {
    async fn fetch_node(&self, node_id: Uuid) -> Result<Option<NodeRecord>, DomainError> {
        let rows: Vec<NodeRecord> = self
            .rows(
                "story_nodes",
                &[
                    ("id", format!("eq.{node_id}")),
                    ("select", NODE_SELECT.to_owned()),
                ],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn fetch_chapters(&self, series_id: Uuid) -> Result<Vec<ChapterRecord>, DomainError> {
        self.rows(
            "chapters",
            &[
                ("series_id", format!("eq.{series_id}")),
                ("order", "order_index.asc".to_owned()),
                ("select", "id,series_id,order_index,title".to_owned()),
            ],
        )
        .await
    }

    async fn fetch_chapter_nodes(
        &self,
        chapter_ids: &[Uuid],
    ) -> Result<Vec<NodeRecord>, DomainError> {
        if chapter_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<String> = chapter_ids.iter().map(Uuid::to_string).collect();
        self.rows(
            "story_nodes",
            &[
                ("chapter_id", format!("in.({})", ids.join(","))),
                ("order", "created_at.asc".to_owned()),
                ("select", NODE_SELECT.to_owned()),
            ],
        )
        .await
    }
}

/// First source of the chain. Only UUID node and story ids live in the
/// backend; anything else falls through to the manifests.
pub struct BackendSource<B> {
    backend: B,
}

impl<B: StoryBackend> BackendSource<B> {
    /// Wraps a backend.
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    async fn series_nodes(
        &self,
        series_id: Uuid,
        first_chapter_only: bool,
    ) -> Result<Vec<NodeRecord>, DomainError> {
        let mut chapters = self.backend.fetch_chapters(series_id).await?;
        chapters.sort_by_key(|c| c.order_index);
        let chapter_ids: Vec<Uuid> = if first_chapter_only {
            chapters.first().map(|c| c.id).into_iter().collect()
        } else {
            chapters.iter().map(|c| c.id).collect()
        };
        self.backend.fetch_chapter_nodes(&chapter_ids).await
    }
}

#[async_trait]
impl<B: StoryBackend> NodeSource for BackendSource<B> {
    fn name(&self) -> &'static str {
        "backend"
    }

    #[instrument(skip(self, story), fields(story_id = %story.story_id))]
    async fn resolve(
        &self,
        node_id: &NodeId,
        story: &StoryContext,
    ) -> Result<Option<Node>, DomainError> {
        let Ok(id) = Uuid::parse_str(node_id.as_str()) else {
            debug!(%node_id, "not a backend id");
            return Ok(None);
        };
        Ok(self.backend.fetch_node(id).await?.map(Node::from))
    }

    async fn resolve_start(&self, story: &StoryContext) -> Result<Option<Node>, DomainError> {
        let Ok(series_id) = Uuid::parse_str(story.story_id.as_str()) else {
            return Ok(None);
        };
        let nodes = self.series_nodes(series_id, true).await?;
        // Undated nodes sort after dated ones; ties keep backend order.
        let first = nodes
            .into_iter()
            .enumerate()
            .min_by_key(|(position, n)| (n.created_at.is_none(), n.created_at, *position))
            .map(|(_, n)| n);
        Ok(first.map(Node::from))
    }

    async fn load_graph(&self, story: &StoryContext) -> Result<Option<Vec<Node>>, DomainError> {
        let Ok(series_id) = Uuid::parse_str(story.story_id.as_str()) else {
            return Ok(None);
        };
        let nodes = self.series_nodes(series_id, false).await?;
        if nodes.is_empty() {
            return Ok(None);
        }
        Ok(Some(nodes.into_iter().map(Node::from).collect()))
    }
}
