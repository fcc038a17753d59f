//! Remote flat-file manifests, fetched once per story and cached for the
//! life of the process.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use storyloom_core::error::DomainError;
use storyloom_core::ids::{NodeId, StoryId};
use storyloom_core::node::Node;
use storyloom_core::source::{NodeSource, StoryContext};
use tracing::{debug, error, instrument};

use crate::domain::graph::StoryGraph;
use crate::domain::manifest::{Manifest, ManifestFormat};
use crate::domain::normalize::{NormalizeOptions, normalize};

/// Fetches raw manifest documents.
#[async_trait]
pub trait ManifestFetcher: Send + Sync {
    /// Returns the document at `url`, or `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Transport` if the store cannot be reached or
    /// answers with an unexpected status.
    async fn fetch(&self, url: &str) -> Result<Option<String>, DomainError>;
}

/// `ManifestFetcher` over HTTP.
#[derive(Debug, Clone)]
pub struct HttpManifestFetcher {
    client: Client,
}

impl HttpManifestFetcher {
    /// Creates a fetcher whose requests time out after `timeout`.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client }
    }
}

#[async_trait]
impl ManifestFetcher for HttpManifestFetcher {
    async fn fetch(&self, url: &str) -> Result<Option<String>, DomainError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DomainError::Transport(format!("manifest request to {url} failed: {e}")))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(DomainError::Transport(format!(
                "manifest store answered {status} for {url}"
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| DomainError::Transport(format!("manifest body from {url}: {e}")))?;
        Ok(Some(body))
    }
}

type GraphCache = HashMap<StoryId, Option<Arc<StoryGraph>>>;

/// Second source of the chain. The manifest URL comes from the story
/// context; stories without one are skipped.
///
/// Absent and malformed manifests are cached as absent. Transport failures
/// are not cached, so the next call retries the fetch.
pub struct ManifestSource<F> {
    fetcher: F,
    options: NormalizeOptions,
    cache: Mutex<GraphCache>,
}

impl<F: ManifestFetcher> ManifestSource<F> {
    /// Creates a source normalizing with `options`.
    #[must_use]
    pub fn new(fetcher: F, options: NormalizeOptions) -> Self {
        Self {
            fetcher,
            options,
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn cached(&self, story_id: &StoryId) -> Result<Option<Option<Arc<StoryGraph>>>, DomainError> {
        let cache = self
            .cache
            .lock()
            .map_err(|_| DomainError::Infrastructure("manifest cache lock poisoned".into()))?;
        Ok(cache.get(story_id).cloned())
    }

    fn remember(
        &self,
        story_id: &StoryId,
        graph: Option<Arc<StoryGraph>>,
    ) -> Result<Option<Arc<StoryGraph>>, DomainError> {
        let mut cache = self
            .cache
            .lock()
            .map_err(|_| DomainError::Infrastructure("manifest cache lock poisoned".into()))?;
        // A concurrent fetch may have landed first; keep whichever arrived first.
        Ok(cache.entry(story_id.clone()).or_insert(graph).clone())
    }

    /// Returns the story's graph, fetching the manifest on first use.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Transport` if the manifest store fails.
    #[instrument(skip(self, story), fields(story_id = %story.story_id))]
    pub async fn graph(&self, story: &StoryContext) -> Result<Option<Arc<StoryGraph>>, DomainError> {
        if let Some(hit) = self.cached(&story.story_id)? {
            return Ok(hit);
        }
        let Some(url) = story.manifest_url.as_deref() else {
            return Ok(None);
        };

        let graph = match self.fetcher.fetch(url).await? {
            None => {
                debug!(url, "no manifest published");
                None
            }
            Some(text) => self.build(story, url, &text),
        };
        self.remember(&story.story_id, graph)
    }

    fn build(&self, story: &StoryContext, url: &str, text: &str) -> Option<Arc<StoryGraph>> {
        let mut options = self.options.clone();
        if let Some(base) = &story.asset_base_url {
            options.asset_base_url = Some(base.clone());
        } else if options.asset_base_url.is_none() {
            options.asset_base_url = manifest_directory(url).map(str::to_owned);
        }
        let built = Manifest::parse(text, ManifestFormat::from_path(url))
            .and_then(|manifest| normalize(&story.story_id, &manifest, &options));
        match built {
            Ok(graph) => {
                let graph = graph.with_source_digest(text);
                debug!(url, nodes = graph.len(), version_hash = ?graph.version_hash(), "manifest cached");
                Some(Arc::new(graph))
            }
            Err(err) => {
                error!(url, error = %err, "discarding malformed manifest");
                None
            }
        }
    }
}

/// The manifest URL up to and including its last path slash, without query
/// or fragment. `None` when the URL has no path directory.
fn manifest_directory(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let authority_end = path.find("://").map_or(0, |i| i + 3);
    let slash = path.rfind('/').filter(|&slash| slash >= authority_end)?;
    Some(&path[..=slash])
}

#[async_trait]
impl<F: ManifestFetcher> NodeSource for ManifestSource<F> {
    fn name(&self) -> &'static str {
        "manifest"
    }

    async fn resolve(
        &self,
        node_id: &NodeId,
        story: &StoryContext,
    ) -> Result<Option<Node>, DomainError> {
        Ok(self.graph(story).await?.and_then(|g| g.get(node_id).cloned()))
    }

    async fn resolve_start(&self, story: &StoryContext) -> Result<Option<Node>, DomainError> {
        Ok(self.graph(story).await?.and_then(|g| g.start_node().cloned()))
    }

    async fn load_graph(&self, story: &StoryContext) -> Result<Option<Vec<Node>>, DomainError> {
        Ok(self.graph(story).await?.map(|g| g.nodes().to_vec()))
    }
}
