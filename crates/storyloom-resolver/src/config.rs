//! Environment-driven resolver configuration.

use std::time::Duration;

use storyloom_core::error::DomainError;

use crate::domain::normalize::{DEFAULT_ASSET_EXTENSION, NormalizeMode, NormalizeOptions};

/// Default timeout for backend and manifest requests.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Settings for building the default source chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// REST root of the structured backend; `None` disables that source.
    pub backend_url: Option<String>,
    /// API key sent to the backend.
    pub backend_key: Option<String>,
    /// Normalization settings for manifests.
    pub normalize: NormalizeOptions,
    /// Request timeout.
    pub http_timeout: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            backend_url: None,
            backend_key: None,
            normalize: NormalizeOptions::default(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

impl ResolverConfig {
    /// Reads configuration from the environment:
    ///
    /// - `STORYLOOM_BACKEND_URL` / `STORYLOOM_BACKEND_KEY`
    /// - `STORYLOOM_MANIFEST_MODE` (`line` or `panel`)
    /// - `STORYLOOM_ASSET_EXTENSION` (default `jpg`)
    /// - `STORYLOOM_HTTP_TIMEOUT_SECS` (default 10)
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Configuration` if a variable is set to an
    /// unparsable value.
    pub fn from_env() -> Result<Self, DomainError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`Self::from_env`], reading through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Configuration` if a value is unparsable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, DomainError> {
        let read = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let mode = match read("STORYLOOM_MANIFEST_MODE") {
            Some(raw) => NormalizeMode::parse(&raw).ok_or_else(|| {
                DomainError::Configuration(format!("STORYLOOM_MANIFEST_MODE: unknown mode {raw}"))
            })?,
            None => NormalizeMode::default(),
        };
        let http_timeout = match read("STORYLOOM_HTTP_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(raw.trim().parse().map_err(|e| {
                DomainError::Configuration(format!("STORYLOOM_HTTP_TIMEOUT_SECS: {e}"))
            })?),
            None => Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        };

        Ok(Self {
            backend_url: read("STORYLOOM_BACKEND_URL"),
            backend_key: read("STORYLOOM_BACKEND_KEY"),
            normalize: NormalizeOptions {
                mode,
                asset_base_url: None,
                asset_extension: read("STORYLOOM_ASSET_EXTENSION")
                    .unwrap_or_else(|| DEFAULT_ASSET_EXTENSION.to_owned()),
            },
            http_timeout,
        })
    }
}
