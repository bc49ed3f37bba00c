use crate::cache::Cache;
use crate::config::Config;
use crate::enrich::{Enricher, PopulatedConfiguration, ProfileSource};
use crate::error::{ConfigurationError, Result};
use crate::github::GitHubClient;
use crate::loader;
use std::path::PathBuf;
use std::sync::Arc;

/// Loads the portfolio document and populates it, once per call
#[derive(Clone)]
pub struct PortfolioService {
    enricher: Enricher,
    config_path: PathBuf,
}

impl PortfolioService {
    /// Creates a service reading `config_path` and enriching through `source`
    pub fn new(source: Arc<dyn ProfileSource>, config_path: impl Into<PathBuf>) -> Self {
        Self {
            enricher: Enricher::new(source),
            config_path: config_path.into(),
        }
    }

    /// Wires a GitHub client over `cache` from process settings
    pub fn from_config(config: &Config, cache: Cache) -> Result<Self> {
        let client = GitHubClient::new(config.github_token.clone(), cache)?
            .with_api_base(config.github_api_base.clone())
            .with_cache_ttl(config.cache_ttl);
        Ok(Self::new(Arc::new(client), config.config_file_path.clone()))
    }

    /// Loads, validates and populates the configuration.
    ///
    /// Only configuration problems are reported; external lookups degrade silently.
    pub async fn configuration(&self) -> std::result::Result<PopulatedConfiguration, ConfigurationError> {
        let raw = loader::load(&self.config_path).await?;
        Ok(self.enricher.populate(raw).await)
    }
}
