#![warn(missing_docs)]
#![warn(clippy::all)]

//! Portfolio Service - renders a personal portfolio from a YAML document
//!
//! The document names a GitHub account and lists links and projects. Before
//! rendering, it is enriched with the account's public profile and with
//! metadata for every referenced repository. Enrichment is best-effort and
//! cached with a fixed TTL.
//!
//! ## Pipeline
//! - [`loader`] reads and validates the document into a [`RawConfiguration`]
//! - [`github`] fetches profile and repository data through the [`cache`]
//! - [`enrich`] merges both into a [`PopulatedConfiguration`]
//! - [`render`] produces the page that [`api`] serves
//!
//! ## Usage
//! ```rust,ignore
//! use portfolio_service::{Cache, Config, PortfolioService};
//!
//! async fn example() -> portfolio_service::Result<()> {
//!     let config = Config::from_env()?;
//!     let service = PortfolioService::from_config(&config, Cache::in_memory())?;
//!     let populated = service.configuration().await?;
//!     println!("{} links", populated.links.len());
//!     Ok(())
//! }
//! ```

/// Routes served by the `server` binary
pub mod api;
/// TTL cache facade over Redis or process memory
pub mod cache;
/// Process settings read from the environment
pub mod config;
/// Enrichment of the raw configuration into the render model
pub mod enrich;
/// Error handling types and utilities
pub mod error;
/// GitHub API client
pub mod github;
/// Portfolio document loading
pub mod loader;
/// Logging configuration and utilities
pub mod logging;
/// HTML page rendering
pub mod render;
/// Document and API response shapes with validation
pub mod schema;
/// Loader and enricher composition
pub mod service;

// Re-export common types
pub use cache::Cache;
pub use config::Config;
pub use enrich::{Enricher, PopulatedConfiguration, PopulatedLink, PopulatedProject, ProfileSource};
pub use error::{ConfigurationError, FetchError, PortfolioError, Result};
pub use github::GitHubClient;
pub use schema::{ExternalRepositoryInfo, ExternalUserProfile, RawConfiguration, Validate};
pub use service::PortfolioService;
