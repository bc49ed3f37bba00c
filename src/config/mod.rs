mod env_manager;

use crate::cache::DEFAULT_TTL;
use crate::error::{PortfolioError, Result};
use crate::github::GITHUB_API_BASE;
use std::path::PathBuf;
use std::time::Duration;

pub use env_manager::{get_env_value, parse_value, Environment};

/// Default location of the portfolio document
pub const DEFAULT_CONFIG_FILE_PATH: &str = "portfolio.yaml";

/// Process settings for the service
///
/// Every field comes from an environment variable; see [`Config::from_env`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Port the HTTP server listens on (`PORT`)
    pub port: u16,
    /// GitHub API token for authenticated requests (`GITHUB_TOKEN`)
    pub github_token: Option<String>,
    /// Redis connection string; no cache when unset (`REDIS_URL`)
    pub redis_url: Option<String>,
    /// Runtime mode (`NODE_ENV` or `APP_ENV`)
    pub environment: Environment,
    /// Portfolio document path (`CONFIG_FILE_PATH`)
    pub config_file_path: PathBuf,
    /// Version reported by the health check (`VERSION`)
    pub version: String,
    /// GitHub API root (`GITHUB_API_BASE_URL`)
    pub github_api_base: String,
    /// Expiry of cached API responses (`CACHE_TTL_SECONDS`)
    pub cache_ttl: Duration,
    /// Directory holding `styles.css` and `client.js` (`STATIC_DIR`)
    pub static_dir: PathBuf,
    /// Log level used when `RUST_LOG` is unset (`LOG_LEVEL`)
    pub log_level: String,
}

impl Config {
    /// Loads settings from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(get_env_value)
    }

    /// Loads settings through `lookup`, which returns `None` for unset variables
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("NODE_ENV")
            .or_else(|| lookup("APP_ENV"))
            .map(|raw| parse_value::<Environment>("NODE_ENV", &raw))
            .transpose()?
            .unwrap_or_default();

        let port: u16 = match lookup("PORT") {
            Some(raw) => parse_value("PORT", &raw)?,
            None => 3000,
        };

        let cache_ttl = match lookup("CACHE_TTL_SECONDS") {
            Some(raw) => Duration::from_secs(parse_value("CACHE_TTL_SECONDS", &raw)?),
            None => DEFAULT_TTL,
        };

        let default_level = if environment.is_development() { "debug" } else { "info" };

        Ok(Self {
            port,
            github_token: lookup("GITHUB_TOKEN"),
            redis_url: lookup("REDIS_URL"),
            environment,
            config_file_path: lookup("CONFIG_FILE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE_PATH)),
            version: lookup("VERSION").unwrap_or_else(|| "DEVELOPMENT".to_string()),
            github_api_base: lookup("GITHUB_API_BASE_URL")
                .unwrap_or_else(|| GITHUB_API_BASE.to_string()),
            cache_ttl,
            static_dir: lookup("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("dist")),
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| default_level.to_string()),
        })
    }

    /// Validates that the configured values are usable
    pub fn validate(&self) -> Result<()> {
        if self.cache_ttl.is_zero() {
            return Err(PortfolioError::Config("CACHE_TTL_SECONDS must be positive".into()));
        }
        if !crate::schema::is_absolute_url(&self.github_api_base) {
            return Err(PortfolioError::Config(format!(
                "GITHUB_API_BASE_URL is not an absolute URL: {}",
                self.github_api_base
            )));
        }
        Ok(())
    }
}
