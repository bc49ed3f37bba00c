use crate::error::{PortfolioError, Result};
use std::str::FromStr;

/// Runtime mode selected through the environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    /// Local development
    Development,
    /// Anything else
    #[default]
    Production,
}

impl Environment {
    /// Checks if the service runs in development mode
    pub fn is_development(self) -> bool {
        self == Self::Development
    }
}

impl FromStr for Environment {
    type Err = std::convert::Infallible;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match value.trim().to_lowercase().as_str() {
            "development" | "dev" => Self::Development,
            _ => Self::Production,
        })
    }
}

/// Reads an environment variable, treating empty values as unset
pub fn get_env_value(key: &str) -> Option<String> {
    let value = std::env::var(key).ok()?;
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Parses `raw` for the variable `key`, naming the variable on failure
pub fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| PortfolioError::Config(format!("invalid value for {}: {} ({})", key, raw, e)))
}
