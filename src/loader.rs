use crate::error::{ConfigurationError, ParseFailure};
use crate::schema::{RawConfiguration, Validate};
use serde_json::Value;
use std::path::Path;
use tracing::debug;

/// Reads and validates the portfolio document at `path`
///
/// # Errors
/// * [`ConfigurationError::FileRead`] if the file cannot be read
/// * [`ConfigurationError::Empty`] if it holds only whitespace
/// * [`ConfigurationError::Parsing`] if it is not YAML or fails validation
pub async fn load(path: &Path) -> Result<RawConfiguration, ConfigurationError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigurationError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;

    if content.trim().is_empty() {
        return Err(ConfigurationError::Empty {
            path: path.to_path_buf(),
        });
    }

    debug!("Loaded configuration from {} ({} bytes)", path.display(), content.len());
    Ok(parse_configuration(&content)?)
}

/// Parses a YAML document into a validated configuration
pub fn parse_configuration(content: &str) -> Result<RawConfiguration, ParseFailure> {
    let document: Value = serde_yaml::from_str(content)?;
    Ok(RawConfiguration::validate(&document)?)
}
