use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Custom result type alias for the application
pub type Result<T> = std::result::Result<T, PortfolioError>;

/// Errors that can surface from the service as a whole
#[derive(Debug, Error)]
pub enum PortfolioError {
    /// I/O errors
    #[error("IO error: {0}")]
    IO(#[from] io::Error),

    /// HTTP client construction errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Portfolio configuration file problems
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// External profile service errors
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Cache store errors
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Page template errors
    #[error("Render error: {0}")]
    Render(#[from] tera::Error),

    /// Process settings errors
    #[error("Config error: {0}")]
    Config(String),
}

/// Failures while loading the portfolio configuration document.
///
/// All three kinds are fatal to loading and propagate to the caller.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// The configuration path could not be read
    #[error("failed reading configuration file \"{}\": {source}", .path.display())]
    FileRead {
        /// Path that was read
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: io::Error,
    },

    /// The file was read but holds no content
    #[error("configuration file \"{}\" is empty", .path.display())]
    Empty {
        /// Path that was read
        path: PathBuf,
    },

    /// The content is not well-formed markup or fails validation
    #[error("failed parsing configuration: {0}")]
    Parsing(#[from] ParseFailure),
}

/// Why a configuration document could not be turned into a typed value
#[derive(Debug, Error)]
pub enum ParseFailure {
    /// The document is not valid YAML
    #[error("invalid markup: {0}")]
    Markup(#[from] serde_yaml::Error),

    /// The document parsed but does not match the schema
    #[error("{0}")]
    Schema(#[from] ValidationErrors),
}

/// A single failed call against the external profile service.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request never produced a response
    #[error("request to {url} failed: {source}")]
    Network {
        /// Requested URL
        url: String,
        /// Transport failure
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with a non-success status
    #[error("{url} responded with HTTP {status}")]
    Status {
        /// Requested URL
        url: String,
        /// Response status code
        status: u16,
    },

    /// The body was not JSON
    #[error("could not decode response from {url}: {source}")]
    Decode {
        /// Requested URL
        url: String,
        /// Decoding failure
        #[source]
        source: reqwest::Error,
    },

    /// The body was JSON but did not match the expected shape
    #[error("response from {url} failed validation: {errors}")]
    Schema {
        /// Requested URL
        url: String,
        /// Violated constraints
        errors: ValidationErrors,
    },
}

impl FetchError {
    /// The URL whose request failed
    pub fn url(&self) -> &str {
        match self {
            Self::Network { url, .. }
            | Self::Status { url, .. }
            | Self::Decode { url, .. }
            | Self::Schema { url, .. } => url,
        }
    }

    /// Checks if the service reported the resource as missing
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }
}

/// Errors talking to the key/value store. These never leave the cache facade.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The store could not be reached or the connection is closed
    #[error("cache connection error: {0}")]
    Connection(String),

    /// The store rejected or failed a command
    #[error("cache command failed: {0}")]
    Command(#[from] redis::RedisError),

    /// The operation did not finish in time
    #[error("cache operation timed out after {0:?}")]
    Timeout(Duration),

    /// A value could not be encoded or decoded as JSON
    #[error("cache value encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// What was wrong with a single field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViolationKind {
    /// A required field is absent
    Missing,
    /// The field holds a value of the wrong type
    WrongType {
        /// Name of the expected type
        expected: &'static str,
    },
    /// The field is a string but not an absolute URL
    MalformedUrl,
    /// The field is a string but not an RFC 3339 timestamp
    MalformedTimestamp,
    /// The field is a string but not an `owner/repo` identifier
    MalformedRepository,
}

/// A violated constraint at a field path such as `projects[1].url`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Dotted path of the offending field; empty for the document root
    pub path: String,
    /// The violated constraint
    pub kind: ViolationKind,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() { "<root>" } else { &self.path };
        match &self.kind {
            ViolationKind::Missing => write!(f, "{path}: required field is missing"),
            ViolationKind::WrongType { expected } => write!(f, "{path}: expected {expected}"),
            ViolationKind::MalformedUrl => write!(f, "{path}: not a valid absolute URL"),
            ViolationKind::MalformedTimestamp => write!(f, "{path}: not a valid timestamp"),
            ViolationKind::MalformedRepository => write!(f, "{path}: expected owner/repo"),
        }
    }
}

/// The full list of constraints a value violated. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<Violation>);

impl ValidationErrors {
    /// The individual violations
    pub fn violations(&self) -> &[Violation] {
        &self.0
    }

    /// Checks if any violation was reported at `path`
    pub fn has_path(&self, path: &str) -> bool {
        self.0.iter().any(|v| v.path == path)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, violation) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{violation}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_family() {
        let error: PortfolioError = ConfigurationError::Empty {
            path: PathBuf::from("portfolio.yaml"),
        }
        .into();
        assert!(matches!(error, PortfolioError::Configuration(_)));
        assert_eq!(
            error.to_string(),
            "configuration file \"portfolio.yaml\" is empty"
        );
    }

    #[test]
    fn test_validation_errors_display() {
        let errors = ValidationErrors(vec![
            Violation {
                path: "github_username".into(),
                kind: ViolationKind::Missing,
            },
            Violation {
                path: "links[0].url".into(),
                kind: ViolationKind::MalformedUrl,
            },
        ]);
        assert_eq!(
            errors.to_string(),
            "github_username: required field is missing; links[0].url: not a valid absolute URL"
        );
        assert!(errors.has_path("links[0].url"));
        assert!(!errors.has_path("links[1].url"));
    }

    #[test]
    fn test_fetch_error_not_found() {
        let error = FetchError::Status {
            url: "https://api.github.com/repos/a/b".into(),
            status: 404,
        };
        assert!(error.is_not_found());
        assert_eq!(error.url(), "https://api.github.com/repos/a/b");
    }
}
