use crate::cache::{Cache, DEFAULT_TTL};
use crate::enrich::ProfileSource;
use crate::error::{FetchError, Result, ValidationErrors, Violation, ViolationKind};
use crate::schema::{ExternalRepositoryInfo, ExternalUserProfile, Validate};
use async_trait::async_trait;
use reqwest::{header, Client};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Root of the GitHub REST API
pub const GITHUB_API_BASE: &str = "https://api.github.com";
/// Root of public GitHub profile pages
pub const GITHUB_BASE: &str = "https://github.com";

const API_TIMEOUT_SECS: u64 = 30;
const USER_AGENT: &str = concat!("portfolio-service/", env!("CARGO_PKG_VERSION"));

/// Cache-first client for the GitHub user and repository endpoints.
///
/// Every call is a single attempt. Responses are validated before they are
/// cached, and cached under the endpoint URL.
#[derive(Clone, Debug)]
pub struct GitHubClient {
    client: Client,
    api_base: String,
    token: Option<String>,
    cache: Cache,
    cache_ttl: Duration,
}

impl GitHubClient {
    /// Creates a client against the public API
    pub fn new(token: Option<String>, cache: Cache) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(API_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            api_base: GITHUB_API_BASE.to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
            cache,
            cache_ttl: DEFAULT_TTL,
        })
    }

    /// Points the client at another API root, such as a mock server
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets how long responses stay cached
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Endpoint URL for a user, also used as its cache key
    pub fn user_url(&self, username: &str) -> String {
        format!("{}/users/{}", self.api_base, username)
    }

    /// Endpoint URL for a repository, also used as its cache key
    pub fn repository_url(&self, owner_repo: &str) -> String {
        format!("{}/repos/{}", self.api_base, owner_repo)
    }

    /// Fetches a user's public profile
    pub async fn fetch_user_profile(
        &self,
        username: &str,
    ) -> std::result::Result<ExternalUserProfile, FetchError> {
        let url = self.user_url(username);
        if let Some(profile) = self.cached::<ExternalUserProfile>(&url).await {
            return Ok(profile);
        }

        let body = self.get_json(&url).await?;
        let profile = ExternalUserProfile::validate(&body)
            .map_err(|errors| FetchError::Schema { url: url.clone(), errors })?;

        self.cache.set(&url, &body, self.cache_ttl).await;
        Ok(profile)
    }

    /// Fetches repository metadata followed by its language breakdown.
    ///
    /// The language names are merged into the repository body before it is
    /// validated and cached, so a cache hit covers both requests.
    pub async fn fetch_repository_info(
        &self,
        owner_repo: &str,
    ) -> std::result::Result<ExternalRepositoryInfo, FetchError> {
        let url = self.repository_url(owner_repo);
        if let Some(info) = self.cached::<ExternalRepositoryInfo>(&url).await {
            return Ok(info);
        }

        let mut body = self.get_json(&url).await?;

        let languages_url = body
            .get("languages_url")
            .and_then(Value::as_str)
            .map(str::to_owned);
        if let Some(languages_url) = languages_url {
            let breakdown = self.get_json(&languages_url).await?;
            let languages = language_names(&breakdown).ok_or_else(|| FetchError::Schema {
                url: languages_url.clone(),
                errors: ValidationErrors(vec![Violation {
                    path: String::new(),
                    kind: ViolationKind::WrongType { expected: "object" },
                }]),
            })?;
            if let Some(fields) = body.as_object_mut() {
                fields.insert("languages".to_string(), Value::from(languages));
            }
        }

        let info = ExternalRepositoryInfo::validate(&body)
            .map_err(|errors| FetchError::Schema { url: url.clone(), errors })?;

        self.cache.set(&url, &body, self.cache_ttl).await;
        Ok(info)
    }

    async fn cached<T: Validate>(&self, url: &str) -> Option<T> {
        let value = self.cache.get(url).await?;
        match T::validate(&value) {
            Ok(parsed) => Some(parsed),
            Err(errors) => {
                debug!("Ignoring stale cache entry for {}: {}", url, errors);
                None
            }
        }
    }

    async fn get_json(&self, url: &str) -> std::result::Result<Value, FetchError> {
        let mut request = self
            .client
            .get(url)
            .header(header::ACCEPT, "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        debug!("GET {}", url);
        let response = request.send().await.map_err(|source| FetchError::Network {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.json::<Value>().await.map_err(|source| FetchError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

/// Language names from a `languages_url` body, in the order GitHub lists them
fn language_names(breakdown: &Value) -> Option<Vec<String>> {
    breakdown
        .as_object()
        .map(|languages| languages.keys().cloned().collect())
}

#[async_trait]
impl ProfileSource for GitHubClient {
    async fn fetch_user_profile(
        &self,
        username: &str,
    ) -> std::result::Result<ExternalUserProfile, FetchError> {
        GitHubClient::fetch_user_profile(self, username).await
    }

    async fn fetch_repository_info(
        &self,
        owner_repo: &str,
    ) -> std::result::Result<ExternalRepositoryInfo, FetchError> {
        GitHubClient::fetch_repository_info(self, owner_repo).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_endpoint_urls() -> Result<()> {
        let client = GitHubClient::new(None, Cache::disabled())?.with_api_base("http://127.0.0.1:9000/");
        assert_eq!(client.user_url("octocat"), "http://127.0.0.1:9000/users/octocat");
        assert_eq!(
            client.repository_url("octocat/hello-world"),
            "http://127.0.0.1:9000/repos/octocat/hello-world"
        );
        Ok(())
    }

    #[test]
    fn test_blank_token_is_ignored() -> Result<()> {
        let client = GitHubClient::new(Some("  ".into()), Cache::disabled())?;
        assert!(client.token.is_none());
        Ok(())
    }

    #[test]
    fn test_language_names_keep_response_order() {
        let breakdown = json!({ "Rust": 120_000, "Shell": 900, "C": 12 });
        assert_eq!(
            language_names(&breakdown),
            Some(vec!["Rust".to_string(), "Shell".to_string(), "C".to_string()])
        );
        assert_eq!(language_names(&json!([])), None);
    }
}
