//! Turns a validated [`RawConfiguration`] into the render-ready
//! [`PopulatedConfiguration`].
//!
//! Population never fails. A profile or repository that cannot be fetched
//! simply contributes nothing, and the declared values are used as they are.

use crate::error::FetchError;
use crate::github::GITHUB_BASE;
use crate::schema::{
    ExternalRepositoryInfo, ExternalUserProfile, Nullable, RawConfiguration, RawLink, RawProject,
};
use async_trait::async_trait;
use futures::future::{join, join_all};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

/// Page title used when the document does not set one
pub const DEFAULT_TITLE: &str = "Portfolio";

/// Name of the link synthesized for the GitHub profile
pub const PROFILE_LINK_NAME: &str = "GitHub";

const FAVICON_SERVICE: &str = "https://www.google.com/s2/favicons";
const FAVICON_SIZE: u32 = 64;

/// Where profile and repository data come from
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileSource: Send + Sync {
    /// Looks up a user profile
    async fn fetch_user_profile(&self, username: &str)
        -> Result<ExternalUserProfile, FetchError>;

    /// Looks up a repository by `owner/repo`
    async fn fetch_repository_info(
        &self,
        owner_repo: &str,
    ) -> Result<ExternalRepositoryInfo, FetchError>;
}

/// A link ready for rendering
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PopulatedLink {
    /// Identifier unique within one population run
    pub id: String,
    /// Display name
    pub name: String,
    /// Target URL
    pub url: String,
    /// Declared icon, or the favicon of `url`
    pub icon_url: Option<String>,
}

/// A project ready for rendering
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PopulatedProject {
    /// Identifier unique within one population run
    pub id: String,
    /// Declared name, or the repository name
    pub name: Option<String>,
    /// Declared description, or the repository description
    pub description: Option<String>,
    /// Declared URL, or the repository homepage
    pub url: Option<String>,
    /// `owner/repo` identifier
    pub github_repository: Option<String>,
    /// Repository page on GitHub
    pub github_repository_url: Option<String>,
    /// Declared image, or the favicon of `url`
    pub image_url: Option<String>,
    /// Declared languages, or those reported for the repository
    pub languages: Option<Vec<String>>,
    /// Declared technologies without repeats
    pub technologies: Vec<String>,
}

/// The portfolio document with every derivable field filled in
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PopulatedConfiguration {
    /// Declared name, or the profile display name
    pub name: Option<String>,
    /// Page title
    pub title: String,
    /// Declared description, or the profile bio
    pub description: Option<String>,
    /// Declared image, or the profile avatar
    pub image_url: Option<String>,
    /// GitHub login
    pub github_username: String,
    /// Public profile page
    pub github_user_url: String,
    /// Declared links followed by the profile link
    pub links: Vec<PopulatedLink>,
    /// Declared projects in order
    pub projects: Vec<PopulatedProject>,
}

/// Merges a raw configuration with whatever the profile source can supply
#[derive(Clone)]
pub struct Enricher {
    source: Arc<dyn ProfileSource>,
}

impl Enricher {
    /// Creates an enricher over `source`
    pub fn new(source: Arc<dyn ProfileSource>) -> Self {
        Self { source }
    }

    /// Builds the populated configuration.
    ///
    /// The profile lookup and one lookup per distinct repository run
    /// concurrently; each one that fails is logged and ignored.
    pub async fn populate(&self, configuration: RawConfiguration) -> PopulatedConfiguration {
        let RawConfiguration {
            name,
            title,
            description,
            image_url,
            github_username,
            links,
            projects,
        } = configuration;
        let projects = projects.unwrap_or_default();

        let github_user_url = profile_url(&github_username);
        let repositories = distinct_repositories(&projects);

        let (profile, repository_infos) = join(
            self.user_profile(&github_username),
            self.repository_infos(&repositories),
        )
        .await;

        let links = links
            .unwrap_or_default()
            .into_iter()
            .chain(std::iter::once(RawLink {
                name: PROFILE_LINK_NAME.to_string(),
                url: github_user_url.clone(),
                icon_url: None,
            }))
            .map(populate_link)
            .collect();

        let projects = projects
            .into_iter()
            .map(|project| {
                let info = project
                    .github_repository
                    .as_deref()
                    .and_then(|id| repository_infos.get(id));
                populate_project(project, info)
            })
            .collect();

        let profile = profile.as_ref();
        PopulatedConfiguration {
            name: declared(name).or_else(|| profile.map(|p| p.name.clone())),
            title: declared(title).unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            description: declared(description).or_else(|| profile.map(|p| p.bio.clone())),
            image_url: declared(image_url).or_else(|| profile.map(|p| p.avatar_url.clone())),
            github_username,
            github_user_url,
            links,
            projects,
        }
    }

    async fn user_profile(&self, username: &str) -> Option<ExternalUserProfile> {
        match self.source.fetch_user_profile(username).await {
            Ok(profile) => Some(profile),
            Err(e) => {
                warn!("Profile data unavailable for {}: {}", username, e);
                None
            }
        }
    }

    async fn repository_infos(&self, ids: &[String]) -> HashMap<String, ExternalRepositoryInfo> {
        let lookups = ids.iter().map(|id| async move {
            (id, self.source.fetch_repository_info(id).await)
        });

        join_all(lookups)
            .await
            .into_iter()
            .filter_map(|(id, result)| match result {
                Ok(info) => Some((id.clone(), info)),
                Err(e) => {
                    warn!("Repository data unavailable for {}: {}", id, e);
                    None
                }
            })
            .collect()
    }
}

/// Public profile page for a GitHub login
pub fn profile_url(username: &str) -> String {
    format!("{}/{}", GITHUB_BASE, username)
}

/// Favicon-service URL for the host of `target`.
///
/// Accepts bare hosts such as `example.com` as well as absolute URLs. Returns
/// `None` when no host can be derived.
pub fn favicon_url(target: &str) -> Option<String> {
    let parsed = match Url::parse(target) {
        Ok(parsed) => parsed,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            Url::parse(&format!("https://{}", target)).ok()?
        }
        Err(_) => return None,
    };
    let host = parsed.host_str().filter(|h| !h.is_empty())?;

    let mut favicon = Url::parse(FAVICON_SERVICE).ok()?;
    favicon
        .query_pairs_mut()
        .append_pair("domain", host)
        .append_pair("sz", &FAVICON_SIZE.to_string());
    Some(favicon.into())
}

fn populate_link(link: RawLink) -> PopulatedLink {
    let icon_url = declared(link.icon_url).or_else(|| favicon_url(&link.url));
    PopulatedLink {
        id: new_id(),
        name: link.name,
        url: link.url,
        icon_url,
    }
}

fn populate_project(project: RawProject, info: Option<&ExternalRepositoryInfo>) -> PopulatedProject {
    let github_repository = declared(project.github_repository);
    let url = declared(project.url)
        .or_else(|| info.and_then(|i| i.homepage.clone()).and_then(non_empty));

    let image_url = match project.image_url {
        Nullable::Value(image) if !image.is_empty() => Some(image),
        Nullable::Null => None,
        Nullable::Value(_) | Nullable::Absent => url.as_deref().and_then(favicon_url),
    };

    let github_repository_url = github_repository
        .as_deref()
        .map(|id| format!("{}/{}", GITHUB_BASE, id));

    if let (Some(id), None) = (&github_repository, info) {
        debug!("Populating {} from declared fields only", id);
    }

    PopulatedProject {
        id: new_id(),
        name: declared(project.name).or_else(|| info.map(|i| i.name.clone())),
        description: declared(project.description)
            .or_else(|| info.and_then(|i| i.description.clone()).and_then(non_empty)),
        url,
        github_repository,
        github_repository_url,
        image_url,
        languages: project
            .languages
            .or_else(|| info.and_then(|i| i.languages.clone())),
        technologies: dedup(project.technologies.unwrap_or_default()),
    }
}

fn distinct_repositories(projects: &[RawProject]) -> Vec<String> {
    let mut seen = HashSet::new();
    projects
        .iter()
        .filter_map(|p| p.github_repository.as_ref())
        .filter(|id| !id.is_empty() && seen.insert(id.as_str()))
        .cloned()
        .collect()
}

/// Removes repeated entries, keeping the first occurrence of each
fn dedup(values: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter(|value| seen.insert(value.clone()))
        .collect()
}

// Empty strings count as not declared.
fn declared(value: Option<String>) -> Option<String> {
    value.and_then(non_empty)
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

fn new_id() -> String {
    Uuid::now_v7().to_string()
}
