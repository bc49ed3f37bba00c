//! Typed shapes for the portfolio document and the GitHub API responses it is
//! enriched with, plus structural validation from untyped JSON values.
//!
//! Validation never panics on any input shape. It walks the value once and
//! collects every violated constraint, so a document with three bad fields
//! reports all three.

use crate::error::{ValidationErrors, Violation, ViolationKind};
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use url::Url;

/// A field that distinguishes "not given" from an explicit `null`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Nullable<T> {
    /// The key is not present
    #[default]
    Absent,
    /// The key is present with a `null` value
    Null,
    /// The key holds a value
    Value(T),
}

impl<T> Nullable<T> {
    /// Checks if the key was left out entirely
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// The held value, if any
    pub fn as_value(&self) -> Option<&T> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }
}

impl<T: Serialize> Serialize for Nullable<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Value(value) => value.serialize(serializer),
            Self::Absent | Self::Null => serializer.serialize_none(),
        }
    }
}

/// A link declared in the portfolio document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawLink {
    /// Display name
    pub name: String,
    /// Absolute target URL
    pub url: String,
    /// Explicit icon URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

/// A project declared in the portfolio document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RawProject {
    /// Display name, backfilled from the repository when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Short description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Project homepage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Repository identifier in `owner/repo` form
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github_repository: Option<String>,
    /// Image URL; an explicit `null` disables the favicon fallback
    #[serde(skip_serializing_if = "Nullable::is_absent")]
    pub image_url: Nullable<String>,
    /// Languages, backfilled from the repository when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub languages: Option<Vec<String>>,
    /// Technologies, possibly with duplicates
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technologies: Option<Vec<String>>,
}

/// The portfolio document as authored
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RawConfiguration {
    /// Owner's display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Page title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// About-me text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Profile image
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// GitHub login used for profile enrichment
    pub github_username: String,
    /// Declared links in order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<RawLink>>,
    /// Declared projects in order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projects: Option<Vec<RawProject>>,
}

/// Subset of `GET /users/{username}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExternalUserProfile {
    /// Avatar image
    pub avatar_url: String,
    /// API URL of the user
    pub url: String,
    /// Public profile page
    pub html_url: String,
    /// Display name
    pub name: String,
    /// Free-form location
    pub location: String,
    /// Profile bio
    pub bio: String,
}

/// Subset of `GET /repos/{owner}/{repo}` plus the language names from its
/// `languages_url`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExternalRepositoryInfo {
    /// Repository name without the owner
    pub name: String,
    /// Repository page
    pub html_url: String,
    /// Repository description
    pub description: Option<String>,
    /// Endpoint of the language breakdown
    pub languages_url: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last update time
    pub updated_at: DateTime<Utc>,
    /// Project homepage
    pub homepage: Option<String>,
    /// Primary language
    pub language: Option<String>,
    /// Language names, largest first; only present once merged
    pub languages: Option<Vec<String>>,
}

/// Types that can be checked out of an untrusted JSON value
pub trait Validate: Sized {
    /// Produces the typed value or every violated constraint
    fn validate(value: &Value) -> Result<Self, ValidationErrors>;
}

impl Validate for RawConfiguration {
    fn validate(value: &Value) -> Result<Self, ValidationErrors> {
        let mut violations = Vec::new();
        let configuration = read_configuration(value, &mut violations);
        finish(configuration, violations)
    }
}

impl Validate for ExternalUserProfile {
    fn validate(value: &Value) -> Result<Self, ValidationErrors> {
        let mut violations = Vec::new();
        let profile = ObjectReader::open(value, String::new(), &mut violations).and_then(|mut r| {
            let avatar_url = r.required("avatar_url", Kind::Url);
            let url = r.required("url", Kind::Url);
            let html_url = r.required("html_url", Kind::Url);
            let name = r.required("name", Kind::Text);
            let location = r.required("location", Kind::Text);
            let bio = r.required("bio", Kind::Text);
            Some(ExternalUserProfile {
                avatar_url: avatar_url?,
                url: url?,
                html_url: html_url?,
                name: name?,
                location: location?,
                bio: bio?,
            })
        });
        finish(profile, violations)
    }
}

impl Validate for ExternalRepositoryInfo {
    fn validate(value: &Value) -> Result<Self, ValidationErrors> {
        let mut violations = Vec::new();
        let info = ObjectReader::open(value, String::new(), &mut violations).and_then(|mut r| {
            let name = r.required("name", Kind::Text);
            let html_url = r.required("html_url", Kind::Url);
            let description = r.nullable("description", Kind::Text);
            let languages_url = r.required("languages_url", Kind::Url);
            let created_at = r.timestamp("created_at");
            let updated_at = r.timestamp("updated_at");
            let homepage = r.required_nullable("homepage", Kind::Text);
            let language = r.nullable("language", Kind::Text);
            let languages = r.strings("languages");
            Some(ExternalRepositoryInfo {
                name: name?,
                html_url: html_url?,
                description: description.as_value().cloned(),
                languages_url: languages_url?,
                created_at: created_at?,
                updated_at: updated_at?,
                homepage: homepage?,
                language: language.as_value().cloned(),
                languages,
            })
        });
        finish(info, violations)
    }
}

fn finish<T>(value: Option<T>, violations: Vec<Violation>) -> Result<T, ValidationErrors> {
    match value {
        Some(value) if violations.is_empty() => Ok(value),
        _ => Err(ValidationErrors(violations)),
    }
}

fn read_configuration(value: &Value, violations: &mut Vec<Violation>) -> Option<RawConfiguration> {
    let mut r = ObjectReader::open(value, String::new(), violations)?;
    let name = r.optional("name", Kind::Text);
    let title = r.optional("title", Kind::Text);
    let description = r.optional("description", Kind::Text);
    let image_url = r.optional("image_url", Kind::Url);
    let github_username = r.required("github_username", Kind::Text);
    let links = r.list("links", read_link);
    let projects = r.list("projects", read_project);
    Some(RawConfiguration {
        name,
        title,
        description,
        image_url,
        github_username: github_username?,
        links,
        projects,
    })
}

fn read_link(value: &Value, path: String, violations: &mut Vec<Violation>) -> Option<RawLink> {
    let mut r = ObjectReader::open(value, path, violations)?;
    let name = r.required("name", Kind::Text);
    let url = r.required("url", Kind::Url);
    let icon_url = r.optional("icon_url", Kind::Url);
    Some(RawLink {
        name: name?,
        url: url?,
        icon_url,
    })
}

fn read_project(value: &Value, path: String, violations: &mut Vec<Violation>) -> Option<RawProject> {
    let mut r = ObjectReader::open(value, path, violations)?;
    Some(RawProject {
        name: r.optional("name", Kind::Text),
        description: r.optional("description", Kind::Text),
        url: r.optional("url", Kind::Url),
        github_repository: r.optional("github_repository", Kind::Repository),
        image_url: r.nullable("image_url", Kind::Url),
        languages: r.strings("languages"),
        technologies: r.strings("technologies"),
    })
}

#[derive(Clone, Copy)]
enum Kind {
    Text,
    Url,
    // Empty is accepted and treated as undeclared downstream.
    Repository,
}

/// Checks a string is an `owner/repo` identifier: exactly two non-empty
/// segments of letters, digits, `-`, `_` or `.`, neither of them `.` or `..`
pub fn is_repository_identifier(candidate: &str) -> bool {
    let mut segments = candidate.split('/');
    let (Some(owner), Some(repo), None) = (segments.next(), segments.next(), segments.next()) else {
        return false;
    };
    [owner, repo].iter().all(|segment| {
        !segment.is_empty()
            && *segment != "."
            && *segment != ".."
            && segment
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    })
}

/// Checks a string is an absolute URL with a scheme and, for hierarchical
/// schemes, a host
pub fn is_absolute_url(candidate: &str) -> bool {
    match Url::parse(candidate) {
        Ok(url) => url.cannot_be_a_base() || url.has_host(),
        Err(_) => false,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Reads fields of one JSON object, recording violations under its path
struct ObjectReader<'a, 'v> {
    map: &'a Map<String, Value>,
    path: String,
    violations: &'v mut Vec<Violation>,
}

impl<'a, 'v> ObjectReader<'a, 'v> {
    fn open(value: &'a Value, path: String, violations: &'v mut Vec<Violation>) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self {
                map,
                path,
                violations,
            }),
            other => {
                tracing::trace!("expected object at {:?}, found {}", path, type_name(other));
                violations.push(Violation {
                    path,
                    kind: ViolationKind::WrongType { expected: "object" },
                });
                None
            }
        }
    }

    fn get(&self, key: &str) -> Option<&'a Value> {
        let map: &'a Map<String, Value> = self.map;
        map.get(key)
    }

    fn field_path(&self, key: &str) -> String {
        if self.path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.path, key)
        }
    }

    fn push(&mut self, path: String, kind: ViolationKind) {
        self.violations.push(Violation { path, kind });
    }

    fn required(&mut self, key: &str, kind: Kind) -> Option<String> {
        match self.get(key) {
            Some(value) => self.scalar(key, value, kind),
            None => {
                let path = self.field_path(key);
                self.push(path, ViolationKind::Missing);
                None
            }
        }
    }

    fn optional(&mut self, key: &str, kind: Kind) -> Option<String> {
        let value = self.get(key)?;
        self.scalar(key, value, kind)
    }

    fn nullable(&mut self, key: &str, kind: Kind) -> Nullable<String> {
        match self.get(key) {
            None => Nullable::Absent,
            Some(Value::Null) => Nullable::Null,
            Some(value) => self
                .scalar(key, value, kind)
                .map_or(Nullable::Absent, Nullable::Value),
        }
    }

    /// Present but possibly `null`. The outer `None` means a violation.
    fn required_nullable(&mut self, key: &str, kind: Kind) -> Option<Option<String>> {
        match self.get(key) {
            None => {
                let path = self.field_path(key);
                self.push(path, ViolationKind::Missing);
                None
            }
            Some(Value::Null) => Some(None),
            Some(value) => self.scalar(key, value, kind).map(Some),
        }
    }

    fn timestamp(&mut self, key: &str) -> Option<DateTime<Utc>> {
        let raw = self.required(key, Kind::Text)?;
        match DateTime::parse_from_rfc3339(&raw) {
            Ok(parsed) => Some(parsed.with_timezone(&Utc)),
            Err(_) => {
                let path = self.field_path(key);
                self.push(path, ViolationKind::MalformedTimestamp);
                None
            }
        }
    }

    fn scalar(&mut self, key: &str, value: &Value, kind: Kind) -> Option<String> {
        let Some(text) = value.as_str() else {
            let path = self.field_path(key);
            self.push(path, ViolationKind::WrongType { expected: "string" });
            return None;
        };
        match kind {
            Kind::Url if !is_absolute_url(text) => {
                let path = self.field_path(key);
                self.push(path, ViolationKind::MalformedUrl);
                None
            }
            Kind::Repository if !text.is_empty() && !is_repository_identifier(text) => {
                let path = self.field_path(key);
                self.push(path, ViolationKind::MalformedRepository);
                None
            }
            _ => Some(text.to_string()),
        }
    }

    fn array(&mut self, key: &str) -> Option<&'a Vec<Value>> {
        match self.get(key)? {
            Value::Array(items) => Some(items),
            _ => {
                let path = self.field_path(key);
                self.push(path, ViolationKind::WrongType { expected: "array" });
                None
            }
        }
    }

    fn strings(&mut self, key: &str) -> Option<Vec<String>> {
        let items = self.array(key)?;
        let base = self.field_path(key);
        let mut out = Vec::with_capacity(items.len());
        let mut valid = true;
        for (i, item) in items.iter().enumerate() {
            match item.as_str() {
                Some(text) => out.push(text.to_string()),
                None => {
                    valid = false;
                    self.push(
                        format!("{base}[{i}]"),
                        ViolationKind::WrongType { expected: "string" },
                    );
                }
            }
        }
        valid.then_some(out)
    }

    fn list<T>(
        &mut self,
        key: &str,
        read: fn(&Value, String, &mut Vec<Violation>) -> Option<T>,
    ) -> Option<Vec<T>> {
        let items = self.array(key)?;
        let base = self.field_path(key);
        let mut out = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            if let Some(parsed) = read(item, format!("{base}[{i}]"), self.violations) {
                out.push(parsed);
            }
        }
        Some(out)
    }
}
