//! Image resolution
//!
//! Picks exactly one canonical base image for a platform token out of the
//! unsorted listing a public image project returns.

use crate::error::{CloudError, Result};
use crate::resource::Document;
use chrono::{DateTime, FixedOffset};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::debug;

/// Project that publishes the base images for a platform family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerProject {
    Debian,
    Centos,
    Rhel,
    Sles,
    /// Anything not published by a known project; never resolvable
    Custom,
}

impl OwnerProject {
    pub fn project(&self) -> &'static str {
        match self {
            OwnerProject::Debian => "debian-cloud",
            OwnerProject::Centos => "centos-cloud",
            OwnerProject::Rhel => "rhel-cloud",
            OwnerProject::Sles => "sles-cloud",
            OwnerProject::Custom => "custom",
        }
    }
}

impl std::fmt::Display for OwnerProject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.project())
    }
}

/// Keyword -> owner project, checked in order
static OWNER_KEYWORDS: LazyLock<Vec<(&'static str, OwnerProject)>> = LazyLock::new(|| {
    vec![
        ("debian", OwnerProject::Debian),
        ("centos", OwnerProject::Centos),
        ("rhel", OwnerProject::Rhel),
        ("sles", OwnerProject::Sles),
        ("suse", OwnerProject::Sles),
    ]
});

/// Owner project and candidate filter for one platform token
#[derive(Debug, Clone)]
pub struct PlatformImagePolicy {
    pub owner: OwnerProject,
    pub name_pattern: Regex,
}

impl PlatformImagePolicy {
    /// Build the policy for a platform token
    ///
    /// `centos-7-x86_64` belongs to `centos-cloud` and accepts images named
    /// (or in a family) starting with `centos-7`.
    pub fn for_platform(platform: &str) -> Result<Self> {
        let owner = classify_platform(platform)?;

        let mut parts = platform.splitn(3, '-');
        let pattern = match (parts.next(), parts.next()) {
            (Some(name), Some(version)) if !version.is_empty() => {
                format!("^{}-{}", regex::escape(name), regex::escape(version))
            }
            (Some(name), _) => format!("^{}", regex::escape(name)),
            _ => return Err(CloudError::UnsupportedPlatform(platform.to_string())),
        };

        let name_pattern = Regex::new(&pattern)
            .map_err(|_| CloudError::UnsupportedPlatform(platform.to_string()))?;

        Ok(Self {
            owner,
            name_pattern,
        })
    }

    pub fn matches(&self, candidate: &ImageCandidate) -> bool {
        self.name_pattern.is_match(&candidate.name)
            || candidate
                .family
                .as_deref()
                .is_some_and(|family| self.name_pattern.is_match(family))
    }
}

/// Derive the owner project from a platform token's prefix
///
/// Runs without any candidate list, so unsupported platforms are rejected
/// before a listing request is made.
pub fn classify_platform(platform: &str) -> Result<OwnerProject> {
    let token = platform.to_ascii_lowercase();
    let owner = OWNER_KEYWORDS
        .iter()
        .find(|(keyword, _)| token.starts_with(keyword))
        .map(|(_, owner)| *owner)
        .unwrap_or(OwnerProject::Custom);

    match owner {
        OwnerProject::Custom => Err(CloudError::UnsupportedPlatform(platform.to_string())),
        known => Ok(known),
    }
}

/// One entry of an image listing
#[derive(Debug, Clone, PartialEq)]
pub struct ImageCandidate {
    pub name: String,
    pub family: Option<String>,
    pub creation_timestamp: Option<DateTime<FixedOffset>>,
    pub deprecated: bool,
    pub self_link: Option<String>,
    /// Every field the listing returned
    pub raw: Document,
}

impl ImageCandidate {
    /// Parse a listing entry; `None` if it carries no name
    ///
    /// An image counts as deprecated when its `deprecated` block has any
    /// state other than `ACTIVE`.
    pub fn from_document(doc: Document) -> Option<Self> {
        let name = doc.name()?.to_string();
        let family = doc.str_field("family").map(str::to_string);
        let creation_timestamp = doc
            .str_field("creationTimestamp")
            .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok());
        let deprecated = match doc.as_value().get("deprecated") {
            Some(serde_json::Value::Bool(flag)) => *flag,
            Some(serde_json::Value::Object(block)) => {
                block.get("state").and_then(|s| s.as_str()) != Some("ACTIVE")
            }
            _ => false,
        };
        let self_link = doc.self_link().map(str::to_string);

        Some(Self {
            name,
            family,
            creation_timestamp,
            deprecated,
            self_link,
            raw: doc,
        })
    }

    /// Parse a whole listing, skipping nameless entries
    pub fn from_documents(docs: impl IntoIterator<Item = Document>) -> Vec<Self> {
        docs.into_iter().filter_map(Self::from_document).collect()
    }
}

/// Select the newest non-deprecated image for a platform
///
/// Ties on `creationTimestamp` go to the lexicographically greatest name.
/// Candidates with an unparsable timestamp sort before every dated one.
pub fn resolve_latest_image(platform: &str, candidates: &[ImageCandidate]) -> Result<ImageCandidate> {
    let policy = PlatformImagePolicy::for_platform(platform)?;

    let latest = candidates
        .iter()
        .filter(|c| !c.deprecated && policy.matches(c))
        .max_by(|a, b| {
            a.creation_timestamp
                .cmp(&b.creation_timestamp)
                .then_with(|| a.name.cmp(&b.name))
        });

    match latest {
        Some(image) => {
            debug!("Resolved {} to image {}", platform, image.name);
            Ok(image.clone())
        }
        None => Err(CloudError::NoMatchingImage {
            platform: platform.to_string(),
            considered: candidates.len(),
        }),
    }
}
