use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const MAX_OWNER_LEN: usize = 39;
const MAX_NAME_LEN: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepoSlugError {
    #[error("repository is empty")]
    Empty,
    #[error("repository must be 'owner/repo', not a URL")]
    ProtocolPrefix,
    #[error("repository must have exactly one '/' separating owner and name")]
    Shape,
    #[error("owner must be 1-39 letters, digits or '-', not starting with '-'")]
    InvalidOwner,
    #[error("name must be 1-100 letters, digits, '.', '_' or '-', and not '.' or '..'")]
    InvalidName,
}

/// A well-formed `owner/repo` identifier. Comparison is exact and
/// case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepoSlug {
    owner: String,
    name: String,
}

impl RepoSlug {
    pub fn parse(raw: &str) -> Result<Self, RepoSlugError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(RepoSlugError::Empty);
        }
        if trimmed.contains("://") || trimmed.contains(':') || trimmed.starts_with("//") {
            return Err(RepoSlugError::ProtocolPrefix);
        }
        let mut parts = trimmed.split('/');
        let (Some(owner), Some(name), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(RepoSlugError::Shape);
        };
        if !valid_owner(owner) {
            return Err(RepoSlugError::InvalidOwner);
        }
        if !valid_name(name) {
            return Err(RepoSlugError::InvalidName);
        }
        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

fn valid_owner(owner: &str) -> bool {
    (1..=MAX_OWNER_LEN).contains(&owner.len())
        && !owner.starts_with('-')
        && owner.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

fn valid_name(name: &str) -> bool {
    (1..=MAX_NAME_LEN).contains(&name.len())
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

impl fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepoSlug {
    type Err = RepoSlugError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RepoSlug {
    type Error = RepoSlugError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RepoSlug> for String {
    fn from(value: RepoSlug) -> Self {
        value.to_string()
    }
}
