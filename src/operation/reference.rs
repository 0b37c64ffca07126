use super::TemporaryId;
use crate::authorize::RepoSlug;
use crate::resolve::TemporaryIdMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// A concrete platform resource (issue or pull request).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub repository: RepoSlug,
    pub number: u64,
    /// Platform-internal id, needed by the sub-issue API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ResourceRef {
    pub fn new(repository: RepoSlug, number: u64) -> Self {
        Self {
            repository,
            number,
            id: None,
            url: None,
        }
    }

    /// `#N` when in `context`, `owner/repo#N` otherwise.
    pub fn render_from(&self, context: &RepoSlug) -> String {
        if &self.repository == context {
            format!("#{}", self.number)
        } else {
            self.to_string()
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.repository, self.number)
    }
}

impl FromStr for ResourceRef {
    type Err = String;

    /// Parses `owner/repo#N`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (repo, number) = s
            .trim()
            .rsplit_once('#')
            .ok_or_else(|| format!("expected owner/repo#N, got '{s}'"))?;
        let repository = RepoSlug::parse(repo).map_err(|e| e.to_string())?;
        let number = number
            .parse::<u64>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| format!("invalid number in '{s}'"))?;
        Ok(Self::new(repository, number))
    }
}

/// A typed reference to an issue-like resource.
///
/// Temporary ids are swapped in place for resolved references; the text of
/// the operation is never searched and replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueRef {
    /// A literal number not yet bound to a repository.
    Number(u64),
    Unresolved(TemporaryId),
    Resolved(ResourceRef),
}

impl IssueRef {
    /// Accepts `42`, `"42"`, `"#42"` or a temporary id.
    pub fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Number(n) => n
                .as_u64()
                .filter(|n| *n > 0)
                .map(Self::Number)
                .ok_or_else(|| "must be a positive integer".to_string()),
            Value::String(s) => Self::from_text(s),
            _ => Err("must be an issue number or temporary id".to_string()),
        }
    }

    pub fn from_text(raw: &str) -> Result<Self, String> {
        let trimmed = raw.trim();
        let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);
        if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
            return digits
                .parse::<u64>()
                .ok()
                .filter(|n| *n > 0)
                .map(Self::Number)
                .ok_or_else(|| "must be a positive integer".to_string());
        }
        if let Some(id) = TemporaryId::parse(trimmed) {
            return Ok(Self::Unresolved(id));
        }
        if TemporaryId::looks_like(trimmed) {
            return Err("malformed temporary id (expected aw_ + 3-12 alphanumerics)".into());
        }
        Err("must be an issue number or temporary id".to_string())
    }

    /// Bind a literal number to the operation's target repository.
    pub fn bind_repository(&mut self, repository: &RepoSlug) {
        if let Self::Number(number) = *self {
            *self = Self::Resolved(ResourceRef::new(repository.clone(), number));
        }
    }

    pub fn temporary_id(&self) -> Option<&TemporaryId> {
        match self {
            Self::Unresolved(id) => Some(id),
            _ => None,
        }
    }

    pub fn resolved(&self) -> Option<&ResourceRef> {
        match self {
            Self::Resolved(r) => Some(r),
            _ => None,
        }
    }

    /// Replace a placeholder with its resolved target, if known.
    /// Returns `false` when a placeholder remains.
    pub fn substitute(&mut self, map: &TemporaryIdMap) -> bool {
        if let Self::Unresolved(id) = self {
            match map.resolve(id) {
                Some(resolved) => *self = Self::Resolved(resolved),
                None => return false,
            }
        }
        true
    }
}

impl fmt::Display for IssueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "#{n}"),
            Self::Unresolved(id) => write!(f, "#{id}"),
            Self::Resolved(r) => write!(f, "{r}"),
        }
    }
}
