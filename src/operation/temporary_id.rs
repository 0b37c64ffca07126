use serde::{Deserialize, Serialize};
use std::fmt;

const PREFIX: &str = "aw_";
const MIN_SUFFIX: usize = 3;
const MAX_SUFFIX: usize = 12;

/// Placeholder for a resource that does not exist yet (`aw_` + 3..=12
/// alphanumerics). Always stored lowercase without a leading `#`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemporaryId(String);

impl TemporaryId {
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let trimmed = trimmed.strip_prefix('#').unwrap_or(trimmed);
        let lowered = trimmed.to_ascii_lowercase();
        let suffix = lowered.strip_prefix(PREFIX)?;
        let len = suffix.len();
        if !(MIN_SUFFIX..=MAX_SUFFIX).contains(&len)
            || !suffix.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return None;
        }
        Some(Self(lowered))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `raw` looks like an attempt at a temporary id, valid or not.
    pub fn looks_like(raw: &str) -> bool {
        let trimmed = raw.trim().trim_start_matches('#');
        trimmed
            .get(..PREFIX.len())
            .is_some_and(|p| p.eq_ignore_ascii_case(PREFIX))
    }
}

impl fmt::Display for TemporaryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
