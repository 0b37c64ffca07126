//! Compile-time agreement check for the run configuration.
//!
//! The workflow compiler records a SHA-256 digest of the configuration it
//! produced. Before any operation is examined the pipeline recomputes the
//! digest over what it actually loaded; a mismatch fails the whole batch.

use super::SafeOutputsConfig;
use crate::error::ConfigError;
use sha2::{Digest, Sha256};

/// Fields excluded from the digest: the digest itself and the per-run knobs
/// the environment may override.
const UNHASHED_FIELDS: &[&str] = &["integrity", "staged", "run_url"];

/// SHA-256 (lowercase hex) over the canonical JSON of `config`.
///
/// Canonical means object keys sorted, no insignificant whitespace.
pub fn config_digest(config: &SafeOutputsConfig) -> Result<String, ConfigError> {
    let mut value =
        serde_json::to_value(config).map_err(|e| ConfigError::Parse(e.to_string()))?;
    if let Some(object) = value.as_object_mut() {
        for field in UNHASHED_FIELDS {
            object.remove(*field);
        }
    }
    let canonical = serde_json::to_vec(&value).map_err(|e| ConfigError::Parse(e.to_string()))?;
    Ok(hex::encode(Sha256::digest(&canonical)))
}

/// Compare the expected digest (if any) against the computed one.
pub fn verify(config: &SafeOutputsConfig) -> Result<(), ConfigError> {
    let Some(expected) = config.integrity.as_deref() else {
        return Ok(());
    };
    let actual = config_digest(config)?;
    if expected.trim().eq_ignore_ascii_case(&actual) {
        Ok(())
    } else {
        Err(ConfigError::IntegrityMismatch {
            expected: expected.trim().to_string(),
            actual,
        })
    }
}
