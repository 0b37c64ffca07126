use super::SafeOutputsConfig;
use crate::authorize::RepoSlug;
use crate::error::ConfigError;
use std::path::Path;

const MAX_RETRY_ATTEMPTS: u32 = 10;
const MAX_RETRY_DELAY_MS: u64 = 60_000;

impl SafeOutputsConfig {
    /// Load from a TOML file, or JSON when the extension is `.json`.
    ///
    /// Env overrides are applied and the result validated before returning.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Load(format!("{}: {e}", path.display())))?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let mut config = if is_json {
            Self::from_json_str(&contents)?
        } else {
            Self::from_toml_str(&contents)?
        };
        config.apply_env_overrides();
        config.validate()?;
        tracing::debug!(
            path = %path.display(),
            repository = %config.repository,
            staged = config.staged,
            "Loaded safe-outputs config"
        );
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn from_json_str(contents: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Structural consistency checks. Runs once at batch start.
    pub fn validate(&self) -> Result<(), ConfigError> {
        RepoSlug::parse(&self.repository).map_err(|e| {
            ConfigError::Validation(format!("repository '{}': {e}", self.repository))
        })?;

        if let Some(list) = &self.allowed_repos {
            validate_repo_allowlist("allowed_repos", list)?;
        }
        for kind in crate::operation::OperationKind::ALL {
            if let Some(common) = self.operations.common(kind)
                && let Some(list) = &common.allowed_repos
            {
                validate_repo_allowlist(&format!("operations.{kind}.allowed_repos"), list)?;
            }
        }

        if let Some(domains) = &self.allowed_domains
            && let Some(bad) = domains.iter().find(|d| d.trim().is_empty())
        {
            return Err(ConfigError::Validation(format!(
                "allowed_domains contains an empty entry ('{bad}')"
            )));
        }

        for id in self.temporary_ids.keys() {
            if crate::operation::TemporaryId::parse(id).is_none() {
                return Err(ConfigError::Validation(format!(
                    "temporary_ids key '{id}' is not a temporary id"
                )));
            }
        }

        if self.retry.max_attempts == 0 || self.retry.max_attempts > MAX_RETRY_ATTEMPTS {
            return Err(ConfigError::Validation(format!(
                "retry.max_attempts must be between 1 and {MAX_RETRY_ATTEMPTS}"
            )));
        }
        if self.retry.multiplier == 0 {
            return Err(ConfigError::Validation(
                "retry.multiplier must be at least 1".into(),
            ));
        }
        if self.retry.max_delay_ms > MAX_RETRY_DELAY_MS
            || self.retry.base_delay_ms > self.retry.max_delay_ms
        {
            return Err(ConfigError::Validation(format!(
                "retry delays must satisfy base_delay_ms <= max_delay_ms <= {MAX_RETRY_DELAY_MS}"
            )));
        }
        if self.sanitize.max_length == 0 {
            return Err(ConfigError::Validation(
                "sanitize.max_length must be positive".into(),
            ));
        }
        Ok(())
    }
}

fn validate_repo_allowlist(name: &str, list: &[String]) -> Result<(), ConfigError> {
    for entry in list {
        if entry.contains('*') {
            return Err(ConfigError::Validation(format!(
                "{name}: wildcard entry '{entry}' is not supported"
            )));
        }
        RepoSlug::parse(entry)
            .map_err(|e| ConfigError::Validation(format!("{name}: '{entry}': {e}")))?;
    }
    Ok(())
}
