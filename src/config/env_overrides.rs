use super::SafeOutputsConfig;

const STAGED_VAR: &str = "SAFE_OUTPUTS_STAGED";
const REPOSITORY_VAR: &str = "GITHUB_REPOSITORY";
const DIGEST_VAR: &str = "SAFE_OUTPUTS_CONFIG_SHA256";
const RUN_URL_VAR: &str = "GITHUB_RUN_URL";

#[cfg(test)]
pub(crate) const OVERRIDE_VARS: [&str; 4] = [STAGED_VAR, REPOSITORY_VAR, DIGEST_VAR, RUN_URL_VAR];

impl SafeOutputsConfig {
    /// Apply run-time overrides from the workflow environment.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(staged) = std::env::var(STAGED_VAR)
            && let Some(flag) = parse_flag(&staged)
        {
            self.staged = flag;
        }

        if let Ok(repository) = std::env::var(REPOSITORY_VAR)
            && !repository.is_empty()
        {
            self.repository = repository;
        }

        if let Ok(digest) = std::env::var(DIGEST_VAR)
            && !digest.is_empty()
        {
            self.integrity = Some(digest.trim().to_ascii_lowercase());
        }

        if let Ok(run_url) = std::env::var(RUN_URL_VAR)
            && !run_url.is_empty()
        {
            self.run_url = Some(run_url);
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
