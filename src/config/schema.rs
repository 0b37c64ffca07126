use super::operations::OperationsConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Configuration for one safe-output run.
///
/// Produced by the workflow compiler and immutable for the duration of a
/// batch. Every per-type capability lives under `operations`; a type with no
/// entry there was never offered to the agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafeOutputsConfig {
    /// The workflow's own repository (`owner/repo`).
    pub repository: String,

    #[serde(default)]
    pub workflow_name: String,

    #[serde(default)]
    pub run_url: Option<String>,

    /// Staged (preview) mode: every stage runs, no platform call is made.
    #[serde(default)]
    pub staged: bool,

    /// Global repository allowlist for cross-repository targets.
    #[serde(default)]
    pub allowed_repos: Option<Vec<String>>,

    /// Domain allowlist for links in free text. `None` disables filtering.
    #[serde(default)]
    pub allowed_domains: Option<Vec<String>>,

    /// Mentions that are delivered as-is instead of being neutralized.
    #[serde(default)]
    pub allowed_mentions: Vec<String>,

    #[serde(default)]
    pub context: TriggerContext,

    #[serde(default)]
    pub sanitize: SanitizeConfig,

    #[serde(default)]
    pub templates: TemplatesConfig,

    #[serde(default)]
    pub operations: OperationsConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub dispatch: DispatchConfig,

    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,

    #[serde(default)]
    pub gatekeeper: GatekeeperConfig,

    /// Temporary ids resolved by an earlier job (`aw_x = "owner/repo#12"`,
    /// or an alias `aw_x = "aw_y"`).
    #[serde(default)]
    pub temporary_ids: BTreeMap<String, String>,

    /// Expected SHA-256 digest of this config, agreed at compile time.
    #[serde(default)]
    pub integrity: Option<String>,
}

impl SafeOutputsConfig {
    /// Minimal config for the given repository with every type disabled.
    pub fn for_repository(repository: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            workflow_name: String::new(),
            run_url: None,
            staged: false,
            allowed_repos: None,
            allowed_domains: None,
            allowed_mentions: Vec::new(),
            context: TriggerContext::default(),
            sanitize: SanitizeConfig::default(),
            templates: TemplatesConfig::default(),
            operations: OperationsConfig::default(),
            retry: RetryConfig::default(),
            dispatch: DispatchConfig::default(),
            diagnostics: DiagnosticsConfig::default(),
            gatekeeper: GatekeeperConfig::default(),
            temporary_ids: BTreeMap::new(),
            integrity: None,
        }
    }
}

/// What triggered the run, used as the default target of issue operations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriggerContext {
    #[serde(default)]
    pub issue_number: Option<u64>,
    #[serde(default)]
    pub actor: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SanitizeConfig {
    #[serde(default = "default_max_length")]
    pub max_length: usize,
    /// Reject an operation whose text had a URL redacted instead of
    /// executing it with the redaction.
    #[serde(default)]
    pub reject_on_link_redaction: bool,
}

fn default_max_length() -> usize {
    65_536
}

impl Default for SanitizeConfig {
    fn default() -> Self {
        Self {
            max_length: default_max_length(),
            reject_on_link_redaction: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplatesConfig {
    /// Appended to created issues, pull requests and comments.
    #[serde(default)]
    pub footer: Option<String>,
    /// Hidden provenance marker appended after the footer.
    #[serde(default)]
    pub provenance: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_retry_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_retry_multiplier")]
    pub multiplier: u32,
    #[serde(default = "default_retry_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    500
}

fn default_retry_multiplier() -> u32 {
    2
}

fn default_retry_max_delay_ms() -> u64 {
    10_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_retry_attempts(),
            base_delay_ms: default_retry_base_delay_ms(),
            multiplier: default_retry_multiplier(),
            max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

/// What happens to siblings after one operation fails permanently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FailurePolicy {
    /// Independent operations still run.
    #[default]
    Isolate,
    /// Operations not yet started are skipped.
    AbortRemaining,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DispatchConfig {
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    /// "none" | "log" | "memory"
    pub backend: String,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            backend: "log".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatekeeperConfig {
    #[serde(default = "default_gate_window_minutes")]
    pub window_minutes: u64,
    #[serde(default = "default_gate_max_runs")]
    pub max_runs: u32,
    #[serde(default = "default_gate_min_run_secs")]
    pub min_run_secs: u64,
}

fn default_gate_window_minutes() -> u64 {
    60
}

fn default_gate_max_runs() -> u32 {
    5
}

fn default_gate_min_run_secs() -> u64 {
    10
}

impl Default for GatekeeperConfig {
    fn default() -> Self {
        Self {
            window_minutes: default_gate_window_minutes(),
            max_runs: default_gate_max_runs(),
            min_run_secs: default_gate_min_run_secs(),
        }
    }
}
