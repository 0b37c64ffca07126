mod env_overrides;
pub mod integrity;
mod loader;
pub mod operations;
pub mod schema;
#[cfg(test)]
pub(crate) mod test_env;

pub use integrity::config_digest;
pub use operations::{
    AddCommentConfig, AssignToAgentConfig, CloseIssueConfig, CommonTypeConfig,
    CreateIssueConfig, CreatePullRequestConfig, DispatchWorkflowConfig, LabelsConfig,
    LinkSubIssueConfig, OperationsConfig, ReportConfig, UpdateIssueConfig,
};
pub use schema::{
    DiagnosticsConfig, DispatchConfig, FailurePolicy, GatekeeperConfig, RetryConfig,
    SafeOutputsConfig, SanitizeConfig, TemplatesConfig, TriggerContext,
};
