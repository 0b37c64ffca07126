use crate::operation::OperationKind;
use serde::{Deserialize, Serialize};

fn default_max() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

/// Settings every operation type carries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommonTypeConfig {
    /// Maximum operations of this type per batch. `0` disables the type.
    #[serde(default = "default_max")]
    pub max: u32,
    /// Type-specific repository allowlist; overrides the global one.
    #[serde(default)]
    pub allowed_repos: Option<Vec<String>>,
}

impl Default for CommonTypeConfig {
    fn default() -> Self {
        Self {
            max: default_max(),
            allowed_repos: None,
        }
    }
}

impl CommonTypeConfig {
    /// A type with `max = 1` is atomic: more than one proposal rejects all.
    pub fn is_atomic(&self) -> bool {
        self.max == 1
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateIssueConfig {
    #[serde(flatten)]
    pub common: CommonTypeConfig,
    #[serde(default)]
    pub title_prefix: Option<String>,
    /// Labels added to every created issue.
    #[serde(default)]
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddCommentConfig {
    #[serde(flatten)]
    pub common: CommonTypeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePullRequestConfig {
    #[serde(flatten)]
    pub common: CommonTypeConfig,
    #[serde(default)]
    pub title_prefix: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default = "default_base_branch")]
    pub default_base: String,
    #[serde(default = "default_true")]
    pub draft: bool,
}

fn default_base_branch() -> String {
    "main".into()
}

impl Default for CreatePullRequestConfig {
    fn default() -> Self {
        Self {
            common: CommonTypeConfig::default(),
            title_prefix: None,
            labels: Vec::new(),
            default_base: default_base_branch(),
            draft: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateIssueConfig {
    #[serde(flatten)]
    pub common: CommonTypeConfig,
    #[serde(default = "default_true")]
    pub allow_title: bool,
    #[serde(default = "default_true")]
    pub allow_body: bool,
    #[serde(default = "default_true")]
    pub allow_state: bool,
}

impl Default for UpdateIssueConfig {
    fn default() -> Self {
        Self {
            common: CommonTypeConfig::default(),
            allow_title: true,
            allow_body: true,
            allow_state: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CloseIssueConfig {
    #[serde(flatten)]
    pub common: CommonTypeConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabelsConfig {
    #[serde(flatten)]
    pub common: CommonTypeConfig,
    /// When set, labels outside this list are dropped.
    #[serde(default)]
    pub allowed_labels: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkSubIssueConfig {
    #[serde(flatten)]
    pub common: CommonTypeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignToAgentConfig {
    #[serde(flatten)]
    pub common: CommonTypeConfig,
    #[serde(default = "default_agent")]
    pub default_agent: String,
    /// Agents that may be assigned. Empty means only `default_agent`.
    #[serde(default)]
    pub allowed_agents: Vec<String>,
}

fn default_agent() -> String {
    "copilot-swe-agent".into()
}

impl Default for AssignToAgentConfig {
    fn default() -> Self {
        Self {
            common: CommonTypeConfig::default(),
            default_agent: default_agent(),
            allowed_agents: Vec::new(),
        }
    }
}

impl AssignToAgentConfig {
    pub fn permits(&self, agent: &str) -> bool {
        agent == self.default_agent || self.allowed_agents.iter().any(|a| a == agent)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchWorkflowConfig {
    #[serde(flatten)]
    pub common: CommonTypeConfig,
    /// Workflows (file stem, no extension) the agent may dispatch.
    #[serde(default)]
    pub allowed_workflows: Vec<String>,
    #[serde(default = "default_ref")]
    pub default_ref: String,
}

fn default_ref() -> String {
    "main".into()
}

impl Default for DispatchWorkflowConfig {
    fn default() -> Self {
        Self {
            common: CommonTypeConfig::default(),
            allowed_workflows: Vec::new(),
            default_ref: default_ref(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(flatten)]
    pub common: CommonTypeConfig,
}

/// Per-type capabilities. `None` means the type was never offered.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperationsConfig {
    #[serde(default)]
    pub create_issue: Option<CreateIssueConfig>,
    #[serde(default)]
    pub add_comment: Option<AddCommentConfig>,
    #[serde(default)]
    pub create_pull_request: Option<CreatePullRequestConfig>,
    #[serde(default)]
    pub update_issue: Option<UpdateIssueConfig>,
    #[serde(default)]
    pub close_issue: Option<CloseIssueConfig>,
    #[serde(default)]
    pub add_labels: Option<LabelsConfig>,
    #[serde(default)]
    pub remove_labels: Option<LabelsConfig>,
    #[serde(default)]
    pub link_sub_issue: Option<LinkSubIssueConfig>,
    #[serde(default)]
    pub assign_to_agent: Option<AssignToAgentConfig>,
    #[serde(default)]
    pub dispatch_workflow: Option<DispatchWorkflowConfig>,
    #[serde(default)]
    pub noop: Option<ReportConfig>,
    #[serde(default)]
    pub missing_tool: Option<ReportConfig>,
}

impl OperationsConfig {
    pub fn common(&self, kind: OperationKind) -> Option<&CommonTypeConfig> {
        match kind {
            OperationKind::CreateIssue => self.create_issue.as_ref().map(|c| &c.common),
            OperationKind::AddComment => self.add_comment.as_ref().map(|c| &c.common),
            OperationKind::CreatePullRequest => {
                self.create_pull_request.as_ref().map(|c| &c.common)
            }
            OperationKind::UpdateIssue => self.update_issue.as_ref().map(|c| &c.common),
            OperationKind::CloseIssue => self.close_issue.as_ref().map(|c| &c.common),
            OperationKind::AddLabels => self.add_labels.as_ref().map(|c| &c.common),
            OperationKind::RemoveLabels => self.remove_labels.as_ref().map(|c| &c.common),
            OperationKind::LinkSubIssue => self.link_sub_issue.as_ref().map(|c| &c.common),
            OperationKind::AssignToAgent => self.assign_to_agent.as_ref().map(|c| &c.common),
            OperationKind::DispatchWorkflow => {
                self.dispatch_workflow.as_ref().map(|c| &c.common)
            }
            OperationKind::Noop => self.noop.as_ref().map(|c| &c.common),
            OperationKind::MissingTool => self.missing_tool.as_ref().map(|c| &c.common),
        }
    }

    /// Configured and not disabled with `max = 0`.
    pub fn is_enabled(&self, kind: OperationKind) -> bool {
        self.common(kind).is_some_and(|c| c.max > 0)
    }
}
