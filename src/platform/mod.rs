//! Platform client seam.
//!
//! Handlers speak in [`PlatformRequest`]s; a [`PlatformClient`] turns each
//! one into a single API call. Retries wrap individual requests, never a
//! whole handler.

pub mod github;

pub use github::GitHubClient;

use crate::authorize::RepoSlug;
use crate::error::PlatformError;
use crate::operation::{IssueState, ResourceRef, StateReason};
use serde::Serialize;
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

/// One platform API call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "request", rename_all = "snake_case")]
pub enum PlatformRequest {
    CreateIssue {
        repository: RepoSlug,
        title: String,
        body: String,
        labels: Vec<String>,
        assignees: Vec<String>,
    },
    CreateComment {
        repository: RepoSlug,
        number: u64,
        body: String,
    },
    CreatePullRequest {
        repository: RepoSlug,
        title: String,
        body: String,
        head: String,
        base: String,
        draft: bool,
    },
    UpdateIssue {
        repository: RepoSlug,
        number: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        body: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        state: Option<IssueState>,
        #[serde(skip_serializing_if = "Option::is_none")]
        state_reason: Option<StateReason>,
    },
    AddLabels {
        repository: RepoSlug,
        number: u64,
        labels: Vec<String>,
    },
    RemoveLabel {
        repository: RepoSlug,
        number: u64,
        label: String,
    },
    GetIssue {
        repository: RepoSlug,
        number: u64,
    },
    AddSubIssue {
        repository: RepoSlug,
        parent: u64,
        sub_issue_id: u64,
    },
    AddAssignees {
        repository: RepoSlug,
        number: u64,
        assignees: Vec<String>,
    },
    DispatchWorkflow {
        repository: RepoSlug,
        workflow: String,
        git_ref: String,
        inputs: BTreeMap<String, String>,
    },
}

impl PlatformRequest {
    /// Short name for logs and diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateIssue { .. } => "create_issue",
            Self::CreateComment { .. } => "create_comment",
            Self::CreatePullRequest { .. } => "create_pull_request",
            Self::UpdateIssue { .. } => "update_issue",
            Self::AddLabels { .. } => "add_labels",
            Self::RemoveLabel { .. } => "remove_label",
            Self::GetIssue { .. } => "get_issue",
            Self::AddSubIssue { .. } => "add_sub_issue",
            Self::AddAssignees { .. } => "add_assignees",
            Self::DispatchWorkflow { .. } => "dispatch_workflow",
        }
    }

    pub fn repository(&self) -> &RepoSlug {
        match self {
            Self::CreateIssue { repository, .. }
            | Self::CreateComment { repository, .. }
            | Self::CreatePullRequest { repository, .. }
            | Self::UpdateIssue { repository, .. }
            | Self::AddLabels { repository, .. }
            | Self::RemoveLabel { repository, .. }
            | Self::GetIssue { repository, .. }
            | Self::AddSubIssue { repository, .. }
            | Self::AddAssignees { repository, .. }
            | Self::DispatchWorkflow { repository, .. } => repository,
        }
    }
}

/// What a call produced. `resource` is set for calls that create or read an
/// issue-like resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlatformResponse {
    pub resource: Option<ResourceRef>,
}

impl PlatformResponse {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn resource(resource: ResourceRef) -> Self {
        Self {
            resource: Some(resource),
        }
    }
}

pub type PlatformFuture<'a> =
    Pin<Box<dyn Future<Output = Result<PlatformResponse, PlatformError>> + Send + 'a>>;

/// The privileged side of the gate. Implementations hold the write token.
pub trait PlatformClient: Send + Sync {
    fn send<'a>(&'a self, request: &'a PlatformRequest) -> PlatformFuture<'a>;

    fn name(&self) -> &str;
}
