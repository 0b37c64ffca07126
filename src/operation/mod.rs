//! Proposed operations and their typed representation.
//!
//! A raw record enters as a type tag plus an untyped field map. Schema
//! validation turns the map into an [`OperationPayload`]; from then on no
//! stage looks at the raw map again.

mod ingest;
mod payload;
mod reference;
mod rich_text;
mod temporary_id;

pub use ingest::{IngestResult, parse_records};
pub use payload::{
    AddComment, AssignToAgent, CloseIssue, CreateIssue, CreatePullRequest, DispatchWorkflow,
    IssueState, LabelChange, LinkSubIssue, MissingTool, Noop, OperationPayload, StateReason,
    UpdateIssue,
};
pub use reference::{IssueRef, ResourceRef};
pub use rich_text::{RichText, Segment};
pub use temporary_id::TemporaryId;

use crate::authorize::RepoSlug;
use crate::error::OperationError;
use crate::sanitize::Redaction;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Closed set of operation types the gate knows how to handle.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OperationKind {
    CreateIssue,
    AddComment,
    CreatePullRequest,
    UpdateIssue,
    CloseIssue,
    AddLabels,
    RemoveLabels,
    LinkSubIssue,
    AssignToAgent,
    DispatchWorkflow,
    Noop,
    MissingTool,
}

impl OperationKind {
    pub const ALL: [Self; 12] = [
        Self::CreateIssue,
        Self::AddComment,
        Self::CreatePullRequest,
        Self::UpdateIssue,
        Self::CloseIssue,
        Self::AddLabels,
        Self::RemoveLabels,
        Self::LinkSubIssue,
        Self::AssignToAgent,
        Self::DispatchWorkflow,
        Self::Noop,
        Self::MissingTool,
    ];

    /// Accepts `create-issue` as well as `create_issue`.
    pub fn parse_tag(tag: &str) -> Option<Self> {
        tag.trim()
            .to_ascii_lowercase()
            .replace('-', "_")
            .parse()
            .ok()
    }

    /// Kinds that create a resource and may therefore declare a temporary id.
    pub fn creates_resource(self) -> bool {
        matches!(self, Self::CreateIssue | Self::CreatePullRequest)
    }

    /// Kinds that reach the platform API at all.
    pub fn calls_platform(self) -> bool {
        !matches!(self, Self::Noop | Self::MissingTool)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OperationStatus {
    Pending,
    Validated,
    Sanitized,
    Authorized,
    Resolved,
    Executed,
    Previewed,
    Rejected,
    Failed,
    Blocked,
}

impl OperationStatus {
    /// Terminal states that never reach the platform.
    pub fn is_terminal_failure(self) -> bool {
        matches!(self, Self::Rejected | Self::Failed | Self::Blocked)
    }
}

/// A redaction tagged with the field it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRedaction {
    pub field: String,
    #[serde(flatten)]
    pub redaction: Redaction,
}

/// One proposed action, carried through every stage of the gate.
#[derive(Debug, Clone)]
pub struct Operation {
    /// Position in the batch; stable across stages.
    pub index: usize,
    /// Tag exactly as submitted.
    pub type_tag: String,
    pub kind: Option<OperationKind>,
    /// Untyped fields as submitted. Emptied once validation succeeds.
    pub raw_fields: Map<String, Value>,
    pub payload: Option<OperationPayload>,
    /// `repo` as submitted, before slug parsing.
    pub requested_repository: Option<String>,
    pub target_repository: Option<RepoSlug>,
    pub temporary_id: Option<TemporaryId>,
    pub referenced_ids: BTreeSet<TemporaryId>,
    pub status: OperationStatus,
    pub result_ref: Option<ResourceRef>,
    pub error: Option<OperationError>,
    pub redactions: Vec<FieldRedaction>,
}

impl Operation {
    pub fn new(index: usize, type_tag: impl Into<String>, raw_fields: Map<String, Value>) -> Self {
        let type_tag = type_tag.into();
        Self {
            index,
            kind: OperationKind::parse_tag(&type_tag),
            type_tag,
            raw_fields,
            payload: None,
            requested_repository: None,
            target_repository: None,
            temporary_id: None,
            referenced_ids: BTreeSet::new(),
            status: OperationStatus::Pending,
            result_ref: None,
            error: None,
            redactions: Vec::new(),
        }
    }

    /// Still eligible for later stages.
    pub fn is_live(&self) -> bool {
        !self.status.is_terminal_failure()
    }

    pub fn advance(&mut self, status: OperationStatus) {
        if self.is_live() {
            self.status = status;
        }
    }

    pub fn reject(&mut self, error: OperationError) {
        self.fail_with(OperationStatus::Rejected, error);
    }

    pub fn block(&mut self, error: OperationError) {
        self.fail_with(OperationStatus::Blocked, error);
    }

    pub fn fail(&mut self, error: OperationError) {
        self.fail_with(OperationStatus::Failed, error);
    }

    fn fail_with(&mut self, status: OperationStatus, error: OperationError) {
        if !self.is_live() {
            return;
        }
        self.status = status;
        self.error = Some(error.at(self.index));
    }

    /// Human label for logs and summaries: the parsed kind or the raw tag.
    pub fn label(&self) -> String {
        self.kind
            .map_or_else(|| self.type_tag.clone(), |kind| kind.to_string())
    }
}
