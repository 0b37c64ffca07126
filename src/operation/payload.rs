use super::{IssueRef, OperationKind, RichText, TemporaryId};
use crate::authorize::RepoSlug;
use crate::resolve::TemporaryIdMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IssueState {
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StateReason {
    #[default]
    Completed,
    NotPlanned,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateIssue {
    pub title: String,
    pub body: RichText,
    pub labels: Vec<String>,
    pub assignees: Vec<String>,
    pub parent: Option<IssueRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddComment {
    pub issue: IssueRef,
    pub body: RichText,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePullRequest {
    pub title: String,
    pub body: RichText,
    pub head: String,
    pub base: String,
    pub draft: bool,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateIssue {
    pub issue: IssueRef,
    pub title: Option<String>,
    pub body: Option<RichText>,
    pub state: Option<IssueState>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseIssue {
    pub issue: IssueRef,
    pub comment: Option<RichText>,
    pub state_reason: StateReason,
}

/// Shared by `add_labels` and `remove_labels`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelChange {
    pub issue: IssueRef,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSubIssue {
    pub parent: IssueRef,
    pub child: IssueRef,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignToAgent {
    pub issue: IssueRef,
    pub agent: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchWorkflow {
    pub workflow: String,
    pub inputs: BTreeMap<String, String>,
    pub git_ref: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Noop {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingTool {
    pub tool: String,
    pub reason: String,
    pub alternatives: Option<String>,
}

/// Validated, typed content of one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationPayload {
    CreateIssue(CreateIssue),
    AddComment(AddComment),
    CreatePullRequest(CreatePullRequest),
    UpdateIssue(UpdateIssue),
    CloseIssue(CloseIssue),
    AddLabels(LabelChange),
    RemoveLabels(LabelChange),
    LinkSubIssue(LinkSubIssue),
    AssignToAgent(AssignToAgent),
    DispatchWorkflow(DispatchWorkflow),
    Noop(Noop),
    MissingTool(MissingTool),
}

impl OperationPayload {
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::CreateIssue(_) => OperationKind::CreateIssue,
            Self::AddComment(_) => OperationKind::AddComment,
            Self::CreatePullRequest(_) => OperationKind::CreatePullRequest,
            Self::UpdateIssue(_) => OperationKind::UpdateIssue,
            Self::CloseIssue(_) => OperationKind::CloseIssue,
            Self::AddLabels(_) => OperationKind::AddLabels,
            Self::RemoveLabels(_) => OperationKind::RemoveLabels,
            Self::LinkSubIssue(_) => OperationKind::LinkSubIssue,
            Self::AssignToAgent(_) => OperationKind::AssignToAgent,
            Self::DispatchWorkflow(_) => OperationKind::DispatchWorkflow,
            Self::Noop(_) => OperationKind::Noop,
            Self::MissingTool(_) => OperationKind::MissingTool,
        }
    }

    /// Plain free-text fields, named as they were submitted.
    pub fn text_fields_mut(&mut self) -> Vec<(&'static str, &mut String)> {
        let mut fields: Vec<(&'static str, &mut String)> = Vec::new();
        match self {
            Self::CreateIssue(p) => {
                fields.push(("title", &mut p.title));
                fields.extend(p.labels.iter_mut().map(|l| ("labels", l)));
            }
            Self::CreatePullRequest(p) => {
                fields.push(("title", &mut p.title));
                fields.extend(p.labels.iter_mut().map(|l| ("labels", l)));
            }
            Self::UpdateIssue(p) => {
                if let Some(title) = p.title.as_mut() {
                    fields.push(("title", title));
                }
            }
            Self::AddLabels(p) | Self::RemoveLabels(p) => {
                fields.extend(p.labels.iter_mut().map(|l| ("labels", l)));
            }
            Self::DispatchWorkflow(p) => {
                fields.extend(p.inputs.values_mut().map(|v| ("inputs", v)));
            }
            Self::Noop(p) => fields.push(("message", &mut p.message)),
            Self::MissingTool(p) => {
                fields.push(("tool", &mut p.tool));
                fields.push(("reason", &mut p.reason));
                if let Some(alternatives) = p.alternatives.as_mut() {
                    fields.push(("alternatives", alternatives));
                }
            }
            Self::AddComment(_)
            | Self::CloseIssue(_)
            | Self::LinkSubIssue(_)
            | Self::AssignToAgent(_) => {}
        }
        fields
    }

    /// Markdown bodies, which may carry in-body references.
    pub fn rich_texts_mut(&mut self) -> Vec<(&'static str, &mut RichText)> {
        match self {
            Self::CreateIssue(p) => vec![("body", &mut p.body)],
            Self::AddComment(p) => vec![("body", &mut p.body)],
            Self::CreatePullRequest(p) => vec![("body", &mut p.body)],
            Self::UpdateIssue(p) => p.body.as_mut().map(|b| ("body", b)).into_iter().collect(),
            Self::CloseIssue(p) => p
                .comment
                .as_mut()
                .map(|b| ("body", b))
                .into_iter()
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Issue references held in dedicated fields.
    pub fn issue_refs_mut(&mut self) -> Vec<(&'static str, &mut IssueRef)> {
        match self {
            Self::CreateIssue(p) => p
                .parent
                .as_mut()
                .map(|r| ("parent", r))
                .into_iter()
                .collect(),
            Self::AddComment(p) => vec![("issue_number", &mut p.issue)],
            Self::UpdateIssue(p) => vec![("issue_number", &mut p.issue)],
            Self::CloseIssue(p) => vec![("issue_number", &mut p.issue)],
            Self::AddLabels(p) | Self::RemoveLabels(p) => vec![("issue_number", &mut p.issue)],
            Self::LinkSubIssue(p) => vec![
                ("parent_issue_number", &mut p.parent),
                ("sub_issue_number", &mut p.child),
            ],
            Self::AssignToAgent(p) => vec![("issue_number", &mut p.issue)],
            Self::CreatePullRequest(_)
            | Self::DispatchWorkflow(_)
            | Self::Noop(_)
            | Self::MissingTool(_) => Vec::new(),
        }
    }

    /// Every temporary id this payload depends on, in fields or bodies.
    pub fn referenced_ids(&mut self) -> BTreeSet<TemporaryId> {
        let mut ids: BTreeSet<TemporaryId> = self
            .issue_refs_mut()
            .into_iter()
            .filter_map(|(_, r)| r.temporary_id().cloned())
            .collect();
        for (_, text) in self.rich_texts_mut() {
            ids.extend(text.referenced_ids());
        }
        ids
    }

    /// Bind literal numbers to `repository` and swap in every placeholder
    /// `map` can resolve. `false` while any placeholder remains.
    pub fn substitute(&mut self, repository: &RepoSlug, map: &TemporaryIdMap) -> bool {
        let mut complete = true;
        for (_, reference) in self.issue_refs_mut() {
            reference.bind_repository(repository);
            complete &= reference.substitute(map);
        }
        for (_, text) in self.rich_texts_mut() {
            complete &= text.substitute(map);
        }
        complete
    }

    /// Append trusted, config-authored text to the primary body.
    pub fn append_footer(&mut self, footer: &str) {
        let body = match self {
            Self::CreateIssue(p) => &mut p.body,
            Self::AddComment(p) => &mut p.body,
            Self::CreatePullRequest(p) => &mut p.body,
            _ => return,
        };
        body.push_literal(footer);
    }
}
