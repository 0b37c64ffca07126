use crate::authorize::RepoSlug;
use crate::operation::{OperationKind, OperationPayload};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt::Write;

const PREVIEW_BODY_CHARS: usize = 500;

/// What a live run would have sent for one operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewRecord {
    pub index: usize,
    pub kind: OperationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<RepoSlug>,
    pub payload: Value,
}

impl PreviewRecord {
    pub fn new(index: usize, payload: &OperationPayload, repository: Option<&RepoSlug>) -> Self {
        Self {
            index,
            kind: payload.kind(),
            repository: repository.cloned(),
            payload: render_payload(payload, repository),
        }
    }
}

/// Result of a staged run. Nothing was sent to the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagedPreview {
    pub no_resources_created: bool,
    pub items: Vec<PreviewRecord>,
}

impl StagedPreview {
    pub fn new(mut items: Vec<PreviewRecord>) -> Self {
        items.sort_by_key(|item| item.index);
        Self {
            no_resources_created: true,
            items,
        }
    }

    pub fn render_markdown(&self) -> String {
        let mut out = String::from("## Staged Mode: Preview\n\n");
        out.push_str("No resources were created. A live run would perform:\n");
        if self.items.is_empty() {
            out.push_str("\n_Nothing._\n");
            return out;
        }
        for item in &self.items {
            let _ = write!(out, "\n### {}. `{}`", item.index + 1, item.kind);
            if let Some(repo) = &item.repository {
                let _ = write!(out, " in `{repo}`");
            }
            out.push('\n');
            if let Value::Object(fields) = &item.payload {
                for (name, value) in fields {
                    let text = match value {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    let _ = writeln!(out, "- **{name}**: {}", shorten(&text));
                }
            }
        }
        out
    }
}

fn shorten(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(PREVIEW_BODY_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

fn render_payload(payload: &OperationPayload, repository: Option<&RepoSlug>) -> Value {
    let render = |text: &crate::operation::RichText| match repository {
        Some(repo) => text.render(repo),
        None => text.source_text(),
    };
    match payload {
        OperationPayload::CreateIssue(p) => json!({
            "title": p.title,
            "body": render(&p.body),
            "labels": p.labels,
            "assignees": p.assignees,
            "parent": p.parent.as_ref().map(ToString::to_string),
        }),
        OperationPayload::AddComment(p) => json!({
            "issue": p.issue.to_string(),
            "body": render(&p.body),
        }),
        OperationPayload::CreatePullRequest(p) => json!({
            "title": p.title,
            "body": render(&p.body),
            "head": p.head,
            "base": p.base,
            "draft": p.draft,
            "labels": p.labels,
        }),
        OperationPayload::UpdateIssue(p) => json!({
            "issue": p.issue.to_string(),
            "title": p.title,
            "body": p.body.as_ref().map(render),
            "state": p.state,
        }),
        OperationPayload::CloseIssue(p) => json!({
            "issue": p.issue.to_string(),
            "comment": p.comment.as_ref().map(render),
            "state_reason": p.state_reason,
        }),
        OperationPayload::AddLabels(p) | OperationPayload::RemoveLabels(p) => json!({
            "issue": p.issue.to_string(),
            "labels": p.labels,
        }),
        OperationPayload::LinkSubIssue(p) => json!({
            "parent": p.parent.to_string(),
            "sub_issue": p.child.to_string(),
        }),
        OperationPayload::AssignToAgent(p) => json!({
            "issue": p.issue.to_string(),
            "agent": p.agent,
        }),
        OperationPayload::DispatchWorkflow(p) => json!({
            "workflow": p.workflow,
            "ref": p.git_ref,
            "inputs": p.inputs,
        }),
        OperationPayload::Noop(p) => json!({ "message": p.message }),
        OperationPayload::MissingTool(p) => json!({
            "tool": p.tool,
            "reason": p.reason,
            "alternatives": p.alternatives,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::{IssueRef, LinkSubIssue, Noop, TemporaryId};

    #[test]
    fn link_preview_keeps_placeholders_visible() {
        let payload = OperationPayload::LinkSubIssue(LinkSubIssue {
            parent: IssueRef::Unresolved(TemporaryId::parse("aw_abc123").unwrap()),
            child: IssueRef::Number(42),
        });
        let repo = RepoSlug::parse("octo/app").unwrap();
        let record = PreviewRecord::new(1, &payload, Some(&repo));
        assert_eq!(record.kind, OperationKind::LinkSubIssue);
        assert_eq!(record.payload["parent"], "#aw_abc123");
        assert_eq!(record.payload["sub_issue"], "#42");
    }

    #[test]
    fn preview_is_marked_and_ordered() {
        let noop = |m: &str| OperationPayload::Noop(Noop { message: m.into() });
        let preview = StagedPreview::new(vec![
            PreviewRecord::new(3, &noop("second"), None),
            PreviewRecord::new(0, &noop("first"), None),
        ]);
        assert!(preview.no_resources_created);
        assert_eq!(preview.items[0].index, 0);

        let markdown = preview.render_markdown();
        assert!(markdown.contains("No resources were created"));
        assert!(markdown.contains("### 1. `noop`"));
        assert!(markdown.contains("- **message**: first"));
    }

    #[test]
    fn empty_preview_says_so() {
        let markdown = StagedPreview::new(Vec::new()).render_markdown();
        assert!(markdown.contains("_Nothing._"));
    }
}
