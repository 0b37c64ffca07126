//! Schema validation into typed payloads, then per-type limits.
//!
//! A type that was never offered (no config entry, or `max = 0`) is
//! rejected as an unknown operation before its fields are looked at.

mod fields;
mod limits;

pub(crate) use fields::normalize_labels;
pub use limits::enforce_limits;

use crate::config::SafeOutputsConfig;
use crate::error::{ErrorCode, OperationError, echo_value};
use crate::operation::{
    AddComment, AssignToAgent, CloseIssue, CreateIssue, CreatePullRequest, DispatchWorkflow,
    IssueRef, IssueState, LabelChange, LinkSubIssue, MissingTool, Noop, Operation, OperationKind,
    OperationPayload, OperationStatus, RichText, StateReason, TemporaryId, UpdateIssue,
};
use fields::{
    FieldReader, MAX_BODY_CHARS, MAX_MESSAGE_CHARS, MAX_NAME_CHARS, MAX_TITLE_CHARS,
    is_branch_name, is_login, schema_error,
};

const ISSUE_NUMBER: &str = "issue_number";
const ISSUE_NUMBER_ALIASES: &[&str] = &["issue", "item_number"];
const REPO_ALIASES: &[&str] = &["repository", "target_repository", "targetRepository"];

/// Fields every platform-facing operation may carry besides its payload.
struct Parsed {
    payload: OperationPayload,
    temporary_id: Option<TemporaryId>,
    repository: Option<String>,
}

pub struct SchemaValidator<'a> {
    config: &'a SafeOutputsConfig,
}

impl<'a> SchemaValidator<'a> {
    pub fn new(config: &'a SafeOutputsConfig) -> Self {
        Self { config }
    }

    /// Validate one operation in place. Independent of every other
    /// operation in the batch.
    pub fn validate(&self, op: &mut Operation) {
        if !op.is_live() {
            return;
        }
        let Some(kind) = op.kind else {
            op.reject(OperationError::new(
                ErrorCode::UnknownOperation,
                format!("unknown operation type '{}'", echo_value(&op.type_tag)),
            ));
            return;
        };
        if !self.config.operations.is_enabled(kind) {
            op.reject(OperationError::new(
                ErrorCode::UnknownOperation,
                format!("operation type '{kind}' is not enabled for this workflow"),
            ));
            return;
        }

        let reader = FieldReader::new(std::mem::take(&mut op.raw_fields));
        match self.parse(kind, reader) {
            Ok(parsed) => {
                op.payload = Some(parsed.payload);
                op.temporary_id = parsed.temporary_id;
                op.requested_repository = parsed.repository;
                op.advance(OperationStatus::Validated);
            }
            Err(err) => {
                tracing::debug!(index = op.index, %kind, field = ?err.field, "schema rejected");
                op.reject(err);
            }
        }
    }

    fn parse(&self, kind: OperationKind, mut r: FieldReader) -> Result<Parsed, OperationError> {
        let temporary_id = if kind.creates_resource() {
            r.temporary_id()?
        } else {
            None
        };
        let repository = if kind.calls_platform() {
            r.optional_string("repo", REPO_ALIASES, MAX_NAME_CHARS)?
        } else {
            None
        };

        let payload = match kind {
            OperationKind::CreateIssue => self.create_issue(&mut r)?,
            OperationKind::AddComment => OperationPayload::AddComment(AddComment {
                issue: self.issue_ref(&mut r)?,
                body: body(&mut r, true)?.unwrap_or_default(),
            }),
            OperationKind::CreatePullRequest => self.create_pull_request(&mut r)?,
            OperationKind::UpdateIssue => self.update_issue(&mut r)?,
            OperationKind::CloseIssue => OperationPayload::CloseIssue(CloseIssue {
                issue: self.issue_ref(&mut r)?,
                comment: r
                    .optional_string("body", &["comment"], MAX_BODY_CHARS)?
                    .filter(|s| !s.trim().is_empty())
                    .map(RichText::literal),
                state_reason: state_reason(&mut r)?,
            }),
            OperationKind::AddLabels => OperationPayload::AddLabels(self.label_change(kind, &mut r)?),
            OperationKind::RemoveLabels => {
                OperationPayload::RemoveLabels(self.label_change(kind, &mut r)?)
            }
            OperationKind::LinkSubIssue => OperationPayload::LinkSubIssue(LinkSubIssue {
                parent: r.required_ref(
                    "parent_issue_number",
                    &["parent_issue", "parent", "parent_ref", "parentRef"],
                )?,
                child: r.required_ref(
                    "sub_issue_number",
                    &["sub_issue", "child", "child_ref", "childRef"],
                )?,
            }),
            OperationKind::AssignToAgent => self.assign_to_agent(&mut r)?,
            OperationKind::DispatchWorkflow => self.dispatch_workflow(&mut r)?,
            OperationKind::Noop => OperationPayload::Noop(Noop {
                message: r.required_string("message", &[], MAX_MESSAGE_CHARS)?,
            }),
            OperationKind::MissingTool => OperationPayload::MissingTool(MissingTool {
                tool: r.required_string("tool", &[], MAX_NAME_CHARS)?,
                reason: r.required_string("reason", &[], MAX_MESSAGE_CHARS)?,
                alternatives: alternatives(&mut r)?,
            }),
        };
        r.finish()?;

        Ok(Parsed {
            payload,
            temporary_id,
            repository,
        })
    }

    fn issue_ref(&self, r: &mut FieldReader) -> Result<IssueRef, OperationError> {
        r.ref_or_context(ISSUE_NUMBER, ISSUE_NUMBER_ALIASES, self.config.context.issue_number)
    }

    fn create_issue(&self, r: &mut FieldReader) -> Result<OperationPayload, OperationError> {
        let title = r.required_string("title", &[], MAX_TITLE_CHARS)?;
        let body = body(r, true)?.unwrap_or_default();
        let labels = normalize_labels(r.string_list("labels")?);
        let assignees = r.string_list("assignees")?;
        if let Some(bad) = assignees.iter().find(|a| !is_login(a)) {
            return Err(schema_error(
                "assignees",
                format!("'{}' is not a valid login", echo_value(bad)),
            ));
        }
        let parent = r.optional_ref("parent", &["parent_issue", "parent_issue_number"])?;
        Ok(OperationPayload::CreateIssue(CreateIssue {
            title,
            body,
            labels,
            assignees,
            parent,
        }))
    }

    fn create_pull_request(&self, r: &mut FieldReader) -> Result<OperationPayload, OperationError> {
        let defaults = self.config.operations.create_pull_request.clone().unwrap_or_default();
        let title = r.required_string("title", &[], MAX_TITLE_CHARS)?;
        let body = body(r, true)?.unwrap_or_default();
        let head = r.required_string("head", &["branch"], MAX_NAME_CHARS)?;
        if !is_branch_name(&head) {
            return Err(schema_error("head", format!("'{}' is not a valid branch name", echo_value(&head))));
        }
        let base = r
            .optional_string("base", &[], MAX_NAME_CHARS)?
            .unwrap_or(defaults.default_base);
        if !is_branch_name(&base) {
            return Err(schema_error("base", format!("'{}' is not a valid branch name", echo_value(&base))));
        }
        let draft = r.optional_bool("draft")?.unwrap_or(defaults.draft);
        let labels = normalize_labels(r.string_list("labels")?);
        Ok(OperationPayload::CreatePullRequest(CreatePullRequest {
            title,
            body,
            head,
            base,
            draft,
            labels,
        }))
    }

    fn update_issue(&self, r: &mut FieldReader) -> Result<OperationPayload, OperationError> {
        let permissions = self.config.operations.update_issue.clone().unwrap_or_default();
        let issue = self.issue_ref(r)?;
        let title = r.optional_string("title", &[], MAX_TITLE_CHARS)?;
        let body = body(r, false)?;
        let state = r
            .optional_string("state", &[], MAX_NAME_CHARS)?
            .map(|raw| {
                raw.trim().to_ascii_lowercase().parse::<IssueState>().map_err(|_| {
                    schema_error("state", format!("state must be open or closed, got '{}'", echo_value(&raw)))
                })
            })
            .transpose()?;

        for (field, present, allowed) in [
            ("title", title.is_some(), permissions.allow_title),
            ("body", body.is_some(), permissions.allow_body),
            ("state", state.is_some(), permissions.allow_state),
        ] {
            if present && !allowed {
                return Err(schema_error(field, format!("updating {field} is not permitted")));
            }
        }
        if title.is_none() && body.is_none() && state.is_none() {
            return Err(schema_error("title", "update needs at least one of title, body or state"));
        }
        Ok(OperationPayload::UpdateIssue(UpdateIssue {
            issue,
            title,
            body,
            state,
        }))
    }

    fn label_change(&self, kind: OperationKind, r: &mut FieldReader) -> Result<LabelChange, OperationError> {
        let config = match kind {
            OperationKind::AddLabels => self.config.operations.add_labels.as_ref(),
            _ => self.config.operations.remove_labels.as_ref(),
        };
        let issue = self.issue_ref(r)?;
        let mut labels = normalize_labels(r.string_list("labels")?);
        if labels.is_empty() {
            return Err(schema_error("labels", "labels is required"));
        }
        if let Some(allowed) = config.and_then(|c| c.allowed_labels.as_ref()) {
            let before = labels.len();
            labels.retain(|l| allowed.iter().any(|a| a.eq_ignore_ascii_case(l)));
            if labels.len() < before {
                tracing::warn!(%kind, dropped = before - labels.len(), "labels outside allowlist dropped");
            }
            if labels.is_empty() {
                return Err(schema_error("labels", "none of the labels are permitted"));
            }
        }
        Ok(LabelChange { issue, labels })
    }

    fn assign_to_agent(&self, r: &mut FieldReader) -> Result<OperationPayload, OperationError> {
        let config = self.config.operations.assign_to_agent.clone().unwrap_or_default();
        let issue = self.issue_ref(r)?;
        let agent = r
            .optional_string("agent", &[], MAX_NAME_CHARS)?
            .map(|a| a.trim().to_string())
            .unwrap_or_else(|| config.default_agent.clone());
        if !config.permits(&agent) {
            return Err(schema_error(
                "agent",
                format!("agent '{}' is not permitted", echo_value(&agent)),
            ));
        }
        Ok(OperationPayload::AssignToAgent(AssignToAgent { issue, agent }))
    }

    fn dispatch_workflow(&self, r: &mut FieldReader) -> Result<OperationPayload, OperationError> {
        let config = self.config.operations.dispatch_workflow.clone().unwrap_or_default();
        let raw = r.required_string("workflow", &["workflow_name"], MAX_NAME_CHARS)?;
        let workflow = raw
            .trim()
            .trim_end_matches(".yml")
            .trim_end_matches(".yaml")
            .to_string();
        if !config.allowed_workflows.iter().any(|w| *w == workflow) {
            return Err(schema_error(
                "workflow",
                format!("workflow '{}' is not permitted", echo_value(&workflow)),
            ));
        }
        let inputs = r.string_map("inputs")?;
        let git_ref = r
            .optional_string("ref", &["git_ref"], MAX_NAME_CHARS)?
            .unwrap_or(config.default_ref);
        if !is_branch_name(&git_ref) {
            return Err(schema_error("ref", format!("'{}' is not a valid ref", echo_value(&git_ref))));
        }
        Ok(OperationPayload::DispatchWorkflow(DispatchWorkflow {
            workflow,
            inputs,
            git_ref,
        }))
    }
}

fn body(r: &mut FieldReader, required: bool) -> Result<Option<RichText>, OperationError> {
    let text = if required {
        Some(r.required_string("body", &[], MAX_BODY_CHARS)?)
    } else {
        r.optional_string("body", &[], MAX_BODY_CHARS)?
    };
    Ok(text.map(RichText::literal))
}

fn state_reason(r: &mut FieldReader) -> Result<StateReason, OperationError> {
    match r.optional_string("state_reason", &["reason"], MAX_NAME_CHARS)? {
        None => Ok(StateReason::default()),
        Some(raw) => raw
            .trim()
            .to_ascii_lowercase()
            .replace('-', "_")
            .parse()
            .map_err(|_| {
                schema_error(
                    "state_reason",
                    format!("state_reason must be completed or not_planned, got '{}'", echo_value(&raw)),
                )
            }),
    }
}

/// `alternatives` may be a string or a list of strings.
fn alternatives(r: &mut FieldReader) -> Result<Option<String>, OperationError> {
    let list = r.string_list("alternatives")?;
    let joined = list
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ");
    if joined.chars().count() > MAX_MESSAGE_CHARS {
        return Err(schema_error("alternatives", "alternatives is too long"));
    }
    Ok((!joined.is_empty()).then_some(joined))
}

/// Schema-check every operation, then apply per-type limits.
pub fn validate_batch(ops: &mut [Operation], config: &SafeOutputsConfig) {
    let validator = SchemaValidator::new(config);
    for op in ops.iter_mut() {
        validator.validate(op);
    }
    enforce_limits(ops, &config.operations);
}
