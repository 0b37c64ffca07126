//! The batch summary: the single record of what a run did.

use crate::dispatch::StagedPreview;
use crate::error::OperationError;
use crate::operation::{Operation, OperationPayload, OperationStatus, ResourceRef};
use crate::sanitize::RedactionKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCounts {
    pub accepted: usize,
    pub rejected: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
    pub index: usize,
    pub kind: String,
    pub status: OperationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<ResourceRef>,
    /// Agent-authored report text (`noop`, `missing_tool`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedactionEntry {
    pub index: usize,
    pub field: String,
    pub kind: RedactionKind,
    pub span_len: usize,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub run_id: String,
    pub repository: String,
    pub staged: bool,
    /// Operations examined, excluding records skipped at ingest.
    pub total: usize,
    pub skipped_records: usize,
    pub per_type: BTreeMap<String, TypeCounts>,
    pub results: Vec<OperationResult>,
    pub redactions: Vec<RedactionEntry>,
    pub errors: Vec<OperationError>,
    pub temporary_ids: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<StagedPreview>,
}

impl BatchSummary {
    pub fn new(repository: impl Into<String>, staged: bool) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            repository: repository.into(),
            staged,
            total: 0,
            skipped_records: 0,
            per_type: BTreeMap::new(),
            results: Vec::new(),
            redactions: Vec::new(),
            errors: Vec::new(),
            temporary_ids: BTreeMap::new(),
            preview: None,
        }
    }

    /// Fold the final state of every operation into the summary.
    pub fn record_operations(&mut self, ops: &[Operation]) {
        self.total += ops.len();
        for op in ops {
            let counts = self.per_type.entry(op.label()).or_default();
            if is_accepted(op.status) {
                counts.accepted += 1;
            } else {
                counts.rejected += 1;
            }

            self.redactions
                .extend(op.redactions.iter().map(|r| RedactionEntry {
                    index: op.index,
                    field: r.field.clone(),
                    kind: r.redaction.kind,
                    span_len: r.redaction.span_len,
                    reason: r.redaction.reason.clone(),
                }));
            if let Some(error) = &op.error {
                self.errors.push(error.clone());
            }
            self.results.push(OperationResult {
                index: op.index,
                kind: op.label(),
                status: op.status,
                resource: op.result_ref.clone(),
                report: op.payload.as_ref().and_then(report_text),
            });
        }
    }

    /// A failure that applies to the whole batch.
    pub fn record_batch_error(&mut self, error: OperationError) {
        self.errors.push(error);
    }

    pub fn accepted(&self) -> usize {
        self.per_type.values().map(|c| c.accepted).sum()
    }

    pub fn rejected(&self) -> usize {
        self.per_type.values().map(|c| c.rejected).sum()
    }

    pub fn render_markdown(&self) -> String {
        let mut out = String::from("## Safe Outputs\n\n");
        let _ = writeln!(
            out,
            "Examined {} operation(s) for `{}`: {} accepted, {} rejected.",
            self.total,
            self.repository,
            self.accepted(),
            self.rejected()
        );
        if self.skipped_records > 0 {
            let _ = writeln!(out, "Skipped {} malformed record(s).", self.skipped_records);
        }

        if !self.per_type.is_empty() {
            out.push_str("\n| Type | Accepted | Rejected |\n|---|---|---|\n");
            for (kind, counts) in &self.per_type {
                let _ = writeln!(out, "| `{kind}` | {} | {} |", counts.accepted, counts.rejected);
            }
        }

        let created: Vec<&OperationResult> = self
            .results
            .iter()
            .filter(|r| r.status == OperationStatus::Executed && r.resource.is_some())
            .collect();
        if !created.is_empty() {
            out.push_str("\n### Results\n\n");
            for result in created {
                let Some(resource) = &result.resource else {
                    continue;
                };
                match &resource.url {
                    Some(url) => {
                        let _ = writeln!(out, "- `{}`: [{resource}]({url})", result.kind);
                    }
                    None => {
                        let _ = writeln!(out, "- `{}`: {resource}", result.kind);
                    }
                }
            }
        }

        let reports: Vec<&OperationResult> =
            self.results.iter().filter(|r| r.report.is_some()).collect();
        if !reports.is_empty() {
            out.push_str("\n### Agent reports\n\n");
            for result in reports {
                let _ = writeln!(
                    out,
                    "- `{}`: {}",
                    result.kind,
                    result.report.as_deref().unwrap_or_default()
                );
            }
        }

        if !self.errors.is_empty() {
            out.push_str("\n### Errors\n\n");
            for error in &self.errors {
                let position = error
                    .index
                    .map_or_else(|| "batch".to_string(), |i| format!("#{i}"));
                let field = error
                    .field
                    .as_deref()
                    .map(|f| format!(" (`{f}`)"))
                    .unwrap_or_default();
                let _ = writeln!(
                    out,
                    "- {position}{field} `{}`: {}",
                    error.code, error.message
                );
            }
        }

        if !self.redactions.is_empty() {
            let _ = writeln!(
                out,
                "\n{} span(s) were redacted during sanitization.",
                self.redactions.len()
            );
        }

        if let Some(preview) = &self.preview {
            out.push('\n');
            out.push_str(&preview.render_markdown());
        }
        out
    }
}

fn is_accepted(status: OperationStatus) -> bool {
    matches!(
        status,
        OperationStatus::Executed | OperationStatus::Previewed
    )
}

fn report_text(payload: &OperationPayload) -> Option<String> {
    match payload {
        OperationPayload::Noop(p) => Some(p.message.clone()),
        OperationPayload::MissingTool(p) => {
            let mut text = format!("{}: {}", p.tool, p.reason);
            if let Some(alternatives) = &p.alternatives {
                let _ = write!(text, " (alternatives: {alternatives})");
            }
            Some(text)
        }
        _ => None,
    }
}
