//! One batch, start to finish.
//!
//! ingest -> integrity -> validate -> sanitize -> authorize -> footer ->
//! resolve -> dispatch -> summary. Every stage only touches operations that
//! are still live; a failure at any stage is recorded on the operation and
//! never stops its siblings.

use crate::authorize::RepositoryAuthorizer;
use crate::config::{SafeOutputsConfig, integrity};
use crate::diagnostics::{DiagnosticEvent, DiagnosticSink, Stage};
use crate::dispatch::{Dispatcher, RetryPolicy};
use crate::error::{ConfigError, ErrorCode, OperationError, Result};
use crate::operation::{
    FieldRedaction, Operation, OperationPayload, OperationStatus, RichText, parse_records,
};
use crate::platform::PlatformClient;
use crate::resolve::{self, TemporaryIdMap};
use crate::sanitize::{SanitizePolicy, Sanitizer};
use crate::summary::BatchSummary;
use crate::validate::{normalize_labels, validate_batch};
use std::time::Instant;

pub struct Pipeline<'a> {
    config: &'a SafeOutputsConfig,
    client: &'a dyn PlatformClient,
    sink: &'a dyn DiagnosticSink,
    retry: Option<RetryPolicy>,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: &'a SafeOutputsConfig,
        client: &'a dyn PlatformClient,
        sink: &'a dyn DiagnosticSink,
    ) -> Self {
        Self {
            config,
            client,
            sink,
            retry: None,
        }
    }

    /// Override the configured retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Process one batch of raw records.
    ///
    /// `Err` is reserved for run-level configuration problems; everything
    /// that goes wrong with individual operations is in the summary.
    pub async fn run(&self, input: &str) -> Result<BatchSummary> {
        let started = Instant::now();
        let config = self.config;
        let ingest = parse_records(input);
        let mut ops = ingest.operations;

        let mut summary = BatchSummary::new(&config.repository, config.staged);
        summary.skipped_records = ingest.skipped;
        self.sink.record(&DiagnosticEvent::BatchStarted {
            operations: ops.len(),
            skipped: ingest.skipped,
            staged: config.staged,
        });

        match integrity::verify(config) {
            Ok(()) => {}
            Err(e @ ConfigError::IntegrityMismatch { .. }) => {
                tracing::error!("Configuration integrity check failed: {e}");
                summary.total = ops.len();
                summary.record_batch_error(OperationError::new(
                    ErrorCode::ConfigIntegrityMismatch,
                    e.to_string(),
                ));
                self.finish(&summary, started);
                return Ok(summary);
            }
            Err(e) => return Err(e.into()),
        }

        let map = TemporaryIdMap::from_seeds(&config.temporary_ids)?;
        let authorizer = RepositoryAuthorizer::new(config)?;
        let footer = render_footer(config)?;
        let mut reported = vec![false; ops.len()];

        validate_batch(&mut ops, config);
        self.report_rejections(&ops, &mut reported, Stage::Validate);

        let sanitizer = Sanitizer::new(SanitizePolicy::from_config(config));
        for op in &mut ops {
            self.sanitize_operation(&sanitizer, op);
            apply_type_defaults(config, op);
        }
        self.report_rejections(&ops, &mut reported, Stage::Sanitize);

        for op in &mut ops {
            authorizer.authorize(op);
            if op.is_live()
                && let (Some(footer), Some(payload)) = (footer.as_deref(), op.payload.as_mut())
            {
                payload.append_footer(footer);
            }
        }
        self.report_rejections(&ops, &mut reported, Stage::Authorize);

        let plan = resolve::plan(&mut ops, &map);
        for op in &mut ops {
            authorizer.authorize_references(op);
        }
        self.report_rejections(&ops, &mut reported, Stage::Resolve);
        self.sink.record(&DiagnosticEvent::PlanBuilt {
            chains: plan.chains.len(),
            operations: plan.len(),
        });

        let mut dispatcher = Dispatcher::new(config, &authorizer, self.client, self.sink);
        if let Some(retry) = self.retry {
            dispatcher = dispatcher.with_retry(retry);
        }
        let (ops, map, preview) = dispatcher.run(ops, &plan, map).await;

        summary.record_operations(&ops);
        summary.temporary_ids = map.snapshot();
        summary.preview = preview;
        self.finish(&summary, started);
        Ok(summary)
    }

    /// Sanitize every free-text field. Bodies are re-split into segments
    /// afterwards so in-body references survive as typed references.
    fn sanitize_operation(&self, sanitizer: &Sanitizer, op: &mut Operation) {
        if !op.is_live() {
            return;
        }
        let Some(payload) = op.payload.as_mut() else {
            return;
        };

        let mut failure = None;
        let mut redactions = Vec::new();
        for (field, text) in payload.text_fields_mut() {
            match sanitizer.sanitize(text) {
                Ok(clean) => {
                    *text = clean.text;
                    redactions.extend(clean.redactions.into_iter().map(|r| (field, r)));
                }
                Err(e) => {
                    failure.get_or_insert((field, e));
                }
            }
        }
        for (field, text) in payload.rich_texts_mut() {
            match sanitizer.sanitize(&text.source_text()) {
                Ok(clean) => {
                    *text = RichText::parse(&clean.text);
                    redactions.extend(clean.redactions.into_iter().map(|r| (field, r)));
                }
                Err(e) => {
                    failure.get_or_insert((field, e));
                }
            }
        }

        for (field, redaction) in redactions {
            self.sink.record(&DiagnosticEvent::Redacted {
                index: op.index,
                field: field.to_string(),
                kind: redaction.kind,
            });
            op.redactions.push(FieldRedaction {
                field: field.to_string(),
                redaction,
            });
        }
        if let Some((field, e)) = failure {
            op.reject(
                OperationError::new(ErrorCode::SanitizationUnrecoverable, e.to_string())
                    .field(field),
            );
            return;
        }
        op.advance(OperationStatus::Sanitized);
    }

    fn report_rejections(&self, ops: &[Operation], reported: &mut [bool], stage: Stage) {
        for (op, done) in ops.iter().zip(reported.iter_mut()) {
            if *done || op.is_live() {
                continue;
            }
            *done = true;
            if let Some(error) = &op.error {
                self.sink.record(&DiagnosticEvent::OperationRejected {
                    index: op.index,
                    kind: op.label(),
                    stage,
                    code: error.code,
                });
            }
        }
    }

    fn finish(&self, summary: &BatchSummary, started: Instant) {
        tracing::info!(
            run_id = summary.run_id.as_str(),
            total = summary.total,
            accepted = summary.accepted(),
            rejected = summary.rejected(),
            "Batch processed"
        );
        self.sink.record(&DiagnosticEvent::BatchFinished {
            accepted: summary.accepted(),
            rejected: summary.rejected(),
            duration: started.elapsed(),
        });
    }
}

/// Config-authored title prefix and default labels. Trusted, so applied
/// after sanitization.
fn apply_type_defaults(config: &SafeOutputsConfig, op: &mut Operation) {
    if !op.is_live() {
        return;
    }
    let (prefix, defaults, title, labels) = match op.payload.as_mut() {
        Some(OperationPayload::CreateIssue(p)) => {
            let Some(c) = config.operations.create_issue.as_ref() else {
                return;
            };
            (c.title_prefix.as_deref(), &c.labels, &mut p.title, &mut p.labels)
        }
        Some(OperationPayload::CreatePullRequest(p)) => {
            let Some(c) = config.operations.create_pull_request.as_ref() else {
                return;
            };
            (c.title_prefix.as_deref(), &c.labels, &mut p.title, &mut p.labels)
        }
        _ => return,
    };
    if let Some(prefix) = prefix.filter(|p| !p.is_empty())
        && !title.starts_with(prefix)
    {
        title.insert_str(0, prefix);
    }
    if !defaults.is_empty() {
        let mut merged = std::mem::take(labels);
        merged.extend(defaults.iter().cloned());
        *labels = normalize_labels(merged);
    }
}

/// Render footer and provenance once per batch.
fn render_footer(config: &SafeOutputsConfig) -> Result<Option<String>> {
    let mut context = tera::Context::new();
    context.insert("workflow_name", &config.workflow_name);
    context.insert("run_url", config.run_url.as_deref().unwrap_or_default());
    context.insert("repository", &config.repository);

    let mut parts = Vec::new();
    for (name, template) in [
        ("footer", &config.templates.footer),
        ("provenance", &config.templates.provenance),
    ] {
        let Some(template) = template.as_deref().filter(|t| !t.trim().is_empty()) else {
            continue;
        };
        let rendered = tera::Tera::one_off(template, &context, false)
            .map_err(|e| ConfigError::Validation(format!("templates.{name}: {e}")))?;
        parts.push(rendered);
    }
    if parts.is_empty() {
        return Ok(None);
    }
    Ok(Some(format!("\n\n{}", parts.join("\n\n"))))
}
