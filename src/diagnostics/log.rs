use super::traits::{DiagnosticEvent, DiagnosticSink};
use tracing::{info, warn};

/// Emits every event through `tracing`.
pub struct LogSink;

impl LogSink {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagnosticSink for LogSink {
    fn record(&self, event: &DiagnosticEvent) {
        match event {
            DiagnosticEvent::BatchStarted {
                operations,
                skipped,
                staged,
            } => {
                info!(operations, skipped, staged, "diagnostics.batch_started");
            }
            DiagnosticEvent::OperationRejected {
                index,
                kind,
                stage,
                code,
            } => {
                warn!(index, kind = %kind, stage = %stage, code = %code, "diagnostics.operation_rejected");
            }
            DiagnosticEvent::Redacted { index, field, kind } => {
                info!(index, field = %field, kind = %kind, "diagnostics.redacted");
            }
            DiagnosticEvent::PlanBuilt { chains, operations } => {
                info!(chains, operations, "diagnostics.plan_built");
            }
            DiagnosticEvent::RequestRetried {
                index,
                request,
                attempt,
                delay,
            } => {
                warn!(
                    index,
                    request,
                    attempt,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "diagnostics.request_retried"
                );
            }
            DiagnosticEvent::OperationExecuted {
                index,
                kind,
                resource,
            } => {
                info!(index, kind = %kind, resource = resource.as_deref().unwrap_or("-"), "diagnostics.operation_executed");
            }
            DiagnosticEvent::OperationPreviewed { index, kind } => {
                info!(index, kind = %kind, "diagnostics.operation_previewed");
            }
            DiagnosticEvent::OperationFailed { index, kind, code } => {
                warn!(index, kind = %kind, code = %code, "diagnostics.operation_failed");
            }
            DiagnosticEvent::BatchFinished {
                accepted,
                rejected,
                duration,
            } => {
                info!(
                    accepted,
                    rejected,
                    duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
                    "diagnostics.batch_finished"
                );
            }
        }
    }

    fn name(&self) -> &str {
        "log"
    }
}
