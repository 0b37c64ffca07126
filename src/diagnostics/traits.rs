use crate::error::ErrorCode;
use crate::operation::OperationKind;
use crate::sanitize::RedactionKind;
use std::time::Duration;

/// Pipeline stage an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
    Ingest,
    Integrity,
    Validate,
    Sanitize,
    Authorize,
    Resolve,
    Dispatch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticEvent {
    BatchStarted {
        operations: usize,
        skipped: usize,
        staged: bool,
    },
    OperationRejected {
        index: usize,
        kind: String,
        stage: Stage,
        code: ErrorCode,
    },
    Redacted {
        index: usize,
        field: String,
        kind: RedactionKind,
    },
    PlanBuilt {
        chains: usize,
        operations: usize,
    },
    RequestRetried {
        index: usize,
        request: &'static str,
        attempt: u32,
        delay: Duration,
    },
    OperationExecuted {
        index: usize,
        kind: OperationKind,
        resource: Option<String>,
    },
    OperationPreviewed {
        index: usize,
        kind: OperationKind,
    },
    OperationFailed {
        index: usize,
        kind: String,
        code: ErrorCode,
    },
    BatchFinished {
        accepted: usize,
        rejected: usize,
        duration: Duration,
    },
}

impl DiagnosticEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::BatchStarted { .. } => "batch_started",
            Self::OperationRejected { .. } => "operation_rejected",
            Self::Redacted { .. } => "redacted",
            Self::PlanBuilt { .. } => "plan_built",
            Self::RequestRetried { .. } => "request_retried",
            Self::OperationExecuted { .. } => "operation_executed",
            Self::OperationPreviewed { .. } => "operation_previewed",
            Self::OperationFailed { .. } => "operation_failed",
            Self::BatchFinished { .. } => "batch_finished",
        }
    }
}

/// Receives diagnostic events for one batch run.
pub trait DiagnosticSink: Send + Sync {
    fn record(&self, event: &DiagnosticEvent);

    fn name(&self) -> &str;
}
