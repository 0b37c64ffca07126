//! Execution of a resolved batch.
//!
//! Chains from the [`ExecutionPlan`] run concurrently; operations within a
//! chain run in order so creators finish before their dependents look up the
//! references they produced.

pub mod handlers;
pub mod preview;
pub mod retry;

pub use preview::{PreviewRecord, StagedPreview};
pub use retry::{RetryPolicy, execute_with_retry};

use crate::authorize::RepositoryAuthorizer;
use crate::config::{FailurePolicy, SafeOutputsConfig};
use crate::diagnostics::{DiagnosticEvent, DiagnosticSink};
use crate::error::{ErrorCode, OperationError};
use crate::operation::{Operation, OperationStatus};
use crate::platform::PlatformClient;
use crate::resolve::{ExecutionPlan, TemporaryIdMap};
use futures_util::future::join_all;
use handlers::HandlerContext;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

pub struct Dispatcher<'a> {
    authorizer: &'a RepositoryAuthorizer<'a>,
    client: &'a dyn PlatformClient,
    sink: &'a dyn DiagnosticSink,
    retry: RetryPolicy,
    failure_policy: FailurePolicy,
    staged: bool,
}

/// Shared state of one dispatch run.
struct RunState {
    map: Mutex<TemporaryIdMap>,
    aborted: AtomicBool,
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        config: &SafeOutputsConfig,
        authorizer: &'a RepositoryAuthorizer<'a>,
        client: &'a dyn PlatformClient,
        sink: &'a dyn DiagnosticSink,
    ) -> Self {
        Self {
            authorizer,
            client,
            sink,
            retry: RetryPolicy::from_config(&config.retry),
            failure_policy: config.dispatch.failure_policy,
            staged: config.staged,
        }
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Run every planned operation. Returns the updated operations, the
    /// final temporary id map and, in staged mode, the preview.
    pub async fn run(
        &self,
        ops: Vec<Operation>,
        plan: &ExecutionPlan,
        map: TemporaryIdMap,
    ) -> (Vec<Operation>, TemporaryIdMap, Option<StagedPreview>) {
        let mut slots: Vec<Option<Operation>> = ops.into_iter().map(Some).collect();
        let chains: Vec<Vec<(usize, Operation)>> = plan
            .chains
            .iter()
            .map(|chain| {
                chain
                    .iter()
                    .filter_map(|&pos| slots.get_mut(pos)?.take().map(|op| (pos, op)))
                    .collect()
            })
            .collect();

        tracing::info!(
            chains = chains.len(),
            operations = plan.len(),
            staged = self.staged,
            client = self.client.name(),
            "Dispatching batch"
        );

        let state = RunState {
            map: Mutex::new(map),
            aborted: AtomicBool::new(false),
        };
        let finished = join_all(chains.into_iter().map(|chain| self.run_chain(chain, &state))).await;

        let mut previews = Vec::new();
        for (chain, chain_previews) in finished {
            previews.extend(chain_previews);
            for (pos, op) in chain {
                slots[pos] = Some(op);
            }
        }

        let ops = slots.into_iter().flatten().collect();
        let map = state.map.into_inner().unwrap_or_else(PoisonError::into_inner);
        let preview = self.staged.then(|| StagedPreview::new(previews));
        (ops, map, preview)
    }

    async fn run_chain(
        &self,
        mut chain: Vec<(usize, Operation)>,
        state: &RunState,
    ) -> (Vec<(usize, Operation)>, Vec<PreviewRecord>) {
        let mut previews = Vec::new();
        for (_, op) in &mut chain {
            if let Some(record) = self.run_one(op, state).await {
                previews.push(record);
            }
        }
        (chain, previews)
    }

    async fn run_one(&self, op: &mut Operation, state: &RunState) -> Option<PreviewRecord> {
        if !op.is_live() {
            return None;
        }
        if state.aborted.load(Ordering::SeqCst) {
            op.block(OperationError::new(
                ErrorCode::SkippedAfterFailure,
                "skipped because an earlier operation failed",
            ));
            self.record_failure(op);
            return None;
        }
        let kind = op.kind?;
        let target = op.target_repository.clone()?;

        let complete = {
            let map = state.map.lock().unwrap_or_else(PoisonError::into_inner);
            op.payload
                .as_mut()
                .is_some_and(|payload| payload.substitute(&target, &map))
        };

        // Placeholders may have resolved into a repository this type
        // cannot write to.
        self.authorizer.authorize_references(op);
        if !op.is_live() {
            self.record_failure(op);
            return None;
        }

        if self.staged {
            let payload = op.payload.as_ref()?;
            let record = PreviewRecord::new(op.index, payload, Some(&target));
            op.advance(OperationStatus::Previewed);
            self.sink.record(&DiagnosticEvent::OperationPreviewed {
                index: op.index,
                kind,
            });
            return Some(record);
        }

        if !complete {
            let missing = {
                let map = state.map.lock().unwrap_or_else(PoisonError::into_inner);
                op.referenced_ids
                    .iter()
                    .filter(|id| map.resolve(id).is_none())
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            op.block(OperationError::new(
                ErrorCode::BlockedByDependency,
                format!("temporary id(s) {missing} were not resolved because their creator did not succeed"),
            ));
            self.record_failure(op);
            return None;
        }

        let ctx = HandlerContext {
            client: self.client,
            retry: &self.retry,
            sink: self.sink,
            index: op.index,
            repository: &target,
        };
        let payload = op.payload.as_ref()?;
        match handlers::execute(&ctx, payload).await {
            Ok(resource) => {
                if kind.creates_resource()
                    && let (Some(id), Some(resource)) = (op.temporary_id.clone(), resource.as_ref())
                {
                    state
                        .map
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .record_resolved(id, resource.clone());
                }
                self.sink.record(&DiagnosticEvent::OperationExecuted {
                    index: op.index,
                    kind,
                    resource: resource.as_ref().map(ToString::to_string),
                });
                op.result_ref = resource;
                op.advance(OperationStatus::Executed);
            }
            Err(e) => {
                let code = if e.is_transient() {
                    ErrorCode::PlatformTransientFailure
                } else {
                    ErrorCode::PlatformRequestFailed
                };
                tracing::warn!(index = op.index, kind = %kind, class = %e.class, "Operation failed: {e}");
                op.fail(OperationError::new(code, e.to_string()));
                self.record_failure(op);
                if self.failure_policy == FailurePolicy::AbortRemaining && !e.is_transient() {
                    state.aborted.store(true, Ordering::SeqCst);
                }
            }
        }
        None
    }

    fn record_failure(&self, op: &Operation) {
        if let Some(error) = &op.error {
            self.sink.record(&DiagnosticEvent::OperationFailed {
                index: op.index,
                kind: op.label(),
                code: error.code,
            });
        }
    }
}
