use crate::config::OperationsConfig;
use crate::error::{ErrorCode, OperationError};
use crate::operation::{Operation, OperationKind};

/// Apply per-type `max` to a schema-checked batch.
///
/// Atomic types (`max = 1`) fail as a whole when more than one operation of
/// the type was proposed. Other types keep the first `max` valid operations
/// in batch order and reject the rest.
pub fn enforce_limits(ops: &mut [Operation], operations: &OperationsConfig) {
    for kind in OperationKind::ALL {
        let Some(common) = operations.common(kind).filter(|c| c.max > 0) else {
            continue;
        };
        let max = common.max as usize;
        let proposed: Vec<usize> = ops
            .iter()
            .enumerate()
            .filter(|(_, op)| op.kind == Some(kind))
            .map(|(pos, _)| pos)
            .collect();

        if common.is_atomic() && proposed.len() > 1 {
            let count = proposed.len();
            tracing::warn!(%kind, proposed = count, "atomic type over its limit");
            for pos in proposed {
                ops[pos].reject(OperationError::new(
                    ErrorCode::LimitExceeded,
                    format!("{kind} allows a single operation per run and {count} were proposed"),
                ));
            }
            continue;
        }

        let excess: Vec<usize> = proposed
            .into_iter()
            .filter(|pos| ops[*pos].is_live())
            .skip(max)
            .collect();
        if excess.is_empty() {
            continue;
        }
        tracing::warn!(%kind, max, rejected = excess.len(), "operations over limit");
        for pos in excess {
            ops[pos].reject(OperationError::new(
                ErrorCode::LimitExceeded,
                format!("{kind} is limited to {max} operations per run"),
            ));
        }
    }
}
