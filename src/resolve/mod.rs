//! Temporary-id dependency resolution.
//!
//! Operations that create a resource may announce a temporary id; any other
//! operation may reference it. The resolver rejects ambiguous declarations,
//! missing parents and cycles, blocks dependents of anything that failed,
//! then groups the survivors into independent chains in execution order.

mod mapping;

pub use mapping::{Lookup, MappingTarget, TemporaryIdMap};

use crate::error::{ErrorCode, OperationError};
use crate::operation::{Operation, OperationStatus, TemporaryId};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::unionfind::UnionFind;
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap, HashMap};

/// Independent chains of batch positions, each in dependency order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionPlan {
    pub chains: Vec<Vec<usize>>,
}

impl ExecutionPlan {
    pub fn len(&self) -> usize {
        self.chains.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// Every planned position, chain by chain.
    pub fn positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.chains.iter().flatten().copied()
    }
}

/// Dependency edges as `dependent -> creators`, keyed by batch position.
type Dependencies = BTreeMap<usize, BTreeSet<usize>>;

/// Resolve dependencies for every live operation and build the plan.
///
/// Literal issue numbers are bound to each operation's target repository,
/// and placeholders already known to `map` (seeded by an earlier job) are
/// substituted here. Batch-created placeholders stay unresolved until their
/// creator executes.
pub fn plan(ops: &mut [Operation], map: &TemporaryIdMap) -> ExecutionPlan {
    for op in ops.iter_mut() {
        if let Some(payload) = op.payload.as_mut() {
            op.referenced_ids = payload.referenced_ids();
        }
    }

    let ambiguous = reject_duplicate_declarations(ops, map);
    let creators: HashMap<TemporaryId, usize> = ops
        .iter()
        .enumerate()
        .filter_map(|(pos, op)| op.temporary_id.clone().map(|id| (id, pos)))
        .filter(|(id, _)| !ambiguous.contains(id))
        .collect();

    let deps = collect_dependencies(ops, map, &creators, &ambiguous);
    reject_cycles(ops, &deps);
    block_failed_dependencies(ops, &deps);

    let chains = order_chains(ops, &deps);

    for op in ops.iter_mut().filter(|op| op.is_live()) {
        if let (Some(payload), Some(target)) = (op.payload.as_mut(), op.target_repository.as_ref()) {
            payload.substitute(target, map);
        }
        op.advance(OperationStatus::Resolved);
    }

    let plan = ExecutionPlan { chains };
    tracing::info!(
        chains = plan.chains.len(),
        operations = plan.len(),
        "execution plan built"
    );
    plan
}

/// Reject every declaration of an id declared twice in the batch, or
/// declared again after being seeded. Returns the ambiguous ids.
fn reject_duplicate_declarations(
    ops: &mut [Operation],
    map: &TemporaryIdMap,
) -> BTreeSet<TemporaryId> {
    let mut declared: BTreeMap<TemporaryId, Vec<usize>> = BTreeMap::new();
    for (pos, op) in ops.iter().enumerate() {
        if let Some(id) = &op.temporary_id {
            declared.entry(id.clone()).or_default().push(pos);
        }
    }

    let mut ambiguous = BTreeSet::new();
    for (id, positions) in declared {
        let seeded = map.contains(&id);
        if positions.len() < 2 && !seeded {
            continue;
        }
        let indices: Vec<String> = positions.iter().map(|p| ops[*p].index.to_string()).collect();
        let message = if seeded {
            format!("temporary id '{id}' was already resolved by an earlier job")
        } else {
            format!(
                "temporary id '{id}' is declared by operations {}",
                indices.join(", ")
            )
        };
        tracing::warn!(temporary_id = %id, declarations = positions.len(), seeded, "ambiguous temporary id");
        for pos in positions {
            ops[pos].reject(
                OperationError::new(ErrorCode::DuplicateTemporaryId, message.clone())
                    .field("temporary_id"),
            );
        }
        ambiguous.insert(id);
    }
    ambiguous
}

fn collect_dependencies(
    ops: &mut [Operation],
    map: &TemporaryIdMap,
    creators: &HashMap<TemporaryId, usize>,
    ambiguous: &BTreeSet<TemporaryId>,
) -> Dependencies {
    let mut deps = Dependencies::new();
    for pos in 0..ops.len() {
        if !ops[pos].is_live() {
            continue;
        }
        let referenced: Vec<TemporaryId> = ops[pos].referenced_ids.iter().cloned().collect();
        for id in referenced {
            match map.follow(&id) {
                Lookup::Resolved(_) => {}
                Lookup::Cyclic => {
                    ops[pos].reject(OperationError::new(
                        ErrorCode::MissingDependency,
                        format!("temporary id '{id}' aliases itself"),
                    ));
                }
                Lookup::Unmapped(end) => {
                    if let Some(creator) = creators.get(&end) {
                        deps.entry(pos).or_default().insert(*creator);
                    } else if ambiguous.contains(&end) {
                        ops[pos].block(OperationError::new(
                            ErrorCode::BlockedByDependency,
                            format!("temporary id '{id}' is ambiguous"),
                        ));
                    } else {
                        ops[pos].reject(OperationError::new(
                            ErrorCode::MissingDependency,
                            format!("temporary id '{id}' is not declared by any operation"),
                        ));
                    }
                }
            }
        }
    }
    deps.retain(|pos, _| ops[*pos].is_live());
    deps
}

/// Reject every operation that sits on a dependency cycle.
fn reject_cycles(ops: &mut [Operation], deps: &Dependencies) {
    let mut graph: DiGraph<usize, ()> = DiGraph::new();
    let nodes: HashMap<usize, NodeIndex> = (0..ops.len())
        .filter(|pos| ops[*pos].is_live())
        .map(|pos| (pos, graph.add_node(pos)))
        .collect();
    for (dependent, creators) in deps {
        for creator in creators {
            if let (Some(from), Some(to)) = (nodes.get(creator), nodes.get(dependent)) {
                graph.add_edge(*from, *to, ());
            }
        }
    }

    for component in tarjan_scc(&graph) {
        let cyclic = component.len() > 1
            || component
                .first()
                .is_some_and(|n| graph.contains_edge(*n, *n));
        if !cyclic {
            continue;
        }
        let mut members: Vec<usize> = component.iter().map(|n| graph[*n]).collect();
        members.sort_unstable();
        let indices: Vec<String> = members.iter().map(|p| ops[*p].index.to_string()).collect();
        let message = format!("operations {} depend on each other", indices.join(", "));
        tracing::warn!(operations = %indices.join(","), "dependency cycle");
        for pos in members {
            ops[pos].reject(OperationError::new(ErrorCode::DependencyCycle, message.clone()));
        }
    }
}

/// Block, transitively, every operation whose creator is no longer live.
fn block_failed_dependencies(ops: &mut [Operation], deps: &Dependencies) {
    loop {
        let mut changed = false;
        for (dependent, creators) in deps {
            if !ops[*dependent].is_live() {
                continue;
            }
            if let Some(creator) = creators.iter().find(|c| !ops[**c].is_live()) {
                let err = OperationError::new(
                    ErrorCode::BlockedByDependency,
                    format!(
                        "depends on operation {} ({}), which will not run",
                        ops[*creator].index,
                        ops[*creator].label()
                    ),
                );
                ops[*dependent].block(err);
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
}

/// Kahn's algorithm over the live operations, lowest batch position first
/// among ready nodes, split into connected components.
fn order_chains(ops: &[Operation], deps: &Dependencies) -> Vec<Vec<usize>> {
    let live: Vec<usize> = (0..ops.len()).filter(|p| ops[*p].is_live()).collect();
    let mut in_degree: HashMap<usize, usize> = live.iter().map(|p| (*p, 0)).collect();
    let mut dependents: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut components = UnionFind::new(ops.len());

    for (dependent, creators) in deps.iter().filter(|(d, _)| ops[**d].is_live()) {
        for creator in creators {
            *in_degree.entry(*dependent).or_default() += 1;
            dependents.entry(*creator).or_default().push(*dependent);
            components.union(*creator, *dependent);
        }
    }

    let mut ready: BinaryHeap<Reverse<usize>> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(pos, _)| Reverse(*pos))
        .collect();
    let mut chains: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    let mut chain_of_root: HashMap<usize, usize> = HashMap::new();

    while let Some(Reverse(pos)) = ready.pop() {
        let root = components.find(pos);
        let key = *chain_of_root.entry(root).or_insert(pos);
        chains.entry(key).or_default().push(pos);
        for next in dependents.get(&pos).into_iter().flatten() {
            if let Some(degree) = in_degree.get_mut(next) {
                *degree -= 1;
                if *degree == 0 {
                    ready.push(Reverse(*next));
                }
            }
        }
    }

    chains.into_values().collect()
}
