//! Dependency graph construction and structural validation.
//!
//! Flat task/dependency records become an immutable arena: dense node ids,
//! per-node data vectors, typed forward and reverse adjacency lists, and the
//! topological order. The solver reuses the order without resorting; the
//! recalculation coordinator uses the adjacency lists for reachability
//! closures.

use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;
use thiserror::Error;

use crate::interner::{NodeId, NodeIndex};
use crate::models::{DependencyKind, ScheduleItem, TaskDependency};

/// Structural errors found while building the graph.
///
/// All of these are fatal to the requested solve: the caller must fix the
/// input before any schedule can be computed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("duplicate task id: {task_id}")]
    DuplicateTask { task_id: String },
    #[error("dependency references unknown or deleted task: {task_id}")]
    UnknownTask { task_id: String },
    #[error("task cannot depend on itself: {task_id}")]
    SelfDependency { task_id: String },
    #[error("dependency cycle detected: {}", cycle.join(" -> "))]
    CycleDetected { cycle: Vec<String> },
}

/// One directed edge as seen from one of its endpoints.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Edge {
    /// The node at the far end: the successor in a forward list, the
    /// predecessor in a reverse list.
    pub other: NodeId,
    pub kind: DependencyKind,
    pub lag_days: i64,
}

/// Immutable dependency graph over the non-deleted tasks and edges.
#[derive(Clone, Debug)]
pub struct ScheduleGraph {
    index: NodeIndex,
    durations: Vec<i64>,
    pinned_starts: Vec<Option<chrono::NaiveDate>>,
    deadlines: Vec<Option<chrono::NaiveDate>>,
    successors: Vec<Vec<Edge>>,
    predecessors: Vec<Vec<Edge>>,
    topo_order: Vec<NodeId>,
}

impl ScheduleGraph {
    /// Build and validate the graph.
    ///
    /// Soft-deleted tasks and edges are excluded first; the graph is the
    /// union of the non-deleted edges over the non-deleted tasks. Validation
    /// order: duplicate ids, unknown endpoint references, self-edges, cycles.
    pub fn build(
        tasks: &[ScheduleItem],
        dependencies: &[TaskDependency],
    ) -> Result<Self, GraphError> {
        let live_tasks: Vec<&ScheduleItem> = tasks.iter().filter(|t| !t.is_deleted).collect();

        let mut seen: FxHashSet<&str> = FxHashSet::default();
        for task in &live_tasks {
            if !seen.insert(task.id.as_str()) {
                return Err(GraphError::DuplicateTask {
                    task_id: task.id.clone(),
                });
            }
        }

        let live_deps: Vec<&TaskDependency> =
            dependencies.iter().filter(|d| !d.is_deleted).collect();

        for dep in &live_deps {
            for endpoint in [&dep.predecessor_id, &dep.successor_id] {
                if !seen.contains(endpoint.as_str()) {
                    return Err(GraphError::UnknownTask {
                        task_id: endpoint.clone(),
                    });
                }
            }
        }
        for dep in &live_deps {
            if dep.predecessor_id == dep.successor_id {
                return Err(GraphError::SelfDependency {
                    task_id: dep.predecessor_id.clone(),
                });
            }
        }

        // Sorted interning keeps node ids stable across rebuilds of the same
        // task set, which partial recalculation depends on.
        let mut sorted_ids: Vec<String> = live_tasks.iter().map(|t| t.id.clone()).collect();
        sorted_ids.sort();
        let index = NodeIndex::from_sorted(sorted_ids);

        let n = index.len();
        let mut durations = vec![0i64; n];
        let mut pinned_starts = vec![None; n];
        let mut deadlines = vec![None; n];
        let mut successors: Vec<Vec<Edge>> = vec![Vec::new(); n];
        let mut predecessors: Vec<Vec<Edge>> = vec![Vec::new(); n];

        for task in &live_tasks {
            if let Some(node) = index.get(&task.id) {
                let idx = node as usize;
                durations[idx] = task.effective_duration();
                pinned_starts[idx] = task.pinned_start;
                deadlines[idx] = task.deadline;
            }
        }

        for dep in &live_deps {
            // Endpoints were validated above
            if let (Some(pred), Some(succ)) =
                (index.get(&dep.predecessor_id), index.get(&dep.successor_id))
            {
                successors[pred as usize].push(Edge {
                    other: succ,
                    kind: dep.kind,
                    lag_days: dep.lag_days,
                });
                predecessors[succ as usize].push(Edge {
                    other: pred,
                    kind: dep.kind,
                    lag_days: dep.lag_days,
                });
            }
        }

        let topo_order = topological_sort(&index, &successors, &predecessors)?;

        Ok(Self {
            index,
            durations,
            pinned_starts,
            deadlines,
            successors,
            predecessors,
            topo_order,
        })
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn node_of(&self, task_id: &str) -> Option<NodeId> {
        self.index.get(task_id)
    }

    pub fn task_id(&self, node: NodeId) -> &str {
        self.index.name(node)
    }

    pub fn duration(&self, node: NodeId) -> i64 {
        self.durations[node as usize]
    }

    pub fn pinned_start(&self, node: NodeId) -> Option<chrono::NaiveDate> {
        self.pinned_starts[node as usize]
    }

    pub fn deadline(&self, node: NodeId) -> Option<chrono::NaiveDate> {
        self.deadlines[node as usize]
    }

    pub fn successors(&self, node: NodeId) -> &[Edge] {
        &self.successors[node as usize]
    }

    pub fn predecessors(&self, node: NodeId) -> &[Edge] {
        &self.predecessors[node as usize]
    }

    /// Dependencies-before-dependents order, computed once at build time.
    pub fn topo_order(&self) -> &[NodeId] {
        &self.topo_order
    }

    /// Every node reachable from `seeds` via forward edges, seeds included.
    /// Returned as a membership vector indexed by node id.
    pub fn forward_closure<I: IntoIterator<Item = NodeId>>(&self, seeds: I) -> Vec<bool> {
        self.closure(seeds, &self.successors)
    }

    /// Every node that can reach `seeds` via forward edges (i.e. reachable
    /// via reverse edges), seeds included.
    pub fn backward_closure<I: IntoIterator<Item = NodeId>>(&self, seeds: I) -> Vec<bool> {
        self.closure(seeds, &self.predecessors)
    }

    fn closure<I: IntoIterator<Item = NodeId>>(
        &self,
        seeds: I,
        adjacency: &[Vec<Edge>],
    ) -> Vec<bool> {
        let mut member = vec![false; self.len()];
        let mut queue: VecDeque<NodeId> = VecDeque::new();
        for seed in seeds {
            if !member[seed as usize] {
                member[seed as usize] = true;
                queue.push_back(seed);
            }
        }
        while let Some(node) = queue.pop_front() {
            for edge in &adjacency[node as usize] {
                if !member[edge.other as usize] {
                    member[edge.other as usize] = true;
                    queue.push_back(edge.other);
                }
            }
        }
        member
    }
}

/// Kahn's algorithm over the full edge set. Any node left unvisited implies
/// a cycle, reported with a concrete node sequence for UI highlighting.
fn topological_sort(
    index: &NodeIndex,
    successors: &[Vec<Edge>],
    predecessors: &[Vec<Edge>],
) -> Result<Vec<NodeId>, GraphError> {
    let n = index.len();
    let mut in_degree: Vec<usize> = predecessors.iter().map(|p| p.len()).collect();

    let mut queue: VecDeque<NodeId> = (0..n as NodeId)
        .filter(|&node| in_degree[node as usize] == 0)
        .collect();

    let mut order: Vec<NodeId> = Vec::with_capacity(n);
    while let Some(node) = queue.pop_front() {
        order.push(node);
        for edge in &successors[node as usize] {
            let idx = edge.other as usize;
            in_degree[idx] -= 1;
            if in_degree[idx] == 0 {
                queue.push_back(edge.other);
            }
        }
    }

    if order.len() != n {
        let remaining: FxHashSet<NodeId> = (0..n as NodeId)
            .filter(|&node| in_degree[node as usize] > 0)
            .collect();
        return Err(GraphError::CycleDetected {
            cycle: recover_cycle(index, predecessors, &remaining),
        });
    }

    Ok(order)
}

/// Walk predecessor edges within the unsorted residue until a node repeats,
/// then slice out the loop as task ids.
fn recover_cycle(
    index: &NodeIndex,
    predecessors: &[Vec<Edge>],
    remaining: &FxHashSet<NodeId>,
) -> Vec<String> {
    let start = match remaining.iter().min() {
        Some(&node) => node,
        None => return Vec::new(),
    };

    let mut position: FxHashMap<NodeId, usize> = FxHashMap::default();
    let mut path: Vec<NodeId> = Vec::new();
    let mut current = start;

    loop {
        if let Some(&at) = position.get(&current) {
            return path[at..].iter().map(|&n| index.name(n).to_string()).collect();
        }
        position.insert(current, path.len());
        path.push(current);

        // Every node in the residue has at least one predecessor in the
        // residue, otherwise Kahn would have drained it.
        current = match predecessors[current as usize]
            .iter()
            .map(|e| e.other)
            .find(|other| remaining.contains(other))
        {
            Some(next) => next,
            None => break,
        };
    }

    path.iter().map(|&n| index.name(n).to_string()).collect()
}
