//! Forward/backward pass solver.
//!
//! Two topological sweeps over the dependency graph. The forward pass takes
//! the maximum over all predecessor constraints (the binding constraint wins,
//! which is what makes the longest path fall out); the backward pass mirrors
//! it with the minimum over successor constraints. Dependency kind only
//! changes which endpoint of which task a constraint references, never the
//! aggregation rule.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calendar::{CalendarError, WorkdayCalendar};
use crate::graph::ScheduleGraph;
use crate::interner::NodeId;
use crate::models::DependencyKind;

/// Errors fatal to a solve.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SolveError {
    /// An explicit project finish earlier than the computed minimum is
    /// rejected outright, never silently clamped.
    #[error("explicit project finish {explicit} is earlier than computed finish {computed}")]
    FinishBeforeComputed {
        explicit: NaiveDate,
        computed: NaiveDate,
    },
    #[error(transparent)]
    Calendar(#[from] CalendarError),
}

/// Optional solve inputs beyond the task/dependency snapshot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolveOptions {
    /// Contractual project finish. Must not be earlier than the computed
    /// project finish; extra room becomes slack on every path.
    pub explicit_finish: Option<NaiveDate>,
}

/// Earliest/latest dates for one task.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TaskSchedule {
    pub earliest_start: NaiveDate,
    pub earliest_finish: NaiveDate,
    pub latest_start: NaiveDate,
    pub latest_finish: NaiveDate,
}

/// Non-fatal: a deadline compressed a task's latest dates below its earliest
/// ones. Best-effort values are still returned; the caller surfaces this so
/// the user can relax the constraint or accept compression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScheduleInfeasibleWarning {
    pub task_id: String,
    /// The (negative) total float in working days.
    pub negative_float_days: i64,
}

/// Output of a solve: dense per-node timings plus the project finish.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SolveResult {
    /// Indexed by [`NodeId`]; valid for the graph the solve ran against
    /// (and any rebuild over the same task set, since node ids are stable).
    pub timings: Vec<TaskSchedule>,
    pub project_finish: NaiveDate,
    pub warnings: Vec<ScheduleInfeasibleWarning>,
}

impl SolveResult {
    /// Look up one task's dates by id.
    pub fn schedule(&self, graph: &ScheduleGraph, task_id: &str) -> Option<&TaskSchedule> {
        graph
            .node_of(task_id)
            .map(|node| &self.timings[node as usize])
    }
}

/// Earliest dates for one node, reading its predecessors' timings.
///
/// Valid only when every predecessor entry in `timings` is already final,
/// which processing in topological order guarantees.
pub(crate) fn compute_early(
    graph: &ScheduleGraph,
    calendar: &WorkdayCalendar,
    node: NodeId,
    timings: &[TaskSchedule],
    anchor: NaiveDate,
) -> Result<(NaiveDate, NaiveDate), CalendarError> {
    let duration = graph.duration(node);
    let mut earliest_start: Option<NaiveDate> = None;

    for edge in graph.predecessors(node) {
        let pred = &timings[edge.other as usize];
        let candidate = match edge.kind {
            DependencyKind::FinishToStart => {
                calendar.add_working_days(pred.earliest_finish, edge.lag_days)?
            }
            DependencyKind::StartToStart => {
                calendar.add_working_days(pred.earliest_start, edge.lag_days)?
            }
            DependencyKind::FinishToFinish => {
                let bound_finish =
                    calendar.add_working_days(pred.earliest_finish, edge.lag_days)?;
                calendar.add_working_days(bound_finish, -duration)?
            }
            DependencyKind::StartToFinish => {
                let bound_finish = calendar.add_working_days(pred.earliest_start, edge.lag_days)?;
                calendar.add_working_days(bound_finish, -duration)?
            }
        };
        earliest_start = Some(match earliest_start {
            Some(current) => current.max(candidate),
            None => candidate,
        });
    }

    // Tasks with predecessors take the binding constraint alone; negative lag
    // may legitimately pull them before the anchor.
    let mut earliest_start = earliest_start.unwrap_or(anchor);
    if let Some(pinned) = graph.pinned_start(node) {
        let pinned = calendar.snap_to_working_day(pinned)?;
        if pinned > earliest_start {
            earliest_start = pinned;
        }
    }

    let earliest_finish = calendar.add_working_days(earliest_start, duration)?;
    Ok((earliest_start, earliest_finish))
}

/// Latest dates for one node, reading its successors' timings.
///
/// Valid only when every successor entry in `timings` is already final,
/// which processing in reverse topological order guarantees.
pub(crate) fn compute_late(
    graph: &ScheduleGraph,
    calendar: &WorkdayCalendar,
    node: NodeId,
    timings: &[TaskSchedule],
    project_finish: NaiveDate,
) -> Result<(NaiveDate, NaiveDate), CalendarError> {
    let duration = graph.duration(node);
    let mut latest_finish: Option<NaiveDate> = None;

    for edge in graph.successors(node) {
        let succ = &timings[edge.other as usize];
        let candidate = match edge.kind {
            DependencyKind::FinishToStart => {
                calendar.add_working_days(succ.latest_start, -edge.lag_days)?
            }
            DependencyKind::StartToStart => {
                let bound_start = calendar.add_working_days(succ.latest_start, -edge.lag_days)?;
                calendar.add_working_days(bound_start, duration)?
            }
            DependencyKind::FinishToFinish => {
                calendar.add_working_days(succ.latest_finish, -edge.lag_days)?
            }
            DependencyKind::StartToFinish => {
                let bound_start = calendar.add_working_days(succ.latest_finish, -edge.lag_days)?;
                calendar.add_working_days(bound_start, duration)?
            }
        };
        latest_finish = Some(match latest_finish {
            Some(current) => current.min(candidate),
            None => candidate,
        });
    }

    // Every task is part of the project, so its latest finish is capped at
    // the project finish even when a successor constraint (negative lag,
    // start-linked edges) would allow later.
    let mut latest_finish = match latest_finish {
        Some(candidate) => candidate.min(project_finish),
        None => project_finish,
    };
    if let Some(deadline) = graph.deadline(node) {
        let deadline = calendar.snap_back_to_working_day(deadline)?;
        if deadline < latest_finish {
            latest_finish = deadline;
        }
    }

    let latest_start = calendar.add_working_days(latest_finish, -duration)?;
    Ok((latest_start, latest_finish))
}

/// The computed project finish: the maximum earliest finish over all tasks,
/// floored at the anchor for empty input.
///
/// In a pure finish-to-start graph the maximum is always achieved by a
/// terminal task; start-linked edges and negative lag can leave a
/// non-terminal finishing last, so every node is considered.
pub(crate) fn computed_project_finish(
    graph: &ScheduleGraph,
    timings: &[TaskSchedule],
    anchor: NaiveDate,
) -> NaiveDate {
    let mut finish = anchor;
    for node in 0..graph.len() as NodeId {
        finish = finish.max(timings[node as usize].earliest_finish);
    }
    finish
}

/// Collect negative-float warnings over the whole timing set.
pub(crate) fn infeasibility_warnings(
    graph: &ScheduleGraph,
    calendar: &WorkdayCalendar,
    timings: &[TaskSchedule],
) -> Vec<ScheduleInfeasibleWarning> {
    let mut warnings = Vec::new();
    for node in 0..graph.len() as NodeId {
        let timing = &timings[node as usize];
        let float = calendar.working_days_between(timing.earliest_start, timing.latest_start);
        if float < 0 {
            warnings.push(ScheduleInfeasibleWarning {
                task_id: graph.task_id(node).to_string(),
                negative_float_days: float,
            });
        }
    }
    warnings
}

/// Run both passes over the whole graph.
///
/// Deterministic and synchronous: the same snapshot always yields the same
/// result, and the result is complete before the caller resumes.
pub fn solve(
    graph: &ScheduleGraph,
    calendar: &WorkdayCalendar,
    anchor: NaiveDate,
    options: SolveOptions,
) -> Result<SolveResult, SolveError> {
    let anchor = calendar.snap_to_working_day(anchor)?;
    let n = graph.len();

    let placeholder = TaskSchedule {
        earliest_start: anchor,
        earliest_finish: anchor,
        latest_start: anchor,
        latest_finish: anchor,
    };
    let mut timings = vec![placeholder; n];

    for &node in graph.topo_order() {
        let (es, ef) = compute_early(graph, calendar, node, &timings, anchor)?;
        timings[node as usize] = TaskSchedule {
            earliest_start: es,
            earliest_finish: ef,
            latest_start: es,
            latest_finish: ef,
        };
    }

    let computed = computed_project_finish(graph, &timings, anchor);
    let project_finish = match options.explicit_finish {
        Some(explicit) => {
            let explicit = calendar.snap_to_working_day(explicit)?;
            if explicit < computed {
                return Err(SolveError::FinishBeforeComputed { explicit, computed });
            }
            explicit
        }
        None => computed,
    };

    for &node in graph.topo_order().iter().rev() {
        let (ls, lf) = compute_late(graph, calendar, node, &timings, project_finish)?;
        timings[node as usize].latest_start = ls;
        timings[node as usize].latest_finish = lf;
    }

    let warnings = infeasibility_warnings(graph, calendar, &timings);

    Ok(SolveResult {
        timings,
        project_finish,
        warnings,
    })
}
