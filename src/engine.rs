//! Engine facade: one call from flat records to a computed schedule.
//!
//! `compute` runs build -> solve -> slack analysis and emits per-task
//! [`CriticalPathItem`] rows. Results are memoized by a SHA-256 content hash
//! of the input snapshot (tasks, dependencies, calendar configuration,
//! anchor, options), so a computed row can only ever be served for inputs
//! that are byte-identical to the ones it was derived from - staleness is
//! structurally impossible, not just unlikely.

use chrono::{NaiveDate, Utc};
use rustc_hash::FxHashMap;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::baseline::{self, ScheduleBaseline};
use crate::calendar::{CalendarError, WorkdayCalendar};
use crate::config::EngineConfig;
use crate::graph::{GraphError, ScheduleGraph};
use crate::interner::NodeId;
use crate::log_changes;
use crate::models::{
    CriticalPathItem, ScheduleItem, ScheduleItemVariance, ScheduleStatus, TaskDependency,
};
use crate::slack;
use crate::solver::{self, ScheduleInfeasibleWarning, SolveError, SolveOptions};

/// Errors surfaced by the engine facade.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Solve(#[from] SolveError),
    #[error(transparent)]
    Calendar(#[from] CalendarError),
    #[error("failed to serialize input snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),
}

/// A fully computed schedule, ready for the renderer and for persistence.
#[derive(Clone, Debug)]
pub struct ComputedSchedule {
    /// One row per non-deleted task, ordered by task id.
    pub items: Vec<CriticalPathItem>,
    pub project_finish: NaiveDate,
    /// Non-fatal conditions; present means the caller should surface a
    /// banner, not discard the result.
    pub warnings: Vec<ScheduleInfeasibleWarning>,
}

impl ComputedSchedule {
    pub fn item(&self, task_id: &str) -> Option<&CriticalPathItem> {
        self.items.iter().find(|i| i.task_id == task_id)
    }
}

/// Variance view attached in baseline mode.
#[derive(Clone, Debug)]
pub struct BaselineReport {
    pub variances: FxHashMap<String, ScheduleItemVariance>,
    pub overall_status: ScheduleStatus,
}

/// Synchronous, single-threaded scheduling engine.
///
/// Each call takes an immutable snapshot of the inputs and returns an
/// immutable result; racing edits are reconciled by the caller, never here.
pub struct ScheduleEngine {
    calendar: WorkdayCalendar,
    config: EngineConfig,
    cache: FxHashMap<String, ComputedSchedule>,
}

impl ScheduleEngine {
    pub fn new(calendar: WorkdayCalendar, config: EngineConfig) -> Self {
        Self {
            calendar,
            config,
            cache: FxHashMap::default(),
        }
    }

    pub fn calendar(&self) -> &WorkdayCalendar {
        &self.calendar
    }

    /// Number of memoized results.
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Validate, solve, and analyze one input snapshot.
    pub fn compute(
        &mut self,
        tasks: &[ScheduleItem],
        dependencies: &[TaskDependency],
        anchor: NaiveDate,
        options: SolveOptions,
    ) -> Result<ComputedSchedule, EngineError> {
        let key = if self.config.cache_enabled {
            let key = self.snapshot_key(tasks, dependencies, anchor, &options)?;
            if let Some(hit) = self.cache.get(&key) {
                log_changes!(self.config.verbosity, "engine: cache hit for {}", &key[..12]);
                return Ok(hit.clone());
            }
            Some(key)
        } else {
            None
        };

        let graph = ScheduleGraph::build(tasks, dependencies)?;
        let result = solver::solve(&graph, &self.calendar, anchor, options)?;
        let analysis = slack::analyze(&graph, &self.calendar, &result);

        let calculated_at = Utc::now();
        let items = (0..graph.len() as NodeId)
            .map(|node| {
                let timing = &result.timings[node as usize];
                let task_slack = &analysis.slacks[node as usize];
                CriticalPathItem {
                    task_id: graph.task_id(node).to_string(),
                    earliest_start: timing.earliest_start,
                    earliest_finish: timing.earliest_finish,
                    latest_start: timing.latest_start,
                    latest_finish: timing.latest_finish,
                    total_slack_days: task_slack.total_slack_days,
                    free_slack_days: task_slack.free_slack_days,
                    is_critical: task_slack.is_critical,
                    calculated_at,
                }
            })
            .collect();

        let computed = ComputedSchedule {
            items,
            project_finish: result.project_finish,
            warnings: result.warnings,
        };
        log_changes!(
            self.config.verbosity,
            "engine: solved {} tasks, project finish {}",
            graph.len(),
            computed.project_finish
        );

        if let Some(key) = key {
            self.cache.insert(key, computed.clone());
        }
        Ok(computed)
    }

    /// [`compute`](Self::compute), plus variance against a baseline.
    ///
    /// The variance view is always recomputed on read; only the solve itself
    /// is memoized.
    pub fn compute_with_baseline(
        &mut self,
        tasks: &[ScheduleItem],
        dependencies: &[TaskDependency],
        anchor: NaiveDate,
        options: SolveOptions,
        baseline_snapshot: &ScheduleBaseline,
    ) -> Result<(ComputedSchedule, BaselineReport), EngineError> {
        let computed = self.compute(tasks, dependencies, anchor, options)?;
        let variances = baseline::compare(tasks, baseline_snapshot, &self.calendar);
        let overall_status = baseline::aggregate_status(&variances);
        Ok((
            computed,
            BaselineReport {
                variances,
                overall_status,
            },
        ))
    }

    fn snapshot_key(
        &self,
        tasks: &[ScheduleItem],
        dependencies: &[TaskDependency],
        anchor: NaiveDate,
        options: &SolveOptions,
    ) -> Result<String, serde_json::Error> {
        let snapshot = serde_json::to_vec(&(
            tasks,
            dependencies,
            self.calendar.config(),
            anchor,
            options,
        ))?;
        let digest = Sha256::digest(&snapshot);
        Ok(digest.iter().map(|b| format!("{:02x}", b)).collect())
    }
}

/// Write computed dates back onto the task records, the way a
/// dependency-driven recomputation updates the visible schedule lines.
pub fn apply_computed_dates(tasks: &mut [ScheduleItem], schedule: &ComputedSchedule) {
    let dates: FxHashMap<&str, (NaiveDate, NaiveDate)> = schedule
        .items
        .iter()
        .map(|i| (i.task_id.as_str(), (i.earliest_start, i.earliest_finish)))
        .collect();
    for task in tasks.iter_mut().filter(|t| !t.is_deleted) {
        if let Some(&(start, finish)) = dates.get(task.id.as_str()) {
            task.start = start;
            task.finish = finish;
        }
    }
}
