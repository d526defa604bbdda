//! Baseline snapshots and variance tracking.
//!
//! A baseline is an immutable copy of every task's planned dates at the
//! moment the user saves it. Saving a new baseline supersedes the previous
//! active one; old baselines are kept for historical comparison and never
//! mutated or deleted. Variance is a read-through view, recomputed on demand
//! and never persisted on its own.

use chrono::{DateTime, NaiveDate, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::calendar::WorkdayCalendar;
use crate::models::{ScheduleItem, ScheduleItemVariance, ScheduleStatus};

/// Frozen per-task snapshot inside a baseline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleBaselineItem {
    pub task_id: String,
    pub start: NaiveDate,
    pub finish: NaiveDate,
    pub duration_days: i64,
    pub percent_complete: u8,
}

/// An immutable snapshot of the whole schedule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleBaseline {
    pub id: String,
    pub name: String,
    pub saved_at: DateTime<Utc>,
    /// Only the active baseline drives variance display.
    pub is_active: bool,
    items: FxHashMap<String, ScheduleBaselineItem>,
}

impl ScheduleBaseline {
    /// Snapshot every non-deleted task.
    pub fn capture(
        id: impl Into<String>,
        name: impl Into<String>,
        tasks: &[ScheduleItem],
        saved_at: DateTime<Utc>,
    ) -> Self {
        let items = tasks
            .iter()
            .filter(|t| !t.is_deleted)
            .map(|t| {
                (
                    t.id.clone(),
                    ScheduleBaselineItem {
                        task_id: t.id.clone(),
                        start: t.start,
                        finish: t.finish,
                        duration_days: t.effective_duration(),
                        percent_complete: t.percent_complete,
                    },
                )
            })
            .collect();
        Self {
            id: id.into(),
            name: name.into(),
            saved_at,
            is_active: true,
            items,
        }
    }

    pub fn item(&self, task_id: &str) -> Option<&ScheduleBaselineItem> {
        self.items.get(task_id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// The project's baselines, newest active.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BaselineLog {
    baselines: Vec<ScheduleBaseline>,
}

impl BaselineLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture and store a new baseline, deactivating the previous one.
    /// Returns the new baseline's id.
    pub fn save(
        &mut self,
        name: impl Into<String>,
        tasks: &[ScheduleItem],
        saved_at: DateTime<Utc>,
    ) -> String {
        for baseline in &mut self.baselines {
            baseline.is_active = false;
        }
        let id = format!("baseline-{}", self.baselines.len() + 1);
        self.baselines
            .push(ScheduleBaseline::capture(id.clone(), name, tasks, saved_at));
        id
    }

    pub fn active(&self) -> Option<&ScheduleBaseline> {
        self.baselines.iter().find(|b| b.is_active)
    }

    pub fn get(&self, id: &str) -> Option<&ScheduleBaseline> {
        self.baselines.iter().find(|b| b.id == id)
    }

    pub fn len(&self) -> usize {
        self.baselines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.baselines.is_empty()
    }
}

/// Diff current tasks against a baseline, in working days.
///
/// Sign convention: positive variance means slipped later than planned.
/// Tasks missing from the baseline report `None` across the board.
pub fn compare(
    tasks: &[ScheduleItem],
    baseline: &ScheduleBaseline,
    calendar: &WorkdayCalendar,
) -> FxHashMap<String, ScheduleItemVariance> {
    let mut variances = FxHashMap::default();

    for task in tasks.iter().filter(|t| !t.is_deleted) {
        let variance = match baseline.item(&task.id) {
            Some(snapshot) => {
                let finish_variance = calendar.working_days_between(snapshot.finish, task.finish);
                ScheduleItemVariance {
                    start_variance_days: Some(
                        calendar.working_days_between(snapshot.start, task.start),
                    ),
                    finish_variance_days: Some(finish_variance),
                    duration_variance_days: Some(
                        task.effective_duration() - snapshot.duration_days,
                    ),
                    status: Some(status_for(finish_variance)),
                }
            }
            None => ScheduleItemVariance::default(),
        };
        variances.insert(task.id.clone(), variance);
    }

    variances
}

fn status_for(finish_variance_days: i64) -> ScheduleStatus {
    match finish_variance_days {
        v if v > 0 => ScheduleStatus::Behind,
        v if v < 0 => ScheduleStatus::Ahead,
        _ => ScheduleStatus::OnTrack,
    }
}

/// Roll per-task statuses into one dashboard figure: any task behind makes
/// the project behind; otherwise any task ahead makes it ahead.
pub fn aggregate_status(
    variances: &FxHashMap<String, ScheduleItemVariance>,
) -> ScheduleStatus {
    let mut any_ahead = false;
    for variance in variances.values() {
        match variance.status {
            Some(ScheduleStatus::Behind) => return ScheduleStatus::Behind,
            Some(ScheduleStatus::Ahead) => any_ahead = true,
            _ => {}
        }
    }
    if any_ahead {
        ScheduleStatus::Ahead
    } else {
        ScheduleStatus::OnTrack
    }
}
