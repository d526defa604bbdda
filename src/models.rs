//! Core data types for the scheduling engine.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// How a dependency links the endpoints of its two tasks.
///
/// The kind selects which endpoint (start vs finish) of each task the
/// constraint references; the aggregation rule in the solver is the same for
/// all four.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DependencyKind {
    /// Successor may start once the predecessor has finished.
    FinishToStart,
    /// Successor may start once the predecessor has started.
    StartToStart,
    /// Successor may finish once the predecessor has finished.
    FinishToFinish,
    /// Successor may finish once the predecessor has started.
    StartToFinish,
}

impl DependencyKind {
    /// Conventional two-letter code (FS/SS/FF/SF), used in log output.
    pub fn code(&self) -> &'static str {
        match self {
            DependencyKind::FinishToStart => "FS",
            DependencyKind::StartToStart => "SS",
            DependencyKind::FinishToFinish => "FF",
            DependencyKind::StartToFinish => "SF",
        }
    }
}

/// A directed, typed, lagged edge between two tasks.
///
/// Lag is a signed working-day offset: positive delays the successor,
/// negative overlaps it with the predecessor (fast-tracking).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDependency {
    pub predecessor_id: String,
    pub successor_id: String,
    pub kind: DependencyKind,
    pub lag_days: i64,
    /// Soft-delete marker; deleted edges are excluded from the graph.
    pub is_deleted: bool,
}

impl TaskDependency {
    pub fn new(
        predecessor_id: impl Into<String>,
        successor_id: impl Into<String>,
        kind: DependencyKind,
        lag_days: i64,
    ) -> Self {
        Self {
            predecessor_id: predecessor_id.into(),
            successor_id: successor_id.into(),
            kind,
            lag_days,
            is_deleted: false,
        }
    }
}

/// A unit of work on the schedule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleItem {
    pub id: String,
    pub name: String,
    /// Declared duration in whole working days. Zero for milestones.
    pub duration_days: i64,
    /// Current start date (maintained by edits or recomputation).
    pub start: NaiveDate,
    /// Current finish date. Invariant: `finish >= start`.
    pub finish: NaiveDate,
    /// Completion percentage, 0-100. Informational only; the solver always
    /// schedules against the planned duration.
    pub percent_complete: u8,
    pub is_milestone: bool,
    /// Start-no-earlier-than constraint.
    pub pinned_start: Option<NaiveDate>,
    /// Finish-no-later-than constraint. A deadline tighter than the earliest
    /// achievable dates yields negative float, flagged by the solver.
    pub deadline: Option<NaiveDate>,
    /// Soft-delete marker; rows are never physically erased while a baseline
    /// or dependency still references them.
    pub is_deleted: bool,
    /// The baseline snapshot this task was last captured in, if any.
    pub baseline_id: Option<String>,
}

impl ScheduleItem {
    /// Create a task starting on `start` with the given working-day duration.
    ///
    /// The finish date is provisional (`start` until a solve assigns real
    /// dates); callers that already know the finish can set it directly.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        start: NaiveDate,
        duration_days: i64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            duration_days,
            start,
            finish: start,
            percent_complete: 0,
            is_milestone: false,
            pinned_start: None,
            deadline: None,
            is_deleted: false,
            baseline_id: None,
        }
    }

    /// Create a milestone: zero duration, start == finish.
    pub fn new_milestone(id: impl Into<String>, name: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            duration_days: 0,
            start: date,
            finish: date,
            percent_complete: 0,
            is_milestone: true,
            pinned_start: None,
            deadline: None,
            is_deleted: false,
            baseline_id: None,
        }
    }

    /// Set completion percentage, clamped to 100.
    pub fn set_percent_complete(&mut self, percent: u8) {
        self.percent_complete = percent.min(100);
    }

    /// Soft-delete this task.
    pub fn mark_deleted(&mut self) {
        self.is_deleted = true;
    }

    /// Effective scheduling duration: milestones always count as zero.
    pub fn effective_duration(&self) -> i64 {
        if self.is_milestone {
            0
        } else {
            self.duration_days
        }
    }
}

/// Per-task computed result, fully owned by the solver.
///
/// A pure function of (tasks, dependencies, calendar, anchor); recomputed or
/// invalidated whenever an input changes, never edited directly.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriticalPathItem {
    pub task_id: String,
    pub earliest_start: NaiveDate,
    pub earliest_finish: NaiveDate,
    pub latest_start: NaiveDate,
    pub latest_finish: NaiveDate,
    pub total_slack_days: i64,
    pub free_slack_days: i64,
    pub is_critical: bool,
    pub calculated_at: DateTime<Utc>,
}

/// Tri-state schedule health relative to the active baseline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduleStatus {
    Ahead,
    Behind,
    OnTrack,
}

/// Variance of a task against its baseline snapshot, in working days.
///
/// All fields are `None` for a task added after the baseline was saved -
/// zero would falsely read as "on schedule".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleItemVariance {
    /// Positive = started later than planned.
    pub start_variance_days: Option<i64>,
    /// Positive = finishing later than planned.
    pub finish_variance_days: Option<i64>,
    pub duration_variance_days: Option<i64>,
    pub status: Option<ScheduleStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_milestone_invariant() {
        let m = ScheduleItem::new_milestone("m1", "Permit approved", date(2025, 3, 3));
        assert!(m.is_milestone);
        assert_eq!(m.duration_days, 0);
        assert_eq!(m.start, m.finish);
        assert_eq!(m.effective_duration(), 0);
    }

    #[test]
    fn test_percent_complete_clamped() {
        let mut t = ScheduleItem::new("t1", "Excavation", date(2025, 3, 3), 5);
        t.set_percent_complete(150);
        assert_eq!(t.percent_complete, 100);
    }

    #[test]
    fn test_dependency_kind_codes() {
        assert_eq!(DependencyKind::FinishToStart.code(), "FS");
        assert_eq!(DependencyKind::StartToStart.code(), "SS");
        assert_eq!(DependencyKind::FinishToFinish.code(), "FF");
        assert_eq!(DependencyKind::StartToFinish.code(), "SF");
    }

    #[test]
    fn test_model_serde_round_trip() {
        let dep = TaskDependency::new("a", "b", DependencyKind::StartToStart, -2);
        let json = serde_json::to_string(&dep).unwrap();
        let back: TaskDependency = serde_json::from_str(&json).unwrap();
        assert_eq!(dep, back);
    }
}
