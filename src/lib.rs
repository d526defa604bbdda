//! Critical path scheduling engine for construction project timelines.
//!
//! Turns flat task and dependency records into a validated dependency graph,
//! computes earliest/latest dates with the two-pass critical path method over
//! a working-day calendar, derives slack and the critical set, diffs against
//! saved baselines, and re-solves minimally under localized edits.
//!
//! The engine is synchronous and deterministic: a solve takes an immutable
//! input snapshot and returns (or fails) before the caller proceeds. The
//! [`engine::ScheduleEngine`] facade is the usual entry point; the individual
//! stages (`graph`, `solver`, `slack`, `baseline`, `recalc`) are public for
//! callers that drive them directly.

pub mod baseline;
pub mod calendar;
mod config;
pub mod engine;
pub mod graph;
mod interner;
pub mod logging;
mod models;
pub mod recalc;
pub mod slack;
pub mod solver;

pub use baseline::{BaselineLog, ScheduleBaseline, ScheduleBaselineItem};
pub use calendar::{CalendarConfig, CalendarError, WorkdayCalendar};
pub use config::EngineConfig;
pub use engine::{
    apply_computed_dates, BaselineReport, ComputedSchedule, EngineError, ScheduleEngine,
};
pub use graph::{GraphError, ScheduleGraph};
pub use interner::{NodeId, NodeIndex};
pub use models::{
    CriticalPathItem, DependencyKind, ScheduleItem, ScheduleItemVariance, ScheduleStatus,
    TaskDependency,
};
pub use recalc::{RecalcPlan, ScheduleEdit};
pub use solver::{
    solve, ScheduleInfeasibleWarning, SolveError, SolveOptions, SolveResult, TaskSchedule,
};
