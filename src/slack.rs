//! Slack derivation and critical path identification.
//!
//! Works entirely in whole working days, so criticality is exact equality
//! on zero - no epsilon. Multiple disjoint critical paths all surface
//! through the critical set; nothing is collapsed to a single path.

use crate::calendar::WorkdayCalendar;
use crate::graph::ScheduleGraph;
use crate::interner::NodeId;
use crate::models::DependencyKind;
use crate::solver::SolveResult;

/// Slack figures for one task.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TaskSlack {
    /// Working days the task can slip without delaying the project finish.
    pub total_slack_days: i64,
    /// Working days the task can slip without delaying the earliest start
    /// (or finish, for finish-linked edges) of any successor.
    pub free_slack_days: i64,
    pub is_critical: bool,
}

/// Per-node slack, indexed like the solve result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlackAnalysis {
    pub slacks: Vec<TaskSlack>,
}

impl SlackAnalysis {
    pub fn slack(&self, graph: &ScheduleGraph, task_id: &str) -> Option<&TaskSlack> {
        graph
            .node_of(task_id)
            .map(|node| &self.slacks[node as usize])
    }

    /// Ids of every task on a critical path, in arbitrary order.
    pub fn critical_task_ids(&self, graph: &ScheduleGraph) -> Vec<String> {
        self.slacks
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_critical)
            .map(|(node, _)| graph.task_id(node as NodeId).to_string())
            .collect()
    }
}

/// Derive total slack, free slack, and the critical flag for every task.
pub fn analyze(
    graph: &ScheduleGraph,
    calendar: &WorkdayCalendar,
    result: &SolveResult,
) -> SlackAnalysis {
    let mut slacks = Vec::with_capacity(graph.len());

    for node in 0..graph.len() as NodeId {
        let timing = &result.timings[node as usize];
        let total =
            calendar.working_days_between(timing.earliest_start, timing.latest_start);

        // Free slack: how far this task's early dates sit below the tightest
        // successor requirement. Working-day counts compose, so the lag is
        // subtracted from the plain distance instead of re-adding it to a date.
        let mut free: Option<i64> = None;
        for edge in graph.successors(node) {
            let succ = &result.timings[edge.other as usize];
            let room = match edge.kind {
                DependencyKind::FinishToStart => {
                    calendar.working_days_between(timing.earliest_finish, succ.earliest_start)
                }
                DependencyKind::StartToStart => {
                    calendar.working_days_between(timing.earliest_start, succ.earliest_start)
                }
                DependencyKind::FinishToFinish => {
                    calendar.working_days_between(timing.earliest_finish, succ.earliest_finish)
                }
                DependencyKind::StartToFinish => {
                    calendar.working_days_between(timing.earliest_start, succ.earliest_finish)
                }
            } - edge.lag_days;
            free = Some(match free {
                Some(current) => current.min(room),
                None => room,
            });
        }
        // A task with no successors can drift up to its total slack
        let free = free.unwrap_or(total);

        slacks.push(TaskSlack {
            total_slack_days: total,
            free_slack_days: free,
            is_critical: total == 0,
        });
    }

    SlackAnalysis { slacks }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::CalendarConfig;
    use crate::models::{ScheduleItem, TaskDependency};
    use crate::solver::{solve, SolveOptions};
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn calendar() -> WorkdayCalendar {
        WorkdayCalendar::new(CalendarConfig::default()).unwrap()
    }

    fn task(id: &str, duration: i64) -> ScheduleItem {
        ScheduleItem::new(id, id, date(2025, 1, 6), duration)
    }

    fn fs(pred: &str, succ: &str) -> TaskDependency {
        TaskDependency::new(pred, succ, DependencyKind::FinishToStart, 0)
    }

    fn analyze_graph(
        tasks: &[ScheduleItem],
        deps: &[TaskDependency],
    ) -> (ScheduleGraph, SlackAnalysis) {
        let graph = ScheduleGraph::build(tasks, deps).unwrap();
        let cal = calendar();
        let result = solve(&graph, &cal, date(2025, 1, 6), SolveOptions::default()).unwrap();
        let analysis = analyze(&graph, &cal, &result);
        (graph, analysis)
    }

    #[test]
    fn test_chain_is_fully_critical() {
        let (graph, analysis) = analyze_graph(&[task("a", 5), task("b", 3)], &[fs("a", "b")]);

        for id in ["a", "b"] {
            let s = analysis.slack(&graph, id).unwrap();
            assert_eq!(s.total_slack_days, 0);
            assert_eq!(s.free_slack_days, 0);
            assert!(s.is_critical);
        }
        let mut critical = analysis.critical_task_ids(&graph);
        critical.sort();
        assert_eq!(critical, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_parallel_short_task_has_slack() {
        // A(5) -> B(3), C(2) alone; project finish Jan 16
        let (graph, analysis) = analyze_graph(
            &[task("a", 5), task("b", 3), task("c", 2)],
            &[fs("a", "b")],
        );

        let c = analysis.slack(&graph, "c").unwrap();
        assert_eq!(c.total_slack_days, 6);
        assert_eq!(c.free_slack_days, 6); // no successors: free == total
        assert!(!c.is_critical);

        let mut critical = analysis.critical_task_ids(&graph);
        critical.sort();
        assert_eq!(critical, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_free_slack_smaller_than_total() {
        // a(1) -> b(1) -> d(1) beside c(5); the chain has total slack 2 but
        // zero free slack inside it
        let (graph, analysis) = analyze_graph(
            &[task("a", 1), task("b", 1), task("c", 5), task("d", 1)],
            &[fs("a", "b"), fs("b", "d")],
        );

        let a = analysis.slack(&graph, "a").unwrap();
        assert_eq!(a.total_slack_days, 2);
        assert_eq!(a.free_slack_days, 0);

        let d = analysis.slack(&graph, "d").unwrap();
        assert_eq!(d.total_slack_days, 2);
        assert_eq!(d.free_slack_days, 2);
    }

    #[test]
    fn test_disjoint_critical_paths_all_reported() {
        // Two independent chains of equal length 8
        let (graph, analysis) = analyze_graph(
            &[task("a1", 5), task("b1", 3), task("a2", 4), task("b2", 4)],
            &[fs("a1", "b1"), fs("a2", "b2")],
        );

        let mut critical = analysis.critical_task_ids(&graph);
        critical.sort();
        assert_eq!(
            critical,
            vec![
                "a1".to_string(),
                "a2".to_string(),
                "b1".to_string(),
                "b2".to_string()
            ]
        );
    }

    #[test]
    fn test_critical_path_exists_in_any_acyclic_graph() {
        let (graph, analysis) = analyze_graph(
            &[task("a", 2), task("b", 3), task("c", 5), task("d", 1)],
            &[fs("a", "b"), fs("a", "c"), fs("b", "d"), fs("c", "d")],
        );

        // a -> c -> d is the longest path; every member has zero slack
        for id in ["a", "c", "d"] {
            assert!(analysis.slack(&graph, id).unwrap().is_critical);
        }
        assert!(!analysis.slack(&graph, "b").unwrap().is_critical);
    }

    #[test]
    fn test_lagged_edge_free_slack() {
        // a(2) -FS lag 3-> b(1): the lag consumes the gap, free slack 0
        let (graph, analysis) = analyze_graph(
            &[task("a", 2), task("b", 1)],
            &[TaskDependency::new("a", "b", DependencyKind::FinishToStart, 3)],
        );
        assert_eq!(analysis.slack(&graph, "a").unwrap().free_slack_days, 0);
        assert!(analysis.slack(&graph, "a").unwrap().is_critical);
    }
}
