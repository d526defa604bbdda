//! Incremental recalculation.
//!
//! A localized date/duration edit only moves the earliest dates of the
//! edited tasks and everything downstream of them, and the latest dates of
//! whatever lies upstream of that set. The coordinator plans those two
//! closures against the post-edit graph and re-solves just the affected
//! subsets, copying every other task's dates from the prior result.
//!
//! Structural edits (dependency add/remove, task add/delete) invalidate the
//! cached topological order and node indexing, so they always force a fresh
//! build and a full solve. Partial results are required to be bit-identical
//! to a full re-solve of the same snapshot; the tests hold the full solver
//! up as the oracle.

use chrono::NaiveDate;

use crate::calendar::WorkdayCalendar;
use crate::graph::ScheduleGraph;
use crate::interner::NodeId;
use crate::log_changes;
use crate::solver::{
    self, compute_early, compute_late, computed_project_finish, infeasibility_warnings,
    SolveError, SolveOptions, SolveResult,
};

/// What kind of edit triggered the recalculation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScheduleEdit {
    /// Start, duration, pin, or deadline changed on the named tasks; the
    /// dependency structure is untouched.
    DatesEdited { task_ids: Vec<String> },
    /// Dependencies or the task set itself changed.
    StructureChanged,
}

/// Which portion of the graph needs re-solving.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecalcPlan {
    Full,
    Partial {
        /// Downstream closure of the edited tasks (membership by node id).
        forward: Vec<bool>,
        /// Upstream closure of the forward set; always a superset of it.
        backward: Vec<bool>,
    },
}

/// Determine the minimal re-solve for an edit against the post-edit graph.
///
/// The closure must be taken after the edit, not before it: a task cut loose
/// from the edited region still needs revalidation against its remaining
/// predecessors, which only the post-edit adjacency can answer.
pub fn plan(graph: &ScheduleGraph, edit: &ScheduleEdit) -> RecalcPlan {
    match edit {
        ScheduleEdit::StructureChanged => RecalcPlan::Full,
        ScheduleEdit::DatesEdited { task_ids } => {
            let mut seeds: Vec<NodeId> = Vec::with_capacity(task_ids.len());
            for task_id in task_ids {
                match graph.node_of(task_id) {
                    Some(node) => seeds.push(node),
                    // Edited task not in the graph: the task set changed
                    // underneath us, treat as structural
                    None => return RecalcPlan::Full,
                }
            }
            let forward = graph.forward_closure(seeds);
            let backward_seeds = forward
                .iter()
                .enumerate()
                .filter(|(_, &member)| member)
                .map(|(node, _)| node as NodeId);
            let backward = graph.backward_closure(backward_seeds);
            RecalcPlan::Partial { forward, backward }
        }
    }
}

/// Re-solve according to a plan, reusing prior dates outside the closures.
pub fn recalculate(
    graph: &ScheduleGraph,
    calendar: &WorkdayCalendar,
    anchor: NaiveDate,
    options: SolveOptions,
    prior: &SolveResult,
    plan: &RecalcPlan,
    verbosity: u8,
) -> Result<SolveResult, SolveError> {
    let (forward, backward) = match plan {
        RecalcPlan::Full => return solver::solve(graph, calendar, anchor, options),
        RecalcPlan::Partial { forward, backward } => (forward, backward),
    };

    // A prior result from a differently-sized graph cannot be reused
    if prior.timings.len() != graph.len() {
        log_changes!(
            verbosity,
            "recalc: prior result does not match graph, running full solve"
        );
        return solver::solve(graph, calendar, anchor, options);
    }

    let anchor = calendar.snap_to_working_day(anchor)?;
    let mut timings = prior.timings.clone();

    let mut recomputed = 0usize;
    for &node in graph.topo_order() {
        if forward[node as usize] {
            let (es, ef) = compute_early(graph, calendar, node, &timings, anchor)?;
            timings[node as usize].earliest_start = es;
            timings[node as usize].earliest_finish = ef;
            recomputed += 1;
        }
    }
    log_changes!(
        verbosity,
        "recalc: forward pass recomputed {} of {} tasks",
        recomputed,
        graph.len()
    );

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

    if project_finish != prior.project_finish {
        // Every latest date hangs off the project finish; once it moves the
        // upstream closure no longer bounds the damage
        log_changes!(
            verbosity,
            "recalc: project finish moved {} -> {}, full backward pass",
            prior.project_finish,
            project_finish
        );
        for &node in graph.topo_order().iter().rev() {
            let (ls, lf) = compute_late(graph, calendar, node, &timings, project_finish)?;
            timings[node as usize].latest_start = ls;
            timings[node as usize].latest_finish = lf;
        }
    } else {
        for &node in graph.topo_order().iter().rev() {
            if backward[node as usize] {
                let (ls, lf) = compute_late(graph, calendar, node, &timings, project_finish)?;
                timings[node as usize].latest_start = ls;
                timings[node as usize].latest_finish = lf;
            }
        }
    }

    let warnings = infeasibility_warnings(graph, calendar, &timings);

    Ok(SolveResult {
        timings,
        project_finish,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::CalendarConfig;
    use crate::models::{DependencyKind, ScheduleItem, TaskDependency};
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

    /// Two chains sharing a finish milestone:
    /// a(5) -> b(3) -> done, c(2) -> done
    fn sample() -> (Vec<ScheduleItem>, Vec<TaskDependency>) {
        let mut tasks = vec![task("a", 5), task("b", 3), task("c", 2)];
        tasks.push(ScheduleItem::new_milestone("done", "done", date(2025, 1, 6)));
        let deps = vec![fs("a", "b"), fs("b", "done"), fs("c", "done")];
        (tasks, deps)
    }

    fn full_solve(tasks: &[ScheduleItem], deps: &[TaskDependency]) -> (ScheduleGraph, SolveResult) {
        let graph = ScheduleGraph::build(tasks, deps).unwrap();
        let result = solver::solve(
            &graph,
            &calendar(),
            date(2025, 1, 6),
            SolveOptions::default(),
        )
        .unwrap();
        (graph, result)
    }

    #[test]
    fn test_structural_edit_plans_full() {
        let (tasks, deps) = sample();
        let (graph, _) = full_solve(&tasks, &deps);
        assert_eq!(plan(&graph, &ScheduleEdit::StructureChanged), RecalcPlan::Full);
    }

    #[test]
    fn test_date_edit_plans_downstream_and_upstream_closures() {
        let (tasks, deps) = sample();
        let (graph, _) = full_solve(&tasks, &deps);

        let edit = ScheduleEdit::DatesEdited {
            task_ids: vec!["b".to_string()],
        };
        match plan(&graph, &edit) {
            RecalcPlan::Partial { forward, backward } => {
                let node = |id: &str| graph.node_of(id).unwrap() as usize;
                // Forward: b and everything after it
                assert!(forward[node("b")]);
                assert!(forward[node("done")]);
                assert!(!forward[node("a")]);
                assert!(!forward[node("c")]);
                // Backward: everything that can reach the forward set
                assert!(backward[node("a")]);
                assert!(backward[node("b")]);
                assert!(backward[node("c")]);
                assert!(backward[node("done")]);
            }
            RecalcPlan::Full => panic!("expected partial plan"),
        }
    }

    #[test]
    fn test_unknown_edited_task_falls_back_to_full() {
        let (tasks, deps) = sample();
        let (graph, _) = full_solve(&tasks, &deps);
        let edit = ScheduleEdit::DatesEdited {
            task_ids: vec!["ghost".to_string()],
        };
        assert_eq!(plan(&graph, &edit), RecalcPlan::Full);
    }

    #[test]
    fn test_partial_matches_full_solve_when_finish_unmoved() {
        let (mut tasks, deps) = sample();
        let (_, prior) = full_solve(&tasks, &deps);

        // Shorten c: finish still driven by the a -> b chain
        tasks[2].duration_days = 1;
        let (graph_after, oracle) = full_solve(&tasks, &deps);

        let edit = ScheduleEdit::DatesEdited {
            task_ids: vec!["c".to_string()],
        };
        let plan = plan(&graph_after, &edit);
        let result = recalculate(
            &graph_after,
            &calendar(),
            date(2025, 1, 6),
            SolveOptions::default(),
            &prior,
            &plan,
            0,
        )
        .unwrap();

        assert_eq!(result, oracle);
        assert_eq!(result.project_finish, prior.project_finish);
    }

    #[test]
    fn test_partial_matches_full_solve_when_finish_moves() {
        let (mut tasks, deps) = sample();
        let (_, prior) = full_solve(&tasks, &deps);

        // Lengthen b: project finish moves, backward pass must go full-width
        tasks[1].duration_days = 8;
        let (graph_after, oracle) = full_solve(&tasks, &deps);

        let edit = ScheduleEdit::DatesEdited {
            task_ids: vec!["b".to_string()],
        };
        let plan = plan(&graph_after, &edit);
        let result = recalculate(
            &graph_after,
            &calendar(),
            date(2025, 1, 6),
            SolveOptions::default(),
            &prior,
            &plan,
            0,
        )
        .unwrap();

        assert_eq!(result, oracle);
        assert_ne!(result.project_finish, prior.project_finish);
    }

    #[test]
    fn test_untouched_tasks_keep_prior_dates() {
        let (mut tasks, deps) = sample();
        let (graph_before, prior) = full_solve(&tasks, &deps);

        tasks[2].duration_days = 1; // edit c only
        let (graph_after, _) = full_solve(&tasks, &deps);

        let edit = ScheduleEdit::DatesEdited {
            task_ids: vec!["c".to_string()],
        };
        let result = recalculate(
            &graph_after,
            &calendar(),
            date(2025, 1, 6),
            SolveOptions::default(),
            &prior,
            &plan(&graph_after, &edit),
            0,
        )
        .unwrap();

        // a and b are outside the forward set (they are upstream of the
        // shared milestone), so their early dates must be carried over
        for id in ["a", "b"] {
            let before = prior.schedule(&graph_before, id).unwrap();
            let after = result.schedule(&graph_after, id).unwrap();
            assert_eq!(before.earliest_start, after.earliest_start);
            assert_eq!(before.earliest_finish, after.earliest_finish);
        }
    }

    #[test]
    fn test_mismatched_prior_falls_back_to_full() {
        let (tasks, deps) = sample();
        let (_, prior) = full_solve(&tasks, &deps);

        // New task set: one more node than the prior result knows about
        let mut grown = tasks.clone();
        grown.push(task("extra", 1));
        let graph_after = ScheduleGraph::build(&grown, &deps).unwrap();

        let edit = ScheduleEdit::DatesEdited {
            task_ids: vec!["extra".to_string()],
        };
        let result = recalculate(
            &graph_after,
            &calendar(),
            date(2025, 1, 6),
            SolveOptions::default(),
            &prior,
            &plan(&graph_after, &edit),
            0,
        )
        .unwrap();

        let oracle = solver::solve(
            &graph_after,
            &calendar(),
            date(2025, 1, 6),
            SolveOptions::default(),
        )
        .unwrap();
        assert_eq!(result, oracle);
    }
}
