use super::binding_constraint;
use crate::calculations::relations::finish_for;
use crate::error::{ScheduleError, ScheduleResult};
use crate::graph::TaskGraph;
use crate::task::{Dependency, Task, TaskUpdate};
use std::collections::{HashMap, HashSet};

/// Recompute the dates of everything downstream of `changed_task_id`.
///
/// Tasks are visited level by level in predecessor-first order over the set
/// reachable from the changed task, on a private copy of `tasks`. Each visited
/// dependent is re-anchored on the recorded dates of its predecessors (the
/// most restrictive one wins) and gets exactly one entry in the result, even
/// when its dates did not move, so callers can confirm the whole chain.
///
/// Fails when the changed task is unknown or lacks dates, when a cycle is
/// reachable from it, or when a lag pushes a date out of range.
pub fn recalculate_tasks_in_cascade(
    changed_task_id: i32,
    tasks: &[Task],
    dependencies: &[Dependency],
) -> ScheduleResult<Vec<TaskUpdate>> {
    let changed = tasks
        .iter()
        .find(|task| task.id == changed_task_id)
        .ok_or(ScheduleError::TaskNotFound(changed_task_id))?;
    if changed.start_date.is_none() {
        return Err(ScheduleError::MissingDate {
            task_id: changed_task_id,
            field: "start",
        });
    }
    if changed.end_date.is_none() {
        return Err(ScheduleError::MissingDate {
            task_id: changed_task_id,
            field: "end",
        });
    }

    let graph = TaskGraph::build(tasks, dependencies);
    let mut scope = vec![changed_task_id];
    scope.extend(graph.reachable_from(changed_task_id));
    let order = graph.topological_order_within(&scope)?;

    let original: HashMap<i32, &Task> = tasks.iter().map(|task| (task.id, task)).collect();
    let mut working: HashMap<i32, Task> = tasks
        .iter()
        .map(|task| (task.id, task.clone()))
        .collect();

    let mut updates: Vec<TaskUpdate> = Vec::new();
    let mut slots: HashMap<i32, usize> = HashMap::new();

    for (hop, source_id) in order.into_iter().enumerate() {
        let Some(source) = working.get(&source_id).cloned() else {
            continue;
        };
        if !source.is_scheduled() {
            tracing::debug!(task_id = source_id, "cascade skips undated task");
            continue;
        }

        let mut seen = HashSet::new();
        for (dependent_id, _) in graph.outgoing(source_id) {
            if !seen.insert(dependent_id) {
                continue;
            }
            let Some(dependent) = working.get(&dependent_id) else {
                continue;
            };
            let incoming = graph.incoming(dependent_id);
            let Some((start, _)) = binding_constraint(dependent, &incoming, &working)? else {
                continue;
            };
            let end = finish_for(start, dependent.span_days())?;

            let before = original[&dependent_id];
            let update = TaskUpdate {
                id: dependent_id,
                start_date: start,
                end_date: end,
                reason: format!(
                    "rescheduled after predecessor '{}' (#{})",
                    source.name, source.id
                ),
                caused_by: Some(source.id),
                changed: before.start_date != Some(start) || before.end_date != Some(end),
            };
            tracing::debug!(
                hop,
                task_id = dependent_id,
                caused_by = source.id,
                start = %start,
                changed = update.changed,
                "cascade step"
            );

            let shifted = dependent.shifted_to(start)?;
            working.insert(dependent_id, shifted);
            match slots.get(&dependent_id) {
                Some(&slot) => updates[slot] = update,
                None => {
                    slots.insert(dependent_id, updates.len());
                    updates.push(update);
                }
            }
        }
    }

    Ok(updates)
}
