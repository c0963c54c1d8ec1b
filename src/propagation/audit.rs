use super::binding_constraint;
use crate::calculations::relations::finish_for;
use crate::graph::TaskGraph;
use crate::task::{Dependency, Task, TaskUpdate};
use std::collections::HashMap;

/// Flag every task whose recorded start is earlier than its predecessors allow.
///
/// Each flagged task gets one update carrying the most restrictive implied
/// start. Tasks starting on or after that date are not reported; surplus
/// float is a CPM concern. This is a single pass over recorded dates and does
/// not cascade the proposed fixes. A task whose implied dates fall outside
/// the supported range is skipped with a warning.
pub fn audit_predecessor_conflicts(tasks: &[Task], dependencies: &[Dependency]) -> Vec<TaskUpdate> {
    let graph = TaskGraph::build(tasks, dependencies);
    let lookup: HashMap<i32, Task> = tasks
        .iter()
        .map(|task| (task.id, task.clone()))
        .collect();

    let mut conflicts = Vec::new();
    for task in tasks {
        let Some(recorded_start) = task.start_date else {
            continue;
        };
        let incoming = graph.incoming(task.id);
        if incoming.is_empty() {
            continue;
        }
        let (implied, blocking_id) = match binding_constraint(task, &incoming, &lookup) {
            Ok(Some(found)) => found,
            Ok(None) => continue,
            Err(err) => {
                tracing::warn!(task_id = task.id, error = %err, "audit skipped task");
                continue;
            }
        };
        if recorded_start >= implied {
            continue;
        }
        let end_date = match finish_for(implied, task.span_days()) {
            Ok(end) => end,
            Err(err) => {
                tracing::warn!(task_id = task.id, error = %err, "audit skipped task");
                continue;
            }
        };

        let blocking_name = lookup
            .get(&blocking_id)
            .map(|pred| pred.name.as_str())
            .unwrap_or_default();
        tracing::debug!(
            task_id = task.id,
            blocking_id,
            recorded = %recorded_start,
            implied = %implied,
            "predecessor conflict"
        );
        conflicts.push(TaskUpdate {
            id: task.id,
            start_date: implied,
            end_date,
            reason: format!(
                "starts {recorded_start} but predecessor '{blocking_name}' (#{blocking_id}) allows {implied} at the earliest"
            ),
            caused_by: Some(blocking_id),
            changed: true,
        });
    }
    conflicts
}
