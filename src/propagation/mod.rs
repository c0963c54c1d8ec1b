//! Keeping recorded task dates consistent with their predecessor relations.
//!
//! Unlike CPM, everything here is anchored on the dates tasks actually carry,
//! not on derived early/late dates.

pub mod audit;
pub mod cascade;
pub mod validation;

pub use audit::audit_predecessor_conflicts;
pub use cascade::recalculate_tasks_in_cascade;
pub use validation::{ValidationResult, validate_task_start_date};

use crate::calculations::relations::implied_start;
use crate::error::ScheduleResult;
use crate::graph::EdgeLink;
use crate::task::{Task, TaskUpdate};
use chrono::NaiveDate;
use std::collections::HashMap;

/// Earliest start `dependent` may take because of `predecessor`, or `None`
/// when the predecessor has no recorded dates to anchor on.
pub(crate) fn implied_start_from(
    dependent: &Task,
    predecessor: &Task,
    link: &EdgeLink,
) -> ScheduleResult<Option<NaiveDate>> {
    let (Some(start), Some(finish)) = (predecessor.start_date, predecessor.end_date) else {
        return Ok(None);
    };
    implied_start(
        link.dependency_type,
        start,
        finish,
        dependent.span_days(),
        link.lag_time,
    )
    .map(Some)
}

/// Most restrictive implied start over `incoming`, with the predecessor that
/// imposes it. Ties keep the first edge.
pub(crate) fn binding_constraint<'a, I>(
    dependent: &Task,
    incoming: I,
    lookup: &HashMap<i32, Task>,
) -> ScheduleResult<Option<(NaiveDate, i32)>>
where
    I: IntoIterator<Item = &'a (i32, EdgeLink)>,
{
    let mut best: Option<(NaiveDate, i32)> = None;
    for (pred_id, link) in incoming {
        let Some(predecessor) = lookup.get(pred_id) else {
            continue;
        };
        let Some(candidate) = implied_start_from(dependent, predecessor, link)? else {
            continue;
        };
        if best.is_none_or(|(current, _)| candidate > current) {
            best = Some((candidate, *pred_id));
        }
    }
    Ok(best)
}

/// Copies of `tasks` with `updates` applied. Later updates for the same task win.
pub fn apply_updates(tasks: &[Task], updates: &[TaskUpdate]) -> Vec<Task> {
    let latest: HashMap<i32, &TaskUpdate> = updates.iter().map(|update| (update.id, update)).collect();
    tasks
        .iter()
        .map(|task| match latest.get(&task.id) {
            Some(update) => {
                let mut patched = task.clone();
                patched.start_date = Some(update.start_date);
                patched.end_date = Some(update.end_date);
                patched
            }
            None => task.clone(),
        })
        .collect()
}
