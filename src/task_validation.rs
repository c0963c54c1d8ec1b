use crate::calendar::inclusive_span;
use crate::error::{ScheduleError, ScheduleResult};
use crate::task::{Dependency, Task};
use std::collections::HashSet;

fn invalid(task: &Task, message: impl Into<String>) -> ScheduleError {
    ScheduleError::InvalidTask {
        task_id: task.id,
        message: message.into(),
    }
}

pub fn validate_task(task: &Task) -> ScheduleResult<()> {
    if !task.duration.is_finite() || task.duration < 0.0 {
        return Err(invalid(
            task,
            format!("duration {} must be a finite number >= 0", task.duration),
        ));
    }

    if let (Some(start), Some(end)) = (task.start_date, task.end_date) {
        if end < start {
            return Err(invalid(
                task,
                format!("end date {end} precedes start date {start}"),
            ));
        }
        let span = inclusive_span(start, end);
        if task.is_milestone() {
            if span != 1 {
                return Err(invalid(task, "milestone must start and end on the same day"));
            }
        } else if (task.duration.ceil() as i64) != span {
            return Err(invalid(
                task,
                format!(
                    "duration {} does not match the {span} days between {start} and {end}",
                    task.duration
                ),
            ));
        }
    }

    Ok(())
}

pub fn validate_task_collection(tasks: &[Task]) -> ScheduleResult<()> {
    let mut seen_ids = HashSet::with_capacity(tasks.len());
    for task in tasks {
        if !seen_ids.insert(task.id) {
            return Err(ScheduleError::DuplicateTask(task.id));
        }
        validate_task(task)?;
    }
    Ok(())
}

/// Rejects self-links and links touching a task outside `known`.
pub fn validate_dependency(dependency: &Dependency, known: &HashSet<i32>) -> ScheduleResult<()> {
    if dependency.task_id == dependency.predecessor_id {
        return Err(ScheduleError::SelfDependency(dependency.task_id));
    }
    for id in [dependency.task_id, dependency.predecessor_id] {
        if !known.contains(&id) {
            return Err(ScheduleError::TaskNotFound(id));
        }
    }
    Ok(())
}

pub fn validate_dependencies(tasks: &[Task], dependencies: &[Dependency]) -> ScheduleResult<()> {
    let known: HashSet<i32> = tasks.iter().map(|task| task.id).collect();
    dependencies
        .iter()
        .try_for_each(|dependency| validate_dependency(dependency, &known))
}
