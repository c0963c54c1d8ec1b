use super::implied_start_from;
use crate::calendar::days_between;
use crate::error::{ScheduleError, ScheduleResult};
use crate::graph::TaskGraph;
use crate::task::{Dependency, Task};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Outcome of checking a proposed start against a task's predecessors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub task_id: i32,
    pub is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Earliest start all predecessors allow, when any of them has dates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_start: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocking_predecessor: Option<i32>,
}

impl ValidationResult {
    fn valid(task_id: i32, minimum_start: Option<NaiveDate>) -> Self {
        Self {
            task_id,
            is_valid: true,
            message: None,
            minimum_start,
            blocking_predecessor: None,
        }
    }

    pub fn into_result(self) -> ScheduleResult<()> {
        if self.is_valid {
            return Ok(());
        }
        Err(ScheduleError::Validation {
            task_id: self.task_id,
            message: self
                .message
                .unwrap_or_else(|| "violates a predecessor constraint".to_string()),
        })
    }
}

/// Check whether `task` may start on `proposed_start`.
///
/// Never fails: predecessors without dates are ignored, and a violation (or a
/// lag that leaves the supported date range) is reported through the result.
/// When several predecessors are violated the most restrictive one is named.
pub fn validate_task_start_date(
    task: &Task,
    proposed_start: NaiveDate,
    tasks: &[Task],
    dependencies: &[Dependency],
) -> ValidationResult {
    let graph = TaskGraph::build(tasks, dependencies);
    let lookup: HashMap<i32, &Task> = tasks.iter().map(|t| (t.id, t)).collect();

    let mut minimum: Option<NaiveDate> = None;
    let mut worst: Option<(NaiveDate, &Task, &'static str)> = None;
    for (pred_id, link) in graph.incoming(task.id) {
        let Some(&predecessor) = lookup.get(&pred_id) else {
            continue;
        };
        let implied = match implied_start_from(task, predecessor, &link) {
            Ok(Some(implied)) => implied,
            Ok(None) => continue,
            Err(err) => {
                return ValidationResult {
                    task_id: task.id,
                    is_valid: false,
                    message: Some(format!(
                        "'{}' cannot be checked against predecessor '{}' (#{}): {err}",
                        task.name, predecessor.name, predecessor.id
                    )),
                    minimum_start: None,
                    blocking_predecessor: Some(predecessor.id),
                };
            }
        };
        minimum = Some(minimum.map_or(implied, |current| current.max(implied)));
        if proposed_start < implied && worst.is_none_or(|(current, _, _)| implied > current) {
            worst = Some((implied, predecessor, link.dependency_type.label()));
        }
    }

    let Some((implied, predecessor, relation)) = worst else {
        return ValidationResult::valid(task.id, minimum);
    };

    let shortfall = days_between(proposed_start, implied);
    let unit = if shortfall == 1 { "day" } else { "days" };
    ValidationResult {
        task_id: task.id,
        is_valid: false,
        message: Some(format!(
            "'{}' cannot start on {proposed_start}: {relation} predecessor '{}' (#{}) requires {implied} or later; move it at least {shortfall} {unit} later",
            task.name, predecessor.name, predecessor.id
        )),
        minimum_start: minimum,
        blocking_predecessor: Some(predecessor.id),
    }
}
