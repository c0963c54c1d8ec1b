use crate::calculations::relations::{implied_late_finish, start_for};
use crate::error::{ScheduleError, ScheduleResult};
use crate::graph::TaskGraph;
use crate::task::Task;
use chrono::NaiveDate;
use std::collections::HashMap;

pub struct BackwardPass<'a> {
    graph: &'a TaskGraph,
    tasks: &'a HashMap<i32, &'a Task>,
}

impl<'a> BackwardPass<'a> {
    pub fn new(graph: &'a TaskGraph, tasks: &'a HashMap<i32, &'a Task>) -> Self {
        Self { graph, tasks }
    }

    /// Late start/finish per task. `order` is the forward (predecessor-first)
    /// order; it is walked in reverse.
    pub fn execute(
        &self,
        order: &[i32],
        early: &HashMap<i32, (NaiveDate, NaiveDate)>,
    ) -> ScheduleResult<HashMap<i32, (NaiveDate, NaiveDate)>> {
        let mut results: HashMap<i32, (NaiveDate, NaiveDate)> = HashMap::with_capacity(order.len());

        for &task_id in order.iter().rev() {
            let task = self
                .tasks
                .get(&task_id)
                .ok_or(ScheduleError::TaskNotFound(task_id))?;
            let span = task.span_days();
            let &(_, early_finish) = early.get(&task_id).ok_or(ScheduleError::MissingDate {
                task_id,
                field: "early finish",
            })?;

            let outgoing = self.graph.outgoing(task_id);
            let late_finish = if outgoing.is_empty() {
                early_finish
            } else {
                let mut candidate: Option<NaiveDate> = None;
                for (succ_id, link) in &outgoing {
                    let Some(&(ls, lf)) = results.get(succ_id) else {
                        continue;
                    };
                    let implied =
                        implied_late_finish(link.dependency_type, ls, lf, span, link.lag_time)?;
                    candidate = Some(candidate.map_or(implied, |current| current.min(implied)));
                }
                candidate.unwrap_or(early_finish)
            };

            results.insert(task_id, (start_for(late_finish, span)?, late_finish));
        }

        Ok(results)
    }
}
