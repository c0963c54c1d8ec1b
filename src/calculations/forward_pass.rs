use crate::calculations::relations::{finish_for, implied_start};
use crate::error::{ScheduleError, ScheduleResult};
use crate::graph::TaskGraph;
use crate::task::Task;
use chrono::NaiveDate;
use std::collections::HashMap;

pub struct ForwardPass<'a> {
    graph: &'a TaskGraph,
    tasks: &'a HashMap<i32, &'a Task>,
}

impl<'a> ForwardPass<'a> {
    pub fn new(graph: &'a TaskGraph, tasks: &'a HashMap<i32, &'a Task>) -> Self {
        Self { graph, tasks }
    }

    /// Early start/finish per task. `order` must be predecessor-first.
    pub fn execute(&self, order: &[i32]) -> ScheduleResult<HashMap<i32, (NaiveDate, NaiveDate)>> {
        let mut results: HashMap<i32, (NaiveDate, NaiveDate)> = HashMap::with_capacity(order.len());

        for &task_id in order {
            let task = self
                .tasks
                .get(&task_id)
                .ok_or(ScheduleError::TaskNotFound(task_id))?;
            let span = task.span_days();

            let incoming = self.graph.incoming(task_id);
            let early_start = if incoming.is_empty() {
                task.start_date.ok_or(ScheduleError::MissingDate {
                    task_id,
                    field: "start",
                })?
            } else {
                // Most restrictive candidate wins
                let mut candidate: Option<NaiveDate> = None;
                for (pred_id, link) in &incoming {
                    let Some(&(es, ef)) = results.get(pred_id) else {
                        continue;
                    };
                    let implied = implied_start(link.dependency_type, es, ef, span, link.lag_time)?;
                    candidate = Some(candidate.map_or(implied, |current| current.max(implied)));
                }
                candidate.ok_or(ScheduleError::CycleDetected {
                    task_ids: vec![task_id],
                })?
            };

            let early_finish = finish_for(early_start, span)?;
            results.insert(task_id, (early_start, early_finish));
        }

        Ok(results)
    }
}
