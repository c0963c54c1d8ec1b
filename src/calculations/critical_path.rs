use crate::calculations::backward_pass::BackwardPass;
use crate::calculations::forward_pass::ForwardPass;
use crate::calendar::{days_between, inclusive_span};
use crate::error::{ScheduleError, ScheduleResult};
use crate::graph::TaskGraph;
use crate::task::{Dependency, Task};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// CPM figures for one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpmEntry {
    pub task_id: i32,
    pub early_start: NaiveDate,
    pub early_finish: NaiveDate,
    pub late_start: NaiveDate,
    pub late_finish: NaiveDate,
    pub total_slack: i64,
    pub free_slack: i64,
    pub is_critical: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CpmResult {
    pub entries: BTreeMap<i32, CpmEntry>,
    /// Critical task ids, predecessor-first.
    pub critical_path: Vec<i32>,
    pub project_start: Option<NaiveDate>,
    pub project_finish: Option<NaiveDate>,
    pub project_duration_days: i64,
}

impl CpmResult {
    pub fn entry(&self, task_id: i32) -> Option<&CpmEntry> {
        self.entries.get(&task_id)
    }

    pub fn is_critical(&self, task_id: i32) -> bool {
        self.entries
            .get(&task_id)
            .is_some_and(|entry| entry.is_critical)
    }

    /// Write `is_critical_path` onto the given tasks. Tasks that did not take
    /// part in the calculation are cleared.
    pub fn apply_to(&self, tasks: &mut [Task]) {
        for task in tasks {
            task.is_critical_path = self.is_critical(task.id);
        }
    }
}

/// Run the forward and backward passes over every task that has both a start
/// and an end date.
///
/// `project_start` defaults to the earliest start among tasks without
/// predecessors. A cyclic predecessor graph yields
/// [`ScheduleError::CycleDetected`].
pub fn calculate_critical_path(
    tasks: &[Task],
    dependencies: &[Dependency],
    project_start: Option<NaiveDate>,
) -> ScheduleResult<CpmResult> {
    let graph = TaskGraph::build_filtered(tasks, dependencies, Task::is_scheduled);
    if graph.node_count() == 0 {
        return Ok(CpmResult {
            project_start,
            ..CpmResult::default()
        });
    }

    // First task per id, as in the graph
    let mut by_id: HashMap<i32, &Task> = HashMap::with_capacity(graph.node_count());
    for task in tasks
        .iter()
        .filter(|task| task.is_scheduled() && graph.contains(task.id))
    {
        by_id.entry(task.id).or_insert(task);
    }

    let order = graph.topological_order()?;
    let early = ForwardPass::new(&graph, &by_id).execute(&order)?;
    let late = BackwardPass::new(&graph, &by_id).execute(&order, &early)?;

    let mut entries = BTreeMap::new();
    let mut critical_path = Vec::new();
    for &task_id in &order {
        let (early_start, early_finish) = early[&task_id];
        let (late_start, late_finish) = late[&task_id];
        let total_slack = days_between(early_start, late_start);

        let free_slack = graph
            .successors(task_id)
            .iter()
            .filter_map(|succ_id| early.get(succ_id).map(|&(es, _)| es))
            .min()
            .map(|earliest| days_between(early_finish, earliest) - 1)
            .unwrap_or(total_slack);

        let is_critical = total_slack <= 0;
        if is_critical {
            critical_path.push(task_id);
        }

        entries.insert(
            task_id,
            CpmEntry {
                task_id,
                early_start,
                early_finish,
                late_start,
                late_finish,
                total_slack,
                free_slack,
                is_critical,
            },
        );
    }

    let project_start = match project_start {
        Some(date) => Some(date),
        None => graph
            .roots()
            .iter()
            .filter_map(|id| by_id.get(id).and_then(|task| task.start_date))
            .min(),
    };
    let project_finish = entries.values().map(|entry| entry.early_finish).max();
    let project_duration_days = match (project_start, project_finish) {
        (Some(start), Some(finish)) => inclusive_span(start, finish),
        _ => 0,
    };

    tracing::debug!(
        tasks = entries.len(),
        critical = critical_path.len(),
        project_duration_days,
        "critical path calculated"
    );

    Ok(CpmResult {
        entries,
        critical_path,
        project_start,
        project_finish,
        project_duration_days,
    })
}

/// Like [`calculate_critical_path`] but fails when the requested task cannot
/// take part because it lacks dates.
pub fn critical_path_entry(
    task_id: i32,
    tasks: &[Task],
    dependencies: &[Dependency],
) -> ScheduleResult<CpmEntry> {
    let task = tasks
        .iter()
        .find(|task| task.id == task_id)
        .ok_or(ScheduleError::TaskNotFound(task_id))?;
    if task.start_date.is_none() {
        return Err(ScheduleError::MissingDate {
            task_id,
            field: "start",
        });
    }
    if task.end_date.is_none() {
        return Err(ScheduleError::MissingDate {
            task_id,
            field: "end",
        });
    }
    let result = calculate_critical_path(tasks, dependencies, None)?;
    result
        .entries
        .get(&task_id)
        .cloned()
        .ok_or(ScheduleError::TaskNotFound(task_id))
}
