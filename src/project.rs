use crate::allocation::{CapacityAllocator, MultiDayAllocationPlan};
use crate::calculations::{CpmResult, calculate_critical_path};
use crate::calculations::relations::finish_for;
use crate::calendar::{WorkCalendar, WorkCalendarConfig, add_days, inclusive_span};
use crate::config::{AllocationPolicy, EngineConfig};
use crate::error::{ScheduleError, ScheduleResult};
use crate::graph::TaskGraph;
use crate::metadata::ProjectMetadata;
use crate::propagation::{
    ValidationResult, apply_updates, audit_predecessor_conflicts, recalculate_tasks_in_cascade,
    validate_task_start_date,
};
use crate::resource::Resource;
use crate::task::{Dependency, DependencyType, Task, TaskUpdate};
use crate::task_validation;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshSummary {
    pub task_count: usize,
    pub scheduled_count: usize,
    pub critical_count: usize,
    pub critical_path: Vec<i32>,
    pub project_start: Option<NaiveDate>,
    pub project_finish: Option<NaiveDate>,
    pub project_duration_days: i64,
}

impl RefreshSummary {
    pub fn to_cli_summary(&self) -> String {
        let mut parts = Vec::new();
        parts.push(format!("tasks={}", self.task_count));
        if self.scheduled_count != self.task_count {
            parts.push(format!("scheduled={}", self.scheduled_count));
        }
        parts.push(format!("critical={}", self.critical_count));
        if let Some(date) = self.project_finish {
            parts.push(format!("finish={}", date));
        }
        if self.project_duration_days > 0 {
            parts.push(format!("days={}", self.project_duration_days));
        }
        if !self.critical_path.is_empty() {
            let chain = self
                .critical_path
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("->");
            parts.push(format!("crit_path={}", chain));
        }
        parts.join(", ")
    }
}

/// A project's tasks, their predecessor links and the calendar they run on.
#[derive(Debug, Clone, Default)]
pub struct Project {
    metadata: ProjectMetadata,
    calendar: WorkCalendar,
    allocation_policy: AllocationPolicy,
    tasks: Vec<Task>,
    dependencies: Vec<Dependency>,
}

impl Project {
    pub fn new(metadata: ProjectMetadata) -> Self {
        Self {
            metadata,
            ..Self::default()
        }
    }

    pub fn from_config(metadata: ProjectMetadata, config: &EngineConfig) -> ScheduleResult<Self> {
        config.allocation.validate()?;
        Ok(Self {
            metadata,
            calendar: config.work_calendar()?,
            allocation_policy: config.allocation.clone(),
            tasks: Vec::new(),
            dependencies: Vec::new(),
        })
    }

    /// Rebuild a project from stored parts, validating tasks and links.
    pub fn from_parts(
        metadata: ProjectMetadata,
        calendar: WorkCalendar,
        allocation_policy: AllocationPolicy,
        tasks: Vec<Task>,
        dependencies: Vec<Dependency>,
    ) -> ScheduleResult<Self> {
        task_validation::validate_task_collection(&tasks)?;
        task_validation::validate_dependencies(&tasks, &dependencies)?;
        TaskGraph::build(&tasks, &dependencies).topological_order()?;
        Ok(Self {
            metadata,
            calendar,
            allocation_policy,
            tasks,
            dependencies,
        })
    }

    pub fn metadata(&self) -> &ProjectMetadata {
        &self.metadata
    }

    pub fn set_metadata(&mut self, metadata: ProjectMetadata) {
        self.metadata = metadata;
    }

    pub fn calendar(&self) -> &WorkCalendar {
        &self.calendar
    }

    pub fn calendar_config(&self) -> WorkCalendarConfig {
        self.calendar.to_config()
    }

    pub fn set_calendar(&mut self, calendar: WorkCalendar) {
        self.calendar = calendar;
    }

    pub fn allocation_policy(&self) -> &AllocationPolicy {
        &self.allocation_policy
    }

    pub fn set_allocation_policy(&mut self, policy: AllocationPolicy) -> ScheduleResult<()> {
        policy.validate()?;
        self.allocation_policy = policy;
        Ok(())
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    pub fn task(&self, task_id: i32) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == task_id)
    }

    fn require_task(&self, task_id: i32) -> ScheduleResult<&Task> {
        self.task(task_id).ok_or(ScheduleError::TaskNotFound(task_id))
    }

    /// Insert a task or replace the one with the same id.
    pub fn upsert_task(&mut self, task: Task) -> ScheduleResult<()> {
        task_validation::validate_task(&task)?;
        match self.tasks.iter_mut().find(|existing| existing.id == task.id) {
            Some(existing) => *existing = task,
            None => self.tasks.push(task),
        }
        Ok(())
    }

    /// Remove a task together with every link that touches it.
    pub fn remove_task(&mut self, task_id: i32) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.id != task_id);
        if self.tasks.len() == before {
            return false;
        }
        self.dependencies
            .retain(|dep| dep.task_id != task_id && dep.predecessor_id != task_id);
        for task in &mut self.tasks {
            if task.parent_id == Some(task_id) {
                task.parent_id = None;
            }
        }
        true
    }

    /// Make `task_id` depend on `predecessor_id`.
    ///
    /// `lag` defaults to the predecessor's `lag_days`. An existing link between
    /// the same pair is replaced. Links that would close a cycle are rejected.
    pub fn link(
        &mut self,
        task_id: i32,
        predecessor_id: i32,
        dependency_type: DependencyType,
        lag: Option<i64>,
    ) -> ScheduleResult<Dependency> {
        let known: HashSet<i32> = self.tasks.iter().map(|task| task.id).collect();
        let lag_time = match lag {
            Some(lag) => lag,
            None => self.require_task(predecessor_id)?.lag_days,
        };
        let dependency = Dependency::new(task_id, predecessor_id, dependency_type, lag_time);
        task_validation::validate_dependency(&dependency, &known)?;

        let mut candidate: Vec<Dependency> = self
            .dependencies
            .iter()
            .filter(|dep| !(dep.task_id == task_id && dep.predecessor_id == predecessor_id))
            .cloned()
            .collect();
        candidate.push(dependency.clone());
        TaskGraph::build(&self.tasks, &candidate).topological_order()?;

        self.dependencies = candidate;
        Ok(dependency)
    }

    pub fn unlink(&mut self, task_id: i32, predecessor_id: i32) -> bool {
        let before = self.dependencies.len();
        self.dependencies
            .retain(|dep| !(dep.task_id == task_id && dep.predecessor_id == predecessor_id));
        self.dependencies.len() != before
    }

    pub fn graph(&self) -> TaskGraph {
        TaskGraph::build(&self.tasks, &self.dependencies)
    }

    pub fn critical_path(&self) -> ScheduleResult<CpmResult> {
        calculate_critical_path(
            &self.tasks,
            &self.dependencies,
            self.metadata.project_start_date,
        )
    }

    /// Recompute CPM and write `is_critical_path` onto the tasks.
    pub fn refresh(&mut self) -> ScheduleResult<RefreshSummary> {
        let result = self.critical_path()?;
        result.apply_to(&mut self.tasks);
        Ok(RefreshSummary {
            task_count: self.tasks.len(),
            scheduled_count: result.entries.len(),
            critical_count: result.critical_path.len(),
            critical_path: result.critical_path,
            project_start: result.project_start,
            project_finish: result.project_finish,
            project_duration_days: result.project_duration_days,
        })
    }

    pub fn validate_move(&self, task_id: i32, start: NaiveDate) -> ScheduleResult<ValidationResult> {
        let task = self.require_task(task_id)?;
        Ok(validate_task_start_date(
            task,
            start,
            &self.tasks,
            &self.dependencies,
        ))
    }

    /// Move a task to `start`, then cascade to everything downstream.
    ///
    /// The move is rejected with [`ScheduleError::Validation`] when a
    /// predecessor forbids it. Returns the move itself followed by the cascade
    /// updates; nothing is committed when any step fails.
    pub fn move_task(&mut self, task_id: i32, start: NaiveDate) -> ScheduleResult<Vec<TaskUpdate>> {
        self.validate_move(task_id, start)?.into_result()?;
        let task = self.require_task(task_id)?;
        let start_date = start;
        let end_date = finish_for(start, task.span_days())?;
        let own = TaskUpdate {
            id: task_id,
            start_date,
            end_date,
            changed: task.start_date != Some(start_date) || task.end_date != Some(end_date),
            reason: format!("moved to {start_date}"),
            caused_by: None,
        };

        let shifted = apply_updates(&self.tasks, std::slice::from_ref(&own));
        let cascade = recalculate_tasks_in_cascade(task_id, &shifted, &self.dependencies)?;
        self.tasks = apply_updates(&shifted, &cascade);

        tracing::debug!(
            task_id,
            start = %start_date,
            downstream = cascade.len(),
            "task moved"
        );
        let mut updates = Vec::with_capacity(cascade.len() + 1);
        updates.push(own);
        updates.extend(cascade);
        Ok(updates)
    }

    pub fn cascade_from(&self, task_id: i32) -> ScheduleResult<Vec<TaskUpdate>> {
        recalculate_tasks_in_cascade(task_id, &self.tasks, &self.dependencies)
    }

    pub fn audit(&self) -> Vec<TaskUpdate> {
        audit_predecessor_conflicts(&self.tasks, &self.dependencies)
    }

    /// Apply every audit finding. One pass; fixes are not cascaded.
    pub fn apply_audit(&mut self) -> Vec<TaskUpdate> {
        let updates = self.audit();
        self.apply(&updates);
        updates
    }

    pub fn apply(&mut self, updates: &[TaskUpdate]) {
        self.tasks = apply_updates(&self.tasks, updates);
    }

    /// Stretch every summary task over its children, widened by its margins.
    ///
    /// Deeper summaries are rolled up first so nested hierarchies settle in
    /// one call. Only parents whose dates change are reported; a parent whose
    /// margins push it out of the date range is left as is.
    pub fn rollup_parents(&mut self) -> Vec<TaskUpdate> {
        let parent_of: HashMap<i32, i32> = self
            .tasks
            .iter()
            .filter_map(|task| task.parent_id.map(|parent| (task.id, parent)))
            .collect();
        let mut parents: Vec<(usize, i32)> = parent_of
            .values()
            .copied()
            .collect::<HashSet<i32>>()
            .into_iter()
            .map(|id| (Self::depth(id, &parent_of, self.tasks.len()), id))
            .collect();
        parents.sort_unstable_by(|a, b| b.cmp(a));

        let mut updates = Vec::new();
        for (_, parent_id) in parents {
            let children = self
                .tasks
                .iter()
                .filter(|task| task.parent_id == Some(parent_id));
            let mut earliest: Option<NaiveDate> = None;
            let mut latest: Option<NaiveDate> = None;
            for child in children {
                if let (Some(start), Some(end)) = (child.start_date, child.end_date) {
                    earliest = Some(earliest.map_or(start, |current| current.min(start)));
                    latest = Some(latest.map_or(end, |current| current.max(end)));
                }
            }
            let (Some(earliest), Some(latest)) = (earliest, latest) else {
                continue;
            };
            let Some(parent) = self.tasks.iter_mut().find(|task| task.id == parent_id) else {
                continue;
            };
            let bounds = add_days(earliest, 0i64.saturating_sub(parent.margin_start))
                .and_then(|start| Ok((start, add_days(latest, parent.margin_end)?)));
            let (start, end) = match bounds {
                Ok(bounds) => bounds,
                Err(err) => {
                    tracing::warn!(task_id = parent_id, error = %err, "rollup skipped parent");
                    continue;
                }
            };
            if parent.start_date == Some(start) && parent.end_date == Some(end) {
                continue;
            }
            parent.start_date = Some(start);
            parent.end_date = Some(end);
            parent.duration = inclusive_span(start, end) as f64;
            updates.push(TaskUpdate {
                id: parent_id,
                start_date: start,
                end_date: end,
                reason: "rolled up from child tasks".to_string(),
                caused_by: None,
                changed: true,
            });
        }
        updates
    }

    fn depth(task_id: i32, parent_of: &HashMap<i32, i32>, limit: usize) -> usize {
        let mut depth = 0;
        let mut current = task_id;
        while let Some(&parent) = parent_of.get(&current) {
            depth += 1;
            if depth > limit {
                break;
            }
            current = parent;
        }
        depth
    }

    pub fn allocator(&self) -> CapacityAllocator {
        CapacityAllocator::new(self.calendar.clone(), self.allocation_policy.clone())
    }

    pub fn plan_allocation(
        &self,
        total_minutes: u32,
        resource: &Resource,
        start_date: NaiveDate,
        existing: &BTreeMap<NaiveDate, u32>,
        use_overtime_by_default: bool,
    ) -> ScheduleResult<MultiDayAllocationPlan> {
        self.allocator().plan(
            total_minutes,
            resource,
            start_date,
            existing,
            use_overtime_by_default,
        )
    }
}
