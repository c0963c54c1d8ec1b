use crate::calendar::{add_days, inclusive_span};
use crate::error::ScheduleResult;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i32,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    /// Working length in days. Fractional values are allowed; zero marks a milestone.
    pub duration: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i32>,
    #[serde(default)]
    pub is_critical_path: bool,
    /// Days of buffer kept before the earliest child when rolling up a summary task.
    #[serde(default)]
    pub margin_start: i64,
    /// Days of buffer kept after the latest child when rolling up a summary task.
    #[serde(default)]
    pub margin_end: i64,
    /// Default lag for dependencies created from this task as predecessor.
    #[serde(default)]
    pub lag_days: i64,
}

impl Task {
    pub fn new(id: i32, name: impl Into<String>, duration: f64) -> Self {
        Self {
            id,
            name: name.into(),
            start_date: None,
            end_date: None,
            duration,
            parent_id: None,
            is_critical_path: false,
            margin_start: 0,
            margin_end: 0,
            lag_days: 0,
        }
    }

    /// Build a task whose dates cover `start..=end` with a matching duration.
    pub fn scheduled(id: i32, name: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        let mut task = Self::new(id, name, inclusive_span(start, end) as f64);
        task.start_date = Some(start);
        task.end_date = Some(end);
        task
    }

    pub fn milestone(id: i32, name: impl Into<String>, date: NaiveDate) -> Self {
        let mut task = Self::new(id, name, 0.0);
        task.start_date = Some(date);
        task.end_date = Some(date);
        task
    }

    pub fn is_milestone(&self) -> bool {
        self.duration == 0.0
    }

    pub fn is_scheduled(&self) -> bool {
        self.start_date.is_some() && self.end_date.is_some()
    }

    /// Whole calendar days the task occupies; milestones occupy their single day.
    pub fn span_days(&self) -> i64 {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => inclusive_span(start, end).max(1),
            _ => (self.duration.ceil() as i64).max(1),
        }
    }

    /// Copy of the task moved to `start`, keeping its span.
    pub fn shifted_to(&self, start: NaiveDate) -> ScheduleResult<Self> {
        let mut task = self.clone();
        let span = self.span_days();
        task.start_date = Some(start);
        task.end_date = Some(add_days(start, span.saturating_sub(1))?);
        Ok(task)
    }
}

/// How one task's dates constrain its dependent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyType {
    #[default]
    FinishToStart,
    StartToStart,
    FinishToFinish,
    StartToFinish,
}

impl DependencyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyType::FinishToStart => "finish_to_start",
            DependencyType::StartToStart => "start_to_start",
            DependencyType::FinishToFinish => "finish_to_finish",
            DependencyType::StartToFinish => "start_to_finish",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DependencyType::FinishToStart => "finish-to-start",
            DependencyType::StartToStart => "start-to-start",
            DependencyType::FinishToFinish => "finish-to-finish",
            DependencyType::StartToFinish => "start-to-finish",
        }
    }
}

impl fmt::Display for DependencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DependencyType {
    type Err = String;

    /// Accepts the snake_case names as well as the short `fs`/`ss`/`ff`/`sf` codes.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "finish_to_start" | "fs" => Ok(DependencyType::FinishToStart),
            "start_to_start" | "ss" => Ok(DependencyType::StartToStart),
            "finish_to_finish" | "ff" => Ok(DependencyType::FinishToFinish),
            "start_to_finish" | "sf" => Ok(DependencyType::StartToFinish),
            other => Err(format!("unknown dependency type '{other}'")),
        }
    }
}

/// Directed predecessor edge: `task_id` depends on `predecessor_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub task_id: i32,
    pub predecessor_id: i32,
    #[serde(default, rename = "type")]
    pub dependency_type: DependencyType,
    /// Signed day offset on top of the relation.
    #[serde(default)]
    pub lag_time: i64,
}

impl Dependency {
    pub fn new(
        task_id: i32,
        predecessor_id: i32,
        dependency_type: DependencyType,
        lag_time: i64,
    ) -> Self {
        Self {
            task_id,
            predecessor_id,
            dependency_type,
            lag_time,
        }
    }

    pub fn finish_to_start(task_id: i32, predecessor_id: i32) -> Self {
        Self::new(task_id, predecessor_id, DependencyType::FinishToStart, 0)
    }
}

/// Proposed new dates for one task, produced by cascade, audit or roll-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskUpdate {
    pub id: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
    /// Upstream task that triggered the update, when there is one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caused_by: Option<i32>,
    /// False when the computed dates equal what the task already had.
    pub changed: bool,
}
