use chrono::NaiveDate;
use thiserror::Error;

pub type ScheduleResult<T> = Result<T, ScheduleError>;

/// Failures raised by the scheduling and allocation engine.
///
/// Expected business outcomes (an empty critical path, an allocation that
/// needs a human decision, a rejected drag) are never reported here; they are
/// part of the normal result types.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScheduleError {
    #[error("invalid date '{input}' (expected YYYY-MM-DD)")]
    UnparseableDate { input: String },

    #[error("task {task_id} has no {field} date")]
    MissingDate { task_id: i32, field: &'static str },

    #[error("{date} shifted by {days} days falls outside the supported date range")]
    DateOutOfRange { date: NaiveDate, days: i64 },

    #[error("predecessor graph contains a cycle through tasks {task_ids:?}")]
    CycleDetected { task_ids: Vec<i32> },

    #[error(
        "allocation still has {remaining_minutes} minutes unplaced after {iterations} days"
    )]
    OverflowUnresolved {
        remaining_minutes: u32,
        iterations: usize,
    },

    #[error("no overflow decision is pending")]
    NoPendingDecision,

    #[error("task {task_id}: {message}")]
    Validation { task_id: i32, message: String },

    #[error("task {0} not found")]
    TaskNotFound(i32),

    #[error("duplicate task id {0}")]
    DuplicateTask(i32),

    #[error("task {0} cannot be its own predecessor")]
    SelfDependency(i32),

    #[error("task {task_id} is invalid: {message}")]
    InvalidTask { task_id: i32, message: String },

    #[error("invalid resource: {0}")]
    InvalidResource(String),

    #[error("invalid calendar: {0}")]
    InvalidCalendar(String),

    #[error("invalid allocation policy: {0}")]
    InvalidPolicy(String),

    #[error("invalid allocation: {0}")]
    InvalidAllocation(String),
}

impl ScheduleError {
    /// True for the date-related variants.
    pub fn is_invalid_date(&self) -> bool {
        matches!(
            self,
            ScheduleError::UnparseableDate { .. }
                | ScheduleError::MissingDate { .. }
                | ScheduleError::DateOutOfRange { .. }
        )
    }
}
