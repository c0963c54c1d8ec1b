use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex};

/// What the planner did with one evaluated day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayDecision {
    /// Remaining minutes fit in normal capacity.
    Fits,
    /// Normal capacity filled, overflow deferred to the next day.
    PushedToNextDay,
    /// Normal capacity filled, overflow absorbed as overtime.
    AcceptedOvertime,
}

impl DayDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            DayDecision::Fits => "fits",
            DayDecision::PushedToNextDay => "pushed_to_next_day",
            DayDecision::AcceptedOvertime => "accepted_overtime",
        }
    }
}

impl fmt::Display for DayDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One day decision, as reported to a [`PlanObserver`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanEvent {
    /// Zero-based index among evaluated days.
    pub day_index: usize,
    pub date: NaiveDate,
    pub decision: DayDecision,
    pub normal_minutes: u32,
    pub overtime_minutes: u32,
    pub remaining_minutes: u32,
}

/// Receives every day decision the planner takes.
pub trait PlanObserver: Send + Sync {
    fn on_day(&self, event: &PlanEvent);
}

/// Forwards plan events to `tracing` at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl PlanObserver for TracingObserver {
    fn on_day(&self, event: &PlanEvent) {
        tracing::debug!(
            day_index = event.day_index,
            date = %event.date,
            decision = %event.decision,
            normal_minutes = event.normal_minutes,
            overtime_minutes = event.overtime_minutes,
            remaining_minutes = event.remaining_minutes,
            "allocation day"
        );
    }
}

/// Keeps every event in memory. Handy for tests and for explaining a plan.
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    events: Arc<Mutex<Vec<PlanEvent>>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PlanEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl PlanObserver for RecordingObserver {
    fn on_day(&self, event: &PlanEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
    }
}
