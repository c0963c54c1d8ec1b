use crate::error::{ScheduleError, ScheduleResult};
use serde::{Deserialize, Serialize};

/// A capacity-limited resource (person, crew, machine) that consumes work-minutes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Identifier for the resource. This can be a person id, crew name, or equipment tag.
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Normal working minutes available per working day.
    pub daily_capacity_minutes: u32,
    /// Cost per hour of normal time. Must be finite and non-negative.
    #[serde(default)]
    pub hourly_rate: f64,
}

impl Resource {
    pub fn new(id: impl Into<String>, daily_capacity_minutes: u32, hourly_rate: f64) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            daily_capacity_minutes,
            hourly_rate,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn validate(&self) -> ScheduleResult<()> {
        if self.daily_capacity_minutes == 0 {
            return Err(ScheduleError::InvalidResource(format!(
                "resource '{}' has no daily capacity",
                self.id
            )));
        }
        if !self.hourly_rate.is_finite() || self.hourly_rate < 0.0 {
            return Err(ScheduleError::InvalidResource(format!(
                "resource '{}' has invalid hourly rate {}",
                self.id, self.hourly_rate
            )));
        }
        Ok(())
    }

    /// Cost of `minutes` of work at `multiplier` times the base rate.
    pub fn cost_of(&self, minutes: u32, multiplier: f64) -> f64 {
        f64::from(minutes) * self.hourly_rate / 60.0 * multiplier
    }
}
