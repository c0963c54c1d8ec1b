//! Engine configuration.
//!
//! Stored as JSON. Every section and field falls back to its default when
//! absent, so an empty object is a valid configuration.

use crate::calendar::{WorkCalendar, WorkCalendarConfig};
use crate::error::{ScheduleError, ScheduleResult};
use crate::persistence::PersistenceResult;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Working week and holidays
    #[serde(default)]
    pub calendar: WorkCalendarConfig,

    /// Overtime rules for the capacity allocator
    #[serde(default)]
    pub allocation: AllocationPolicy,
}

/// Overtime rules applied by the capacity allocator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationPolicy {
    /// Most overtime a working day may absorb, in minutes
    #[serde(default = "default_weekday_overtime_cap")]
    pub weekday_overtime_cap_minutes: u32,

    /// Cost factor for overtime on a working day
    #[serde(default = "default_weekday_multiplier")]
    pub weekday_overtime_multiplier: f64,

    /// Cost factor for any work on a weekend or holiday
    #[serde(default = "default_weekend_multiplier")]
    pub weekend_overtime_multiplier: f64,

    /// Days evaluated before a plan gives up
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

fn default_weekday_overtime_cap() -> u32 {
    120
}

fn default_weekday_multiplier() -> f64 {
    1.5
}

fn default_weekend_multiplier() -> f64 {
    2.0
}

fn default_max_iterations() -> usize {
    30
}

impl Default for AllocationPolicy {
    fn default() -> Self {
        Self {
            weekday_overtime_cap_minutes: default_weekday_overtime_cap(),
            weekday_overtime_multiplier: default_weekday_multiplier(),
            weekend_overtime_multiplier: default_weekend_multiplier(),
            max_iterations: default_max_iterations(),
        }
    }
}

impl AllocationPolicy {
    pub fn validate(&self) -> ScheduleResult<()> {
        for (label, value) in [
            ("weekday_overtime_multiplier", self.weekday_overtime_multiplier),
            ("weekend_overtime_multiplier", self.weekend_overtime_multiplier),
        ] {
            if !value.is_finite() || value < 1.0 {
                return Err(ScheduleError::InvalidPolicy(format!(
                    "{label} must be at least 1.0, got {value}"
                )));
            }
        }
        if self.max_iterations == 0 {
            return Err(ScheduleError::InvalidPolicy(
                "max_iterations must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl EngineConfig {
    /// Load configuration from a JSON file.
    /// Returns default config if the file doesn't exist.
    pub fn load<P: AsRef<Path>>(path: P) -> PersistenceResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&content)?;
        config.allocation.validate()?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> PersistenceResult<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn work_calendar(&self) -> ScheduleResult<WorkCalendar> {
        WorkCalendar::from_config(&self.calendar)
    }
}
