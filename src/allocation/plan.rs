use super::session::{AllocationSession, OverflowDecision};
use super::trace::{PlanObserver, TracingObserver};
use crate::calendar::WorkCalendar;
use crate::config::AllocationPolicy;
use crate::error::ScheduleResult;
use crate::resource::Resource;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// How one day's minutes were placed.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DayAllocation {
    #[default]
    Unallocated,
    Normal {
        minutes: u32,
    },
    Overtime {
        normal_minutes: u32,
        overtime_minutes: u32,
        multiplier: f64,
    },
}

impl DayAllocation {
    /// Normal and overtime minutes folded into the right variant. Zero minutes
    /// is `Unallocated`; no overtime is `Normal`.
    pub fn from_minutes(normal_minutes: u32, overtime_minutes: u32, multiplier: f64) -> Self {
        match (normal_minutes, overtime_minutes) {
            (0, 0) => DayAllocation::Unallocated,
            (minutes, 0) => DayAllocation::Normal { minutes },
            _ => DayAllocation::Overtime {
                normal_minutes,
                overtime_minutes,
                multiplier,
            },
        }
    }

    pub fn normal_minutes(&self) -> u32 {
        match *self {
            DayAllocation::Unallocated => 0,
            DayAllocation::Normal { minutes } => minutes,
            DayAllocation::Overtime { normal_minutes, .. } => normal_minutes,
        }
    }

    pub fn overtime_minutes(&self) -> u32 {
        match *self {
            DayAllocation::Overtime {
                overtime_minutes, ..
            } => overtime_minutes,
            _ => 0,
        }
    }

    /// `None` when normal plus overtime does not fit in a `u32`.
    pub fn total_minutes(&self) -> Option<u32> {
        self.normal_minutes().checked_add(self.overtime_minutes())
    }

    /// 1.0 unless the day carries overtime.
    pub fn multiplier(&self) -> f64 {
        match *self {
            DayAllocation::Overtime { multiplier, .. } => multiplier,
            _ => 1.0,
        }
    }

    pub fn is_allocated(&self) -> bool {
        self.normal_minutes() > 0 || self.overtime_minutes() > 0
    }
}

/// The plan for one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayPlan {
    pub date: NaiveDate,
    pub allocation: DayAllocation,
    /// Minutes already booked on this day before planning.
    #[serde(default)]
    pub existing_minutes: u32,
    pub is_weekend: bool,
    pub is_holiday: bool,
    pub has_overflow: bool,
    /// Minutes still wanted beyond this day's normal capacity.
    #[serde(default)]
    pub overflow_minutes: u32,
}

impl DayPlan {
    pub fn normal_minutes(&self) -> u32 {
        self.allocation.normal_minutes()
    }

    pub fn overtime_minutes(&self) -> u32 {
        self.allocation.overtime_minutes()
    }

    pub fn overtime_multiplier(&self) -> f64 {
        self.allocation.multiplier()
    }

    pub fn is_non_working(&self) -> bool {
        self.is_weekend || self.is_holiday
    }

    pub fn cost(&self, resource: &Resource) -> f64 {
        resource.cost_of(self.normal_minutes(), 1.0)
            + resource.cost_of(self.overtime_minutes(), self.overtime_multiplier())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiDayAllocationPlan {
    pub resource_id: String,
    pub start_date: NaiveDate,
    pub total_minutes: u32,
    pub days: Vec<DayPlan>,
    /// True when some overflow was pushed forward instead of being resolved
    /// as overtime, so a person should confirm the plan.
    pub requires_user_decision: bool,
    pub estimated_cost: f64,
}

impl MultiDayAllocationPlan {
    pub fn total_normal_minutes(&self) -> u32 {
        self.days.iter().map(DayPlan::normal_minutes).sum()
    }

    pub fn total_overtime_minutes(&self) -> u32 {
        self.days.iter().map(DayPlan::overtime_minutes).sum()
    }

    pub fn allocated_minutes(&self) -> u32 {
        self.total_normal_minutes() + self.total_overtime_minutes()
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        self.days.last().map(|day| day.date)
    }

    pub fn day(&self, date: NaiveDate) -> Option<&DayPlan> {
        self.days.iter().find(|day| day.date == date)
    }
}

/// Plans how a resource consumes work-minutes over calendar days.
#[derive(Clone)]
pub struct CapacityAllocator {
    pub calendar: WorkCalendar,
    pub policy: AllocationPolicy,
    observer: Arc<dyn PlanObserver>,
}

impl fmt::Debug for CapacityAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapacityAllocator")
            .field("calendar", &self.calendar)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Default for CapacityAllocator {
    fn default() -> Self {
        Self::new(WorkCalendar::default(), AllocationPolicy::default())
    }
}

impl CapacityAllocator {
    pub fn new(calendar: WorkCalendar, policy: AllocationPolicy) -> Self {
        Self {
            calendar,
            policy,
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn PlanObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub(crate) fn observer(&self) -> &dyn PlanObserver {
        self.observer.as_ref()
    }

    /// Place `total_minutes` starting at `start_date`.
    ///
    /// With `use_overtime_by_default` every overflow is absorbed as overtime
    /// and weekends are worked when the plan reaches them. Without it,
    /// overflow rolls to the next working day and the plan is flagged
    /// `requires_user_decision`.
    pub fn plan(
        &self,
        total_minutes: u32,
        resource: &Resource,
        start_date: NaiveDate,
        existing: &BTreeMap<NaiveDate, u32>,
        use_overtime_by_default: bool,
    ) -> ScheduleResult<MultiDayAllocationPlan> {
        let decision = if use_overtime_by_default {
            OverflowDecision::AcceptOvertime
        } else {
            OverflowDecision::PushToNextDay
        };
        let mut session = self
            .session(total_minutes, resource, start_date, existing)
            .with_weekend_overtime(use_overtime_by_default)
            .start()?;
        while session.pending().is_some() {
            session.decide(decision)?;
        }
        session.finish()
    }

    /// Interactive variant of [`CapacityAllocator::plan`]: overflow days wait
    /// for a decision.
    pub fn session<'a>(
        &'a self,
        total_minutes: u32,
        resource: &'a Resource,
        start_date: NaiveDate,
        existing: &'a BTreeMap<NaiveDate, u32>,
    ) -> AllocationSession<'a> {
        AllocationSession::new(self, total_minutes, resource, start_date, existing)
    }
}

/// [`CapacityAllocator::plan`] with a Saturday/Sunday weekend, no holidays and
/// the default overtime policy.
pub fn calculate_multi_day_allocation_plan(
    total_minutes: u32,
    resource: &Resource,
    start_date: NaiveDate,
    existing: &BTreeMap<NaiveDate, u32>,
    use_overtime_by_default: bool,
) -> ScheduleResult<MultiDayAllocationPlan> {
    CapacityAllocator::default().plan(
        total_minutes,
        resource,
        start_date,
        existing,
        use_overtime_by_default,
    )
}
