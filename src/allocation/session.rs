use super::plan::{CapacityAllocator, DayAllocation, DayPlan, MultiDayAllocationPlan};
use super::trace::{DayDecision, PlanEvent};
use crate::calendar::add_days;
use crate::error::{ScheduleError, ScheduleResult};
use crate::resource::Resource;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Answer to a day whose remaining minutes exceed its normal capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowDecision {
    PushToNextDay,
    AcceptOvertime,
}

/// A day waiting for an [`OverflowDecision`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingOverflow {
    pub day_index: usize,
    pub date: NaiveDate,
    pub is_weekend: bool,
    pub is_holiday: bool,
    pub existing_minutes: u32,
    /// Normal minutes the day takes whatever is decided.
    pub normal_minutes: u32,
    /// Minutes left over after normal capacity.
    pub overflow_minutes: u32,
    /// Overtime the day would absorb if accepted.
    pub overtime_offer: u32,
    pub overtime_multiplier: f64,
}

/// Day-by-day allocation where each overflow day waits for a decision.
///
/// ```text
/// let mut session = allocator.session(total, &resource, start, &existing).start()?;
/// while let Some(day) = session.pending() { ...; session.decide(choice)?; }
/// let plan = session.finish()?;
/// ```
pub struct AllocationSession<'a> {
    allocator: &'a CapacityAllocator,
    resource: &'a Resource,
    existing: &'a BTreeMap<NaiveDate, u32>,
    total_minutes: u32,
    start_date: NaiveDate,
    weekend_overtime: bool,
    started: bool,
    remaining: u32,
    cursor: NaiveDate,
    evaluated: usize,
    days: Vec<DayPlan>,
    pending: Option<PendingOverflow>,
    deferred: bool,
}

impl<'a> AllocationSession<'a> {
    pub(crate) fn new(
        allocator: &'a CapacityAllocator,
        total_minutes: u32,
        resource: &'a Resource,
        start_date: NaiveDate,
        existing: &'a BTreeMap<NaiveDate, u32>,
    ) -> Self {
        Self {
            allocator,
            resource,
            existing,
            total_minutes,
            start_date,
            weekend_overtime: false,
            started: false,
            remaining: total_minutes,
            cursor: start_date,
            evaluated: 0,
            days: Vec::new(),
            pending: None,
            deferred: false,
        }
    }

    /// Evaluate weekend and holiday days instead of skipping them. Any minutes
    /// placed there are overtime at the weekend multiplier.
    pub fn with_weekend_overtime(mut self, enabled: bool) -> Self {
        self.weekend_overtime = enabled;
        self
    }

    /// Validate inputs and run up to the first overflow day.
    pub fn start(mut self) -> ScheduleResult<Self> {
        self.ensure_started()?;
        Ok(self)
    }

    fn ensure_started(&mut self) -> ScheduleResult<()> {
        if self.started {
            return Ok(());
        }
        self.resource.validate()?;
        self.allocator.policy.validate()?;
        self.started = true;
        if !self.weekend_overtime && !self.allocator.calendar.is_available(self.cursor) {
            self.cursor = self.allocator.calendar.next_available(self.cursor)?;
        }
        self.advance()
    }

    pub fn pending(&self) -> Option<&PendingOverflow> {
        self.pending.as_ref()
    }

    pub fn days(&self) -> &[DayPlan] {
        &self.days
    }

    pub fn remaining_minutes(&self) -> u32 {
        self.remaining
    }

    /// Resolve the pending day and run on to the next one that needs a decision.
    pub fn decide(&mut self, decision: OverflowDecision) -> ScheduleResult<DayPlan> {
        self.ensure_started()?;
        let pending = self.pending.take().ok_or(ScheduleError::NoPendingDecision)?;

        let overtime = match decision {
            OverflowDecision::PushToNextDay => {
                self.deferred = true;
                0
            }
            OverflowDecision::AcceptOvertime => pending.overtime_offer,
        };
        let plan = DayPlan {
            date: pending.date,
            allocation: DayAllocation::from_minutes(
                pending.normal_minutes,
                overtime,
                pending.overtime_multiplier,
            ),
            existing_minutes: pending.existing_minutes,
            is_weekend: pending.is_weekend,
            is_holiday: pending.is_holiday,
            has_overflow: true,
            overflow_minutes: pending.overflow_minutes,
        };
        self.remaining -= pending.normal_minutes + overtime;
        self.report(
            pending.day_index,
            &plan,
            match decision {
                OverflowDecision::PushToNextDay => DayDecision::PushedToNextDay,
                OverflowDecision::AcceptOvertime => DayDecision::AcceptedOvertime,
            },
        );
        self.days.push(plan.clone());

        self.cursor = self.next_day(pending.date)?;
        self.advance()?;
        Ok(plan)
    }

    /// Close the session. Fails while any minutes are unplaced, whether a day
    /// is still pending or the day bound was hit.
    pub fn finish(mut self) -> ScheduleResult<MultiDayAllocationPlan> {
        self.ensure_started()?;
        if self.remaining > 0 {
            return Err(ScheduleError::OverflowUnresolved {
                remaining_minutes: self.remaining,
                iterations: self.evaluated,
            });
        }
        let estimated_cost = self.days.iter().map(|day| day.cost(self.resource)).sum();
        Ok(MultiDayAllocationPlan {
            resource_id: self.resource.id.clone(),
            start_date: self.start_date,
            total_minutes: self.total_minutes,
            days: self.days,
            requires_user_decision: self.deferred,
            estimated_cost,
        })
    }

    fn next_day(&self, date: NaiveDate) -> ScheduleResult<NaiveDate> {
        if self.weekend_overtime {
            add_days(date, 1)
        } else {
            self.allocator.calendar.next_available(date)
        }
    }

    /// Place minutes day by day until they run out or a day overflows.
    fn advance(&mut self) -> ScheduleResult<()> {
        let allocator = self.allocator;
        let calendar = &allocator.calendar;
        let policy = &allocator.policy;

        while self.remaining > 0 {
            if self.evaluated >= policy.max_iterations {
                return Err(ScheduleError::OverflowUnresolved {
                    remaining_minutes: self.remaining,
                    iterations: self.evaluated,
                });
            }
            let day_index = self.evaluated;
            self.evaluated += 1;

            let date = self.cursor;
            let is_weekend = calendar.is_weekend(date);
            let is_holiday = calendar.is_holiday(date);
            let non_working = is_weekend || is_holiday;
            let existing_minutes = self.existing.get(&date).copied().unwrap_or(0);
            let available = if non_working {
                0
            } else {
                self.resource
                    .daily_capacity_minutes
                    .saturating_sub(existing_minutes)
            };

            if self.remaining <= available {
                let plan = DayPlan {
                    date,
                    allocation: DayAllocation::Normal {
                        minutes: self.remaining,
                    },
                    existing_minutes,
                    is_weekend,
                    is_holiday,
                    has_overflow: false,
                    overflow_minutes: 0,
                };
                self.remaining = 0;
                self.report(day_index, &plan, DayDecision::Fits);
                self.days.push(plan);
                return Ok(());
            }

            let overflow_minutes = self.remaining - available;
            let (overtime_offer, overtime_multiplier) = if non_working {
                (overflow_minutes, policy.weekend_overtime_multiplier)
            } else {
                (
                    overflow_minutes.min(policy.weekday_overtime_cap_minutes),
                    policy.weekday_overtime_multiplier,
                )
            };
            self.pending = Some(PendingOverflow {
                day_index,
                date,
                is_weekend,
                is_holiday,
                existing_minutes,
                normal_minutes: available,
                overflow_minutes,
                overtime_offer,
                overtime_multiplier,
            });
            return Ok(());
        }
        Ok(())
    }

    fn report(&self, day_index: usize, plan: &DayPlan, decision: DayDecision) {
        self.allocator.observer().on_day(&PlanEvent {
            day_index,
            date: plan.date,
            decision,
            normal_minutes: plan.normal_minutes(),
            overtime_minutes: plan.overtime_minutes(),
            remaining_minutes: self.remaining,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::trace::RecordingObserver;
    use crate::calendar::WorkCalendar;
    use crate::config::AllocationPolicy;
    use std::sync::Arc;

    fn d(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn only_overflow_days_ask_for_a_decision() {
        let allocator = CapacityAllocator::default();
        let resource = Resource::new("crew", 540, 60.0);
        let existing = BTreeMap::new();
        let mut session = allocator
            .session(1140, &resource, d(2026, 1, 26), &existing)
            .start()
            .unwrap();

        let first = session.pending().cloned().unwrap();
        assert_eq!(first.date, d(2026, 1, 26));
        assert_eq!(first.overtime_offer, 120);
        let monday = session.decide(OverflowDecision::AcceptOvertime).unwrap();
        assert_eq!(monday.overtime_minutes(), 120);

        // 480 left fits Tuesday without asking
        assert!(session.pending().is_none());
        let plan = session.finish().unwrap();
        assert_eq!(plan.days.len(), 2);
        assert!(!plan.requires_user_decision);
    }

    #[test]
    fn pushed_day_matches_automatic_plan() {
        let allocator = CapacityAllocator::default();
        let resource = Resource::new("crew", 540, 60.0);
        let existing = BTreeMap::new();
        let mut session = allocator
            .session(1140, &resource, d(2026, 1, 26), &existing)
            .start()
            .unwrap();
        while session.pending().is_some() {
            session.decide(OverflowDecision::PushToNextDay).unwrap();
        }
        let interactive = session.finish().unwrap();
        let automatic = allocator
            .plan(1140, &resource, d(2026, 1, 26), &existing, false)
            .unwrap();
        assert_eq!(interactive, automatic);
    }

    #[test]
    fn finishing_with_a_pending_day_fails() {
        let allocator = CapacityAllocator::default();
        let resource = Resource::new("crew", 540, 60.0);
        let existing = BTreeMap::new();
        let session = allocator
            .session(1140, &resource, d(2026, 1, 26), &existing)
            .start()
            .unwrap();
        assert!(matches!(
            session.finish(),
            Err(ScheduleError::OverflowUnresolved { .. })
        ));
    }

    #[test]
    fn finishing_after_the_day_bound_fails() {
        let allocator = CapacityAllocator::default();
        let resource = Resource::new("crew", 540, 60.0);
        let existing = BTreeMap::new();
        let mut session = allocator
            .session(540 * 40, &resource, d(2026, 1, 26), &existing)
            .start()
            .unwrap();

        let mut outcome = Ok(());
        while session.pending().is_some() {
            if let Err(err) = session.decide(OverflowDecision::PushToNextDay) {
                outcome = Err(err);
                break;
            }
        }
        assert!(matches!(
            outcome,
            Err(ScheduleError::OverflowUnresolved { iterations: 30, .. })
        ));
        assert!(session.pending().is_none());
        assert!(session.remaining_minutes() > 0);
        assert_eq!(
            session.finish(),
            Err(ScheduleError::OverflowUnresolved {
                remaining_minutes: 540 * 10,
                iterations: 30,
            })
        );
    }

    #[test]
    fn deciding_without_a_pending_day_fails() {
        let allocator = CapacityAllocator::default();
        let resource = Resource::new("crew", 540, 60.0);
        let existing = BTreeMap::new();
        let mut session = allocator
            .session(60, &resource, d(2026, 1, 26), &existing)
            .start()
            .unwrap();
        assert_eq!(
            session.decide(OverflowDecision::AcceptOvertime),
            Err(ScheduleError::NoPendingDecision)
        );
    }

    #[test]
    fn weekend_start_is_skipped_without_overtime() {
        let allocator = CapacityAllocator::default();
        let resource = Resource::new("crew", 480, 50.0);
        let existing = BTreeMap::new();
        let plan = allocator
            .plan(300, &resource, d(2026, 1, 31), &existing, false)
            .unwrap();
        assert_eq!(plan.days[0].date, d(2026, 2, 2));
    }

    #[test]
    fn holidays_are_overtime_only() {
        let mut calendar = WorkCalendar::default();
        calendar.add_holiday(d(2026, 1, 27));
        let recorder = RecordingObserver::new();
        let allocator = CapacityAllocator::new(calendar, AllocationPolicy::default())
            .with_observer(Arc::new(recorder.clone()));
        let resource = Resource::new("crew", 480, 50.0);
        let existing = BTreeMap::new();
        let plan = allocator
            .plan(800, &resource, d(2026, 1, 26), &existing, true)
            .unwrap();

        let holiday = &plan.days[1];
        assert!(holiday.is_holiday);
        assert_eq!(holiday.normal_minutes(), 0);
        assert_eq!(holiday.overtime_minutes(), 200);
        assert_eq!(holiday.overtime_multiplier(), 2.0);

        let events = recorder.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].decision, DayDecision::AcceptedOvertime);
        assert_eq!(events[1].remaining_minutes, 0);
    }

    #[test]
    fn invalid_resource_is_rejected_up_front() {
        let allocator = CapacityAllocator::default();
        let resource = Resource::new("nobody", 0, 50.0);
        let existing = BTreeMap::new();
        let result = allocator
            .session(60, &resource, d(2026, 1, 26), &existing)
            .start();
        assert!(matches!(result, Err(ScheduleError::InvalidResource(_))));
    }
}
