use super::plan::DayPlan;
use crate::calendar::inclusive_span;
use crate::error::{ScheduleError, ScheduleResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A run of consecutive allocated days with the same overtime multiplier and
/// the same working / non-working classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationFragment {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Normal plus overtime minutes.
    pub allocated_minutes: u32,
    pub overtime_minutes: u32,
    pub overtime_multiplier: f64,
    /// Weekend or holiday run.
    pub is_weekend: bool,
}

impl AllocationFragment {
    fn open(day: &DayPlan) -> ScheduleResult<Self> {
        Ok(Self {
            start_date: day.date,
            end_date: day.date,
            allocated_minutes: day_minutes(day)?,
            overtime_minutes: day.overtime_minutes(),
            overtime_multiplier: day.overtime_multiplier(),
            is_weekend: day.is_non_working(),
        })
    }

    fn accepts(&self, day: &DayPlan) -> bool {
        self.end_date.succ_opt() == Some(day.date)
            && day.overtime_multiplier() == self.overtime_multiplier
            && day.is_non_working() == self.is_weekend
    }

    fn extend(&mut self, day: &DayPlan) -> ScheduleResult<()> {
        let allocated = self.allocated_minutes.checked_add(day_minutes(day)?);
        let overtime = self.overtime_minutes.checked_add(day.overtime_minutes());
        let (Some(allocated), Some(overtime)) = (allocated, overtime) else {
            return Err(ScheduleError::InvalidAllocation(format!(
                "fragment starting {} exceeds {} minutes",
                self.start_date,
                u32::MAX
            )));
        };
        self.end_date = day.date;
        self.allocated_minutes = allocated;
        self.overtime_minutes = overtime;
        Ok(())
    }

    pub fn days(&self) -> i64 {
        inclusive_span(self.start_date, self.end_date)
    }

    pub fn normal_minutes(&self) -> u32 {
        self.allocated_minutes - self.overtime_minutes
    }
}

fn day_minutes(day: &DayPlan) -> ScheduleResult<u32> {
    day.allocation.total_minutes().ok_or_else(|| {
        ScheduleError::InvalidAllocation(format!(
            "{} carries more than {} minutes",
            day.date,
            u32::MAX
        ))
    })
}

/// Collapse decided day plans into fragments.
///
/// Days are taken in the order given. An unallocated day closes the open
/// fragment and starts nothing. Fails with `InvalidAllocation` when a day or
/// a fragment holds more minutes than a `u32` counts.
pub fn merge_consecutive_days(day_plans: &[DayPlan]) -> ScheduleResult<Vec<AllocationFragment>> {
    let mut fragments = Vec::new();
    let mut current: Option<AllocationFragment> = None;

    for day in day_plans {
        if !day.allocation.is_allocated() {
            fragments.extend(current.take());
            continue;
        }
        match current.as_mut() {
            Some(fragment) if fragment.accepts(day) => fragment.extend(day)?,
            _ => {
                fragments.extend(current.take());
                current = Some(AllocationFragment::open(day)?);
            }
        }
    }
    fragments.extend(current);
    Ok(fragments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::plan::DayAllocation;

    fn d(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn day(date: NaiveDate, allocation: DayAllocation) -> DayPlan {
        DayPlan {
            date,
            allocation,
            existing_minutes: 0,
            is_weekend: false,
            is_holiday: false,
            has_overflow: false,
            overflow_minutes: 0,
        }
    }

    #[test]
    fn consecutive_normal_days_merge() {
        let days = vec![
            day(d(2026, 1, 26), DayAllocation::Normal { minutes: 480 }),
            day(d(2026, 1, 27), DayAllocation::Normal { minutes: 200 }),
        ];
        let fragments = merge_consecutive_days(&days).unwrap();
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].start_date, d(2026, 1, 26));
        assert_eq!(fragments[0].end_date, d(2026, 1, 27));
        assert_eq!(fragments[0].allocated_minutes, 680);
        assert_eq!(fragments[0].days(), 2);
    }

    #[test]
    fn unallocated_day_splits() {
        let days = vec![
            day(d(2026, 1, 26), DayAllocation::Normal { minutes: 480 }),
            day(d(2026, 1, 27), DayAllocation::Unallocated),
            day(d(2026, 1, 28), DayAllocation::Normal { minutes: 480 }),
        ];
        let fragments = merge_consecutive_days(&days).unwrap();
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[1].start_date, d(2026, 1, 28));
    }

    #[test]
    fn multiplier_change_splits() {
        let days = vec![
            day(
                d(2026, 1, 26),
                DayAllocation::Overtime {
                    normal_minutes: 480,
                    overtime_minutes: 120,
                    multiplier: 1.5,
                },
            ),
            day(d(2026, 1, 27), DayAllocation::Normal { minutes: 100 }),
        ];
        let fragments = merge_consecutive_days(&days).unwrap();
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0].overtime_minutes, 120);
        assert_eq!(fragments[0].normal_minutes(), 480);
        assert_eq!(fragments[1].overtime_multiplier, 1.0);
    }

    #[test]
    fn calendar_gap_splits() {
        let days = vec![
            day(d(2026, 1, 30), DayAllocation::Normal { minutes: 480 }),
            day(d(2026, 2, 2), DayAllocation::Normal { minutes: 480 }),
        ];
        assert_eq!(merge_consecutive_days(&days).unwrap().len(), 2);
    }

    #[test]
    fn minute_overflow_is_an_error() {
        let days = vec![
            day(d(2026, 1, 26), DayAllocation::Normal { minutes: u32::MAX }),
            day(d(2026, 1, 27), DayAllocation::Normal { minutes: 10 }),
        ];
        assert!(matches!(
            merge_consecutive_days(&days),
            Err(ScheduleError::InvalidAllocation(_))
        ));

        let single = vec![day(
            d(2026, 1, 26),
            DayAllocation::Overtime {
                normal_minutes: u32::MAX,
                overtime_minutes: 1,
                multiplier: 1.5,
            },
        )];
        assert!(matches!(
            merge_consecutive_days(&single),
            Err(ScheduleError::InvalidAllocation(_))
        ));
    }
}
