//! Day arithmetic for the four predecessor relation types.
//!
//! All dates are inclusive: a task of `span` days starting on `s` finishes on
//! `s + span - 1`. Offsets that leave chrono's date range are reported as
//! [`ScheduleError::DateOutOfRange`](crate::error::ScheduleError::DateOutOfRange).

use crate::calendar::add_days;
use crate::error::ScheduleResult;
use crate::task::DependencyType;
use chrono::NaiveDate;

/// Earliest start a dependent of `span` days may take, given its
/// predecessor's start and finish.
pub fn implied_start(
    dependency_type: DependencyType,
    predecessor_start: NaiveDate,
    predecessor_finish: NaiveDate,
    span: i64,
    lag: i64,
) -> ScheduleResult<NaiveDate> {
    let back = 1i64.saturating_sub(span);
    match dependency_type {
        DependencyType::FinishToStart => add_days(predecessor_finish, lag.saturating_add(1)),
        DependencyType::StartToStart => add_days(predecessor_start, lag),
        DependencyType::FinishToFinish => add_days(predecessor_finish, lag.saturating_add(back)),
        DependencyType::StartToFinish => add_days(predecessor_start, lag.saturating_add(back)),
    }
}

/// Latest finish a predecessor of `span` days may take without pushing its
/// successor past the successor's late dates.
pub fn implied_late_finish(
    dependency_type: DependencyType,
    successor_late_start: NaiveDate,
    successor_late_finish: NaiveDate,
    span: i64,
    lag: i64,
) -> ScheduleResult<NaiveDate> {
    let ahead = span.saturating_sub(1);
    match dependency_type {
        DependencyType::FinishToStart => add_days(successor_late_start, (-1i64).saturating_sub(lag)),
        DependencyType::StartToStart => add_days(successor_late_start, ahead.saturating_sub(lag)),
        DependencyType::FinishToFinish => add_days(successor_late_finish, 0i64.saturating_sub(lag)),
        DependencyType::StartToFinish => add_days(successor_late_finish, ahead.saturating_sub(lag)),
    }
}

pub fn finish_for(start: NaiveDate, span: i64) -> ScheduleResult<NaiveDate> {
    add_days(start, span.saturating_sub(1))
}

pub fn start_for(finish: NaiveDate, span: i64) -> ScheduleResult<NaiveDate> {
    add_days(finish, 1i64.saturating_sub(span))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn forward_relations() {
        let (ps, pf) = (d(2026, 1, 5), d(2026, 1, 7));
        assert_eq!(
            implied_start(DependencyType::FinishToStart, ps, pf, 2, 0).unwrap(),
            d(2026, 1, 8)
        );
        assert_eq!(
            implied_start(DependencyType::StartToStart, ps, pf, 2, 2).unwrap(),
            d(2026, 1, 7)
        );
        // 2-day dependent must finish with the predecessor on the 7th
        assert_eq!(
            implied_start(DependencyType::FinishToFinish, ps, pf, 2, 0).unwrap(),
            d(2026, 1, 6)
        );
        // 3-day dependent may not finish before the predecessor starts + 1
        assert_eq!(
            implied_start(DependencyType::StartToFinish, ps, pf, 3, 1).unwrap(),
            d(2026, 1, 4)
        );
    }

    #[test]
    fn backward_relations_mirror_forward() {
        let span = 3;
        let (ls, lf) = (d(2026, 1, 12), d(2026, 1, 14));
        for kind in [
            DependencyType::FinishToStart,
            DependencyType::StartToStart,
            DependencyType::FinishToFinish,
            DependencyType::StartToFinish,
        ] {
            let pred_lf = implied_late_finish(kind, ls, lf, span, 1).unwrap();
            let pred_ls = start_for(pred_lf, span).unwrap();
            // The successor's own span is 3 too, so feeding the late dates back
            // through the forward rule must land exactly on its late start.
            assert_eq!(
                implied_start(kind, pred_ls, pred_lf, span, 1).unwrap(),
                ls,
                "{kind}"
            );
        }
    }

    #[test]
    fn extreme_lag_is_an_error() {
        let (ps, pf) = (d(2026, 1, 5), d(2026, 1, 7));
        assert!(implied_start(DependencyType::FinishToStart, ps, pf, 2, i64::MAX).is_err());
        assert!(implied_start(DependencyType::FinishToFinish, ps, pf, 2, i64::MIN).is_err());
        assert!(implied_late_finish(DependencyType::FinishToStart, ps, pf, 2, i64::MIN).is_err());
    }
}
