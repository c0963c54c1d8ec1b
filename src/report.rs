//! Tabular views of engine results as polars `DataFrame`s.

use crate::allocation::{AllocationFragment, MultiDayAllocationPlan};
use crate::calculations::CpmResult;
use crate::task::Task;
use chrono::NaiveDate;
use polars::prelude::*;
use std::collections::HashMap;

/// Polars stores dates as days since 1970-01-01.
fn date_to_i32(date: NaiveDate) -> i32 {
    (date - NaiveDate::default()).num_days() as i32
}

fn date_column(name: &'static str, dates: impl Iterator<Item = NaiveDate>) -> PolarsResult<Column> {
    let days: Vec<i32> = dates.map(date_to_i32).collect();
    Ok(Series::new(PlSmallStr::from_static(name), days)
        .cast(&DataType::Date)?
        .into_column())
}

fn optional_date_column(
    name: &'static str,
    dates: impl Iterator<Item = Option<NaiveDate>>,
) -> PolarsResult<Column> {
    let days: Vec<Option<i32>> = dates.map(|date| date.map(date_to_i32)).collect();
    Ok(Series::new(PlSmallStr::from_static(name), days)
        .cast(&DataType::Date)?
        .into_column())
}

/// One row per task in stored order; undated tasks get null dates.
pub fn task_dataframe(tasks: &[Task]) -> PolarsResult<DataFrame> {
    let ids: Vec<i32> = tasks.iter().map(|t| t.id).collect();
    let names: Vec<&str> = tasks.iter().map(|t| t.name.as_str()).collect();
    let durations: Vec<f64> = tasks.iter().map(|t| t.duration).collect();
    let parents: Vec<Option<i32>> = tasks.iter().map(|t| t.parent_id).collect();
    let critical: Vec<bool> = tasks.iter().map(|t| t.is_critical_path).collect();

    let columns = vec![
        Series::new(PlSmallStr::from_static("id"), ids).into_column(),
        Series::new(PlSmallStr::from_static("name"), names).into_column(),
        optional_date_column("start_date", tasks.iter().map(|t| t.start_date))?,
        optional_date_column("end_date", tasks.iter().map(|t| t.end_date))?,
        Series::new(PlSmallStr::from_static("duration"), durations).into_column(),
        Series::new(PlSmallStr::from_static("parent_id"), parents).into_column(),
        Series::new(PlSmallStr::from_static("is_critical_path"), critical).into_column(),
    ];
    DataFrame::new(columns)
}

/// One row per task that took part in the CPM run, in id order.
pub fn cpm_dataframe(result: &CpmResult, tasks: &[Task]) -> PolarsResult<DataFrame> {
    let names: HashMap<i32, &str> = tasks
        .iter()
        .map(|task| (task.id, task.name.as_str()))
        .collect();
    let entries: Vec<_> = result.entries.values().collect();

    let ids: Vec<i32> = entries.iter().map(|e| e.task_id).collect();
    let task_names: Vec<&str> = entries
        .iter()
        .map(|e| names.get(&e.task_id).copied().unwrap_or(""))
        .collect();
    let total_slack: Vec<i64> = entries.iter().map(|e| e.total_slack).collect();
    let free_slack: Vec<i64> = entries.iter().map(|e| e.free_slack).collect();
    let is_critical: Vec<bool> = entries.iter().map(|e| e.is_critical).collect();

    let columns = vec![
        Series::new(PlSmallStr::from_static("id"), ids).into_column(),
        Series::new(PlSmallStr::from_static("name"), task_names).into_column(),
        date_column("early_start", entries.iter().map(|e| e.early_start))?,
        date_column("early_finish", entries.iter().map(|e| e.early_finish))?,
        date_column("late_start", entries.iter().map(|e| e.late_start))?,
        date_column("late_finish", entries.iter().map(|e| e.late_finish))?,
        Series::new(PlSmallStr::from_static("total_slack"), total_slack).into_column(),
        Series::new(PlSmallStr::from_static("free_slack"), free_slack).into_column(),
        Series::new(PlSmallStr::from_static("is_critical"), is_critical).into_column(),
    ];
    DataFrame::new(columns)
}

pub fn day_plan_dataframe(plan: &MultiDayAllocationPlan) -> PolarsResult<DataFrame> {
    let days = &plan.days;
    let normal: Vec<i64> = days.iter().map(|d| i64::from(d.normal_minutes())).collect();
    let overtime: Vec<i64> = days.iter().map(|d| i64::from(d.overtime_minutes())).collect();
    let multiplier: Vec<f64> = days.iter().map(|d| d.overtime_multiplier()).collect();
    let weekend: Vec<bool> = days.iter().map(|d| d.is_weekend).collect();
    let holiday: Vec<bool> = days.iter().map(|d| d.is_holiday).collect();
    let overflow: Vec<i64> = days.iter().map(|d| i64::from(d.overflow_minutes)).collect();

    let columns = vec![
        date_column("date", days.iter().map(|d| d.date))?,
        Series::new(PlSmallStr::from_static("normal_minutes"), normal).into_column(),
        Series::new(PlSmallStr::from_static("overtime_minutes"), overtime).into_column(),
        Series::new(PlSmallStr::from_static("overtime_multiplier"), multiplier).into_column(),
        Series::new(PlSmallStr::from_static("is_weekend"), weekend).into_column(),
        Series::new(PlSmallStr::from_static("is_holiday"), holiday).into_column(),
        Series::new(PlSmallStr::from_static("overflow_minutes"), overflow).into_column(),
    ];
    DataFrame::new(columns)
}

pub fn fragment_dataframe(fragments: &[AllocationFragment]) -> PolarsResult<DataFrame> {
    let days: Vec<i64> = fragments.iter().map(AllocationFragment::days).collect();
    let allocated: Vec<i64> = fragments
        .iter()
        .map(|f| i64::from(f.allocated_minutes))
        .collect();
    let overtime: Vec<i64> = fragments
        .iter()
        .map(|f| i64::from(f.overtime_minutes))
        .collect();
    let multiplier: Vec<f64> = fragments.iter().map(|f| f.overtime_multiplier).collect();
    let weekend: Vec<bool> = fragments.iter().map(|f| f.is_weekend).collect();

    let columns = vec![
        date_column("start_date", fragments.iter().map(|f| f.start_date))?,
        date_column("end_date", fragments.iter().map(|f| f.end_date))?,
        Series::new(PlSmallStr::from_static("days"), days).into_column(),
        Series::new(PlSmallStr::from_static("allocated_minutes"), allocated).into_column(),
        Series::new(PlSmallStr::from_static("overtime_minutes"), overtime).into_column(),
        Series::new(PlSmallStr::from_static("overtime_multiplier"), multiplier).into_column(),
        Series::new(PlSmallStr::from_static("is_weekend"), weekend).into_column(),
    ];
    DataFrame::new(columns)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_is_day_zero() {
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        assert_eq!(date_to_i32(epoch), 0);
        assert_eq!(date_to_i32(NaiveDate::from_ymd_opt(1970, 1, 11).unwrap()), 10);
    }
}
