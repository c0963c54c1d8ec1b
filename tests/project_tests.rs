use chrono::NaiveDate;
use schedule_engine::{
    AllocationPolicy, DependencyType, EngineConfig, Project, ProjectMetadata, Resource,
    ScheduleError, Task, WorkCalendarConfig,
};
use std::collections::BTreeMap;

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn chain_project() -> Project {
    let mut project = Project::new(ProjectMetadata::named("Warehouse"));
    project
        .upsert_task(Task::scheduled(1, "Design", d(2026, 1, 5), d(2026, 1, 6)))
        .unwrap();
    project
        .upsert_task(Task::scheduled(2, "Build", d(2026, 1, 7), d(2026, 1, 8)))
        .unwrap();
    project
        .upsert_task(Task::scheduled(3, "Ship", d(2026, 1, 9), d(2026, 1, 9)))
        .unwrap();
    project
        .link(2, 1, DependencyType::FinishToStart, None)
        .unwrap();
    project
        .link(3, 2, DependencyType::FinishToStart, None)
        .unwrap();
    project
}

fn dates(project: &Project, id: i32) -> (NaiveDate, NaiveDate) {
    let task = project.task(id).unwrap();
    (task.start_date.unwrap(), task.end_date.unwrap())
}

#[test]
fn linking_back_upstream_is_rejected() {
    let mut project = chain_project();
    let err = project
        .link(1, 3, DependencyType::FinishToStart, Some(0))
        .unwrap_err();
    assert!(matches!(err, ScheduleError::CycleDetected { .. }));
    assert_eq!(project.dependencies().len(), 2);

    assert_eq!(
        project
            .link(2, 2, DependencyType::FinishToStart, Some(0))
            .unwrap_err(),
        ScheduleError::SelfDependency(2)
    );
    assert_eq!(
        project
            .link(2, 99, DependencyType::FinishToStart, Some(0))
            .unwrap_err(),
        ScheduleError::TaskNotFound(99)
    );
}

#[test]
fn relinking_a_pair_replaces_the_relation() {
    let mut project = chain_project();
    project
        .link(2, 1, DependencyType::StartToStart, Some(1))
        .unwrap();
    assert_eq!(project.dependencies().len(), 2);
    let link = project
        .dependencies()
        .iter()
        .find(|dep| dep.task_id == 2)
        .unwrap();
    assert_eq!(link.dependency_type, DependencyType::StartToStart);
    assert_eq!(link.lag_time, 1);

    assert!(project.unlink(2, 1));
    assert!(!project.unlink(2, 1));
}

#[test]
fn invalid_tasks_are_rejected() {
    let mut project = Project::default();
    let mut backwards = Task::new(1, "Backwards", 2.0);
    backwards.start_date = Some(d(2026, 1, 7));
    backwards.end_date = Some(d(2026, 1, 6));
    let err = project.upsert_task(backwards).unwrap_err();
    assert!(matches!(err, ScheduleError::InvalidTask { task_id: 1, .. }));
    assert!(project.tasks().is_empty());
}

#[test]
fn moving_a_task_cascades_downstream() {
    let mut project = chain_project();
    let updates = project.move_task(1, d(2026, 1, 8)).unwrap();

    let ids: Vec<i32> = updates.iter().map(|u| u.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(updates[0].reason, "moved to 2026-01-08");
    assert_eq!(dates(&project, 1), (d(2026, 1, 8), d(2026, 1, 9)));
    assert_eq!(dates(&project, 2), (d(2026, 1, 10), d(2026, 1, 11)));
    assert_eq!(dates(&project, 3), (d(2026, 1, 12), d(2026, 1, 12)));
    assert!(project.audit().is_empty());
}

#[test]
fn blocked_move_leaves_the_project_untouched() {
    let mut project = chain_project();
    let before = project.tasks().to_vec();

    let preview = project.validate_move(2, d(2026, 1, 6)).unwrap();
    assert!(!preview.is_valid);
    assert_eq!(preview.blocking_predecessor, Some(1));

    let err = project.move_task(2, d(2026, 1, 6)).unwrap_err();
    assert!(matches!(err, ScheduleError::Validation { task_id: 2, .. }));
    assert_eq!(project.tasks(), before.as_slice());

    assert_eq!(
        project.move_task(42, d(2026, 1, 6)).unwrap_err(),
        ScheduleError::TaskNotFound(42)
    );
}

#[test]
fn refresh_marks_the_critical_chain() {
    let mut project = chain_project();
    project
        .upsert_task(Task::scheduled(4, "Paperwork", d(2026, 1, 7), d(2026, 1, 7)))
        .unwrap();
    project
        .link(4, 1, DependencyType::FinishToStart, None)
        .unwrap();
    project
        .link(3, 4, DependencyType::FinishToStart, None)
        .unwrap();

    let summary = project.refresh().unwrap();
    assert_eq!(summary.critical_path, vec![1, 2, 3]);
    assert_eq!(summary.task_count, 4);
    assert_eq!(summary.project_finish, Some(d(2026, 1, 9)));
    assert_eq!(summary.project_duration_days, 5);
    assert!(!project.task(4).unwrap().is_critical_path);
    assert!(project.task(2).unwrap().is_critical_path);
    assert!(summary.to_cli_summary().contains("crit_path=1->2->3"));
}

#[test]
fn audit_fixes_are_applied_in_one_pass() {
    let mut project = chain_project();
    project
        .upsert_task(Task::scheduled(1, "Design", d(2026, 1, 5), d(2026, 1, 8)))
        .unwrap();

    let findings = project.audit();
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].id, 2);

    let applied = project.apply_audit();
    assert_eq!(applied, findings);
    assert_eq!(dates(&project, 2), (d(2026, 1, 9), d(2026, 1, 10)));
    // Not cascaded: the next audit catches the follow-on conflict
    let next = project.audit();
    assert_eq!(next.len(), 1);
    assert_eq!(next[0].id, 3);
}

#[test]
fn rollup_widens_summary_tasks_by_their_margins() {
    let mut project = Project::default();
    let mut phase = Task::new(10, "Phase", 1.0);
    phase.margin_start = 1;
    phase.margin_end = 2;
    phase.parent_id = Some(20);
    project.upsert_task(phase).unwrap();
    project.upsert_task(Task::new(20, "Programme", 1.0)).unwrap();

    let mut first = Task::scheduled(1, "Dig", d(2026, 1, 5), d(2026, 1, 6));
    first.parent_id = Some(10);
    let mut second = Task::scheduled(2, "Pour", d(2026, 1, 8), d(2026, 1, 9));
    second.parent_id = Some(10);
    project.upsert_task(first).unwrap();
    project.upsert_task(second).unwrap();

    let updates = project.rollup_parents();
    let ids: Vec<i32> = updates.iter().map(|u| u.id).collect();
    assert_eq!(ids, vec![10, 20]);
    assert_eq!(dates(&project, 10), (d(2026, 1, 4), d(2026, 1, 11)));
    assert_eq!(project.task(10).unwrap().duration, 8.0);
    assert_eq!(dates(&project, 20), (d(2026, 1, 4), d(2026, 1, 11)));

    assert!(project.rollup_parents().is_empty());
}

#[test]
fn removing_a_parent_orphans_its_children() {
    let mut project = Project::default();
    project.upsert_task(Task::new(10, "Phase", 1.0)).unwrap();
    let mut child = Task::new(1, "Dig", 1.0);
    child.parent_id = Some(10);
    project.upsert_task(child).unwrap();

    assert!(project.remove_task(10));
    assert_eq!(project.task(1).unwrap().parent_id, None);
}

#[test]
fn config_drives_calendar_and_allocation_policy() {
    let calendar = WorkCalendarConfig::new(
        [
            chrono::Weekday::Mon,
            chrono::Weekday::Tue,
            chrono::Weekday::Wed,
            chrono::Weekday::Thu,
            chrono::Weekday::Fri,
        ],
        [d(2026, 1, 27)],
    )
    .unwrap();
    let config = EngineConfig {
        calendar,
        allocation: AllocationPolicy {
            weekday_overtime_cap_minutes: 30,
            ..AllocationPolicy::default()
        },
    };
    let project = Project::from_config(ProjectMetadata::default(), &config).unwrap();
    assert!(project.calendar().is_holiday(d(2026, 1, 27)));
    assert_eq!(project.calendar_config(), config.calendar);

    let resource = Resource::new("crew", 480, 50.0);
    let plan = project
        .plan_allocation(1000, &resource, d(2026, 1, 26), &BTreeMap::new(), true)
        .unwrap();
    assert_eq!(plan.days[0].overtime_minutes(), 30);
    // Remaining 490 minutes land on the holiday as double-rate overtime
    assert!(plan.days[1].is_holiday);
    assert_eq!(plan.days[1].overtime_minutes(), 490);
}

#[test]
fn from_parts_rejects_cycles_and_duplicates() {
    use schedule_engine::{Dependency, WorkCalendar};

    let tasks = vec![
        Task::scheduled(1, "A", d(2026, 1, 5), d(2026, 1, 5)),
        Task::scheduled(2, "B", d(2026, 1, 6), d(2026, 1, 6)),
    ];
    let cyclic = vec![
        Dependency::finish_to_start(2, 1),
        Dependency::finish_to_start(1, 2),
    ];
    let err = Project::from_parts(
        ProjectMetadata::default(),
        WorkCalendar::default(),
        AllocationPolicy::default(),
        tasks.clone(),
        cyclic,
    )
    .unwrap_err();
    assert!(matches!(err, ScheduleError::CycleDetected { .. }));

    let mut duplicated = tasks;
    duplicated.push(Task::new(1, "Again", 1.0));
    let err = Project::from_parts(
        ProjectMetadata::default(),
        WorkCalendar::default(),
        AllocationPolicy::default(),
        duplicated,
        Vec::new(),
    )
    .unwrap_err();
    assert_eq!(err, ScheduleError::DuplicateTask(1));
}

#[test]
fn out_of_range_lag_fails_without_committing() {
    let mut project = chain_project();
    project.unlink(2, 1);
    project
        .link(2, 1, DependencyType::StartToStart, Some(-200_000_000))
        .unwrap();

    let err = project.move_task(1, d(2026, 1, 12)).unwrap_err();
    assert!(matches!(err, ScheduleError::DateOutOfRange { .. }));
    assert_eq!(project.task(1).unwrap().start_date, Some(d(2026, 1, 5)));
    assert!(project.refresh().unwrap_err().is_invalid_date());
    assert!(project.audit().is_empty());
}

#[test]
fn rollup_leaves_parent_with_out_of_range_margin() {
    let mut project = Project::default();
    let mut phase = Task::new(10, "Phase", 1.0);
    phase.margin_end = i64::MAX;
    project.upsert_task(phase).unwrap();
    let mut child = Task::scheduled(1, "Dig", d(2026, 1, 5), d(2026, 1, 6));
    child.parent_id = Some(10);
    project.upsert_task(child).unwrap();

    assert!(project.rollup_parents().is_empty());
    assert_eq!(project.task(10).unwrap().start_date, None);
}
