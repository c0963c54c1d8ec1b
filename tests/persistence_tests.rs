use chrono::NaiveDate;
use schedule_engine::{
    AllocationPolicy, DependencyType, EngineConfig, PersistenceError, Project, ProjectMetadata,
    Resource, ScheduleError, Task, calculate_multi_day_allocation_plan, load_dependencies_from_csv,
    load_project_from_json, merge_consecutive_days, save_dependencies_to_csv,
    save_fragments_to_csv, save_project_to_json,
};
use std::collections::BTreeMap;
use std::fs;
use tempfile::{NamedTempFile, tempdir};

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn sample_project() -> Project {
    let mut metadata = ProjectMetadata::named("Export Project");
    metadata.project_description = "Testing persistence helpers".into();
    metadata.project_start_date = Some(d(2026, 1, 5));
    let mut project = Project::new(metadata);

    let mut design = Task::scheduled(1, "Design", d(2026, 1, 5), d(2026, 1, 9));
    design.lag_days = 2;
    project.upsert_task(design).unwrap();
    let mut build = Task::new(2, "Build", 8.0);
    build.parent_id = Some(10);
    project.upsert_task(build).unwrap();
    project.upsert_task(Task::new(10, "Phase", 1.0)).unwrap();
    project
        .link(2, 1, DependencyType::FinishToStart, None)
        .unwrap();
    project
}

#[test]
fn project_json_round_trip() {
    let project = sample_project();
    let tmp = NamedTempFile::new().unwrap();
    save_project_to_json(&project, tmp.path()).unwrap();

    let loaded = load_project_from_json(tmp.path()).unwrap();
    assert_eq!(loaded.metadata(), project.metadata());
    assert_eq!(loaded.tasks(), project.tasks());
    assert_eq!(loaded.dependencies(), project.dependencies());
    assert_eq!(loaded.dependencies()[0].lag_time, 2);
    assert_eq!(loaded.calendar_config(), project.calendar_config());
    assert_eq!(loaded.allocation_policy(), project.allocation_policy());
}

#[test]
fn snapshot_uses_iso_dates_and_snake_case_relations() {
    let project = sample_project();
    let tmp = NamedTempFile::new().unwrap();
    save_project_to_json(&project, tmp.path()).unwrap();

    let raw = fs::read_to_string(tmp.path()).unwrap();
    assert!(raw.contains("\"2026-01-05\""));
    assert!(raw.contains("\"finish_to_start\""));
}

#[test]
fn snapshot_with_sections_missing_uses_defaults() {
    let tmp = NamedTempFile::new().unwrap();
    fs::write(
        tmp.path(),
        r#"{"metadata": {"project_name": "Bare"}, "tasks": [{"id": 1, "duration": 2}]}"#,
    )
    .unwrap();

    let loaded = load_project_from_json(tmp.path()).unwrap();
    assert_eq!(loaded.metadata().project_name, "Bare");
    assert_eq!(loaded.tasks().len(), 1);
    assert!(loaded.dependencies().is_empty());
    assert_eq!(loaded.allocation_policy(), &AllocationPolicy::default());
}

#[test]
fn cyclic_snapshot_is_rejected() {
    let tmp = NamedTempFile::new().unwrap();
    fs::write(
        tmp.path(),
        r#"{
            "metadata": {"project_name": "Loop"},
            "tasks": [{"id": 1, "duration": 1}, {"id": 2, "duration": 1}],
            "dependencies": [
                {"task_id": 2, "predecessor_id": 1},
                {"task_id": 1, "predecessor_id": 2, "type": "start_to_start"}
            ]
        }"#,
    )
    .unwrap();

    match load_project_from_json(tmp.path()) {
        Err(PersistenceError::Schedule(ScheduleError::CycleDetected { task_ids })) => {
            assert_eq!(task_ids, vec![1, 2]);
        }
        other => panic!("expected a cycle error, got {other:?}"),
    }
}

#[test]
fn malformed_json_is_a_serialization_error() {
    let tmp = NamedTempFile::new().unwrap();
    fs::write(tmp.path(), "{ not json").unwrap();
    assert!(matches!(
        load_project_from_json(tmp.path()),
        Err(PersistenceError::Serialization(_))
    ));
}

#[test]
fn dependency_csv_accepts_short_codes_and_blank_lag() {
    let tmp = NamedTempFile::new().unwrap();
    fs::write(
        tmp.path(),
        "task_id,predecessor_id,type,lag_time\n2,1,ss,3\n3,2,,\n4, 3 ,FF,-1\n",
    )
    .unwrap();

    let deps = load_dependencies_from_csv(tmp.path()).unwrap();
    assert_eq!(deps.len(), 3);
    assert_eq!(deps[0].dependency_type, DependencyType::StartToStart);
    assert_eq!(deps[0].lag_time, 3);
    assert_eq!(deps[1].dependency_type, DependencyType::FinishToStart);
    assert_eq!(deps[1].lag_time, 0);
    assert_eq!(deps[2].dependency_type, DependencyType::FinishToFinish);
    assert_eq!(deps[2].lag_time, -1);
}

#[test]
fn dependency_csv_round_trip() {
    let project = sample_project();
    let tmp = NamedTempFile::new().unwrap();
    save_dependencies_to_csv(project.dependencies(), tmp.path()).unwrap();
    let loaded = load_dependencies_from_csv(tmp.path()).unwrap();
    assert_eq!(loaded, project.dependencies());
}

#[test]
fn dependency_csv_rejects_bad_rows() {
    let self_link = NamedTempFile::new().unwrap();
    fs::write(self_link.path(), "task_id,predecessor_id\n4,4\n").unwrap();
    assert!(matches!(
        load_dependencies_from_csv(self_link.path()),
        Err(PersistenceError::InvalidData(_))
    ));

    let bad_type = NamedTempFile::new().unwrap();
    fs::write(bad_type.path(), "task_id,predecessor_id,type\n2,1,xx\n").unwrap();
    assert!(matches!(
        load_dependencies_from_csv(bad_type.path()),
        Err(PersistenceError::InvalidData(_))
    ));
}

#[test]
fn fragments_export_one_row_per_fragment() {
    let resource = Resource::new("crew", 540, 60.0);
    let plan =
        calculate_multi_day_allocation_plan(1500, &resource, d(2026, 1, 30), &BTreeMap::new(), true)
            .unwrap();
    let fragments = merge_consecutive_days(&plan.days).unwrap();
    let tmp = NamedTempFile::new().unwrap();
    save_fragments_to_csv(&fragments, tmp.path()).unwrap();

    let raw = fs::read_to_string(tmp.path()).unwrap();
    let lines: Vec<&str> = raw.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(
        lines[0],
        "start_date,end_date,days,allocated_minutes,overtime_minutes,overtime_multiplier,is_weekend"
    );
    assert_eq!(lines[1], "2026-01-30,2026-01-30,1,660,120,1.5,false");
    assert_eq!(lines[2], "2026-01-31,2026-01-31,1,840,840,2.0,true");
}

#[test]
fn config_round_trip_and_validation() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("engine.json");
    let config = EngineConfig {
        allocation: AllocationPolicy {
            max_iterations: 10,
            ..AllocationPolicy::default()
        },
        ..EngineConfig::default()
    };
    config.save(&path).unwrap();
    assert_eq!(EngineConfig::load(&path).unwrap(), config);

    fs::write(&path, r#"{"allocation": {"max_iterations": 0}}"#).unwrap();
    assert!(matches!(
        EngineConfig::load(&path),
        Err(PersistenceError::Schedule(ScheduleError::InvalidPolicy(_)))
    ));
}
