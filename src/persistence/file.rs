use super::{PersistenceError, PersistenceResult};
use crate::allocation::AllocationFragment;
use crate::calendar::{WorkCalendar, WorkCalendarConfig, format_date};
use crate::config::AllocationPolicy;
use crate::metadata::ProjectMetadata;
use crate::project::Project;
use crate::task::{Dependency, DependencyType, Task};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

#[derive(Serialize, Deserialize)]
struct ProjectSnapshot {
    metadata: ProjectMetadata,
    #[serde(default)]
    calendar: WorkCalendarConfig,
    #[serde(default)]
    allocation: AllocationPolicy,
    tasks: Vec<Task>,
    #[serde(default)]
    dependencies: Vec<Dependency>,
}

impl ProjectSnapshot {
    fn from_project(project: &Project) -> Self {
        Self {
            metadata: project.metadata().clone(),
            calendar: project.calendar_config(),
            allocation: project.allocation_policy().clone(),
            tasks: project.tasks().to_vec(),
            dependencies: project.dependencies().to_vec(),
        }
    }

    fn into_project(self) -> PersistenceResult<Project> {
        let calendar = WorkCalendar::from_config(&self.calendar)?;
        self.allocation.validate()?;
        Ok(Project::from_parts(
            self.metadata,
            calendar,
            self.allocation,
            self.tasks,
            self.dependencies,
        )?)
    }
}

pub fn save_project_to_json<P: AsRef<Path>>(project: &Project, path: P) -> PersistenceResult<()> {
    let snapshot = ProjectSnapshot::from_project(project);
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, &snapshot)?;
    Ok(())
}

/// Load a project snapshot. Tasks, links and the calendar are validated;
/// cyclic links are rejected.
pub fn load_project_from_json<P: AsRef<Path>>(path: P) -> PersistenceResult<Project> {
    let file = File::open(path)?;
    let snapshot: ProjectSnapshot = serde_json::from_reader(file)?;
    snapshot.into_project()
}

#[derive(Serialize, Deserialize)]
struct FragmentCsvRecord {
    start_date: String,
    end_date: String,
    days: i64,
    allocated_minutes: u32,
    overtime_minutes: u32,
    overtime_multiplier: f64,
    is_weekend: bool,
}

impl From<&AllocationFragment> for FragmentCsvRecord {
    fn from(fragment: &AllocationFragment) -> Self {
        Self {
            start_date: format_date(fragment.start_date),
            end_date: format_date(fragment.end_date),
            days: fragment.days(),
            allocated_minutes: fragment.allocated_minutes,
            overtime_minutes: fragment.overtime_minutes,
            overtime_multiplier: fragment.overtime_multiplier,
            is_weekend: fragment.is_weekend,
        }
    }
}

/// Write fragments as CSV rows, one per fragment, ready for a booking system.
pub fn save_fragments_to_csv<P: AsRef<Path>>(
    fragments: &[AllocationFragment],
    path: P,
) -> PersistenceResult<()> {
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);
    for fragment in fragments {
        writer.serialize(FragmentCsvRecord::from(fragment))?;
    }
    writer.flush()?;
    Ok(())
}

#[derive(Default, Serialize, Deserialize)]
struct DependencyCsvRecord {
    task_id: i32,
    predecessor_id: i32,
    #[serde(default, rename = "type")]
    dependency_type: String,
    #[serde(default)]
    lag_time: String,
}

impl From<&Dependency> for DependencyCsvRecord {
    fn from(dependency: &Dependency) -> Self {
        Self {
            task_id: dependency.task_id,
            predecessor_id: dependency.predecessor_id,
            dependency_type: dependency.dependency_type.as_str().to_string(),
            lag_time: dependency.lag_time.to_string(),
        }
    }
}

impl DependencyCsvRecord {
    fn into_dependency(self) -> PersistenceResult<Dependency> {
        let dependency_type = if self.dependency_type.trim().is_empty() {
            DependencyType::default()
        } else {
            self.dependency_type
                .parse::<DependencyType>()
                .map_err(PersistenceError::InvalidData)?
        };
        let lag_time = if self.lag_time.trim().is_empty() {
            0
        } else {
            self.lag_time.trim().parse::<i64>().map_err(|e| {
                PersistenceError::InvalidData(format!("invalid lag '{}': {e}", self.lag_time))
            })?
        };
        Ok(Dependency::new(
            self.task_id,
            self.predecessor_id,
            dependency_type,
            lag_time,
        ))
    }
}

pub fn save_dependencies_to_csv<P: AsRef<Path>>(
    dependencies: &[Dependency],
    path: P,
) -> PersistenceResult<()> {
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);
    for dependency in dependencies {
        writer.serialize(DependencyCsvRecord::from(dependency))?;
    }
    writer.flush()?;
    Ok(())
}

/// Read `task_id,predecessor_id[,type][,lag_time]` rows. The type accepts the
/// snake_case names or `fs`/`ss`/`ff`/`sf` and defaults to finish-to-start;
/// a blank lag is 0.
pub fn load_dependencies_from_csv<P: AsRef<Path>>(path: P) -> PersistenceResult<Vec<Dependency>> {
    let file = File::open(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);
    let mut dependencies = Vec::new();
    for record in reader.deserialize::<DependencyCsvRecord>() {
        let dependency = record?.into_dependency()?;
        if dependency.task_id == dependency.predecessor_id {
            return Err(PersistenceError::InvalidData(format!(
                "task {} lists itself as predecessor",
                dependency.task_id
            )));
        }
        dependencies.push(dependency);
    }
    Ok(dependencies)
}
