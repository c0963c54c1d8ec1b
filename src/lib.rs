pub mod allocation;
pub mod calculations;
pub mod calendar;
pub mod config;
pub mod error;
pub mod graph;
#[cfg(feature = "http_api")]
pub mod http_api;
pub mod metadata;
pub mod persistence;
pub mod project;
pub mod propagation;
pub mod report;
pub mod resource;
pub mod task;
pub(crate) mod task_validation;

pub use allocation::{
    AllocationFragment, AllocationSession, CapacityAllocator, DayAllocation, DayDecision, DayPlan,
    MultiDayAllocationPlan, OverflowDecision, PendingOverflow, PlanEvent, PlanObserver,
    RecordingObserver, TracingObserver, calculate_multi_day_allocation_plan,
    merge_consecutive_days,
};
pub use calculations::{CpmEntry, CpmResult, calculate_critical_path, critical_path_entry};
pub use calendar::{WorkCalendar, WorkCalendarConfig, format_date, parse_date};
pub use config::{AllocationPolicy, EngineConfig};
pub use error::{ScheduleError, ScheduleResult};
pub use graph::TaskGraph;
pub use metadata::ProjectMetadata;
pub use persistence::{
    PersistenceError, PersistenceResult, load_dependencies_from_csv, load_project_from_json,
    save_dependencies_to_csv, save_fragments_to_csv, save_project_to_json,
};
pub use project::{Project, RefreshSummary};
pub use propagation::{
    ValidationResult, apply_updates, audit_predecessor_conflicts, recalculate_tasks_in_cascade,
    validate_task_start_date,
};
pub use resource::Resource;
pub use task::{Dependency, DependencyType, Task, TaskUpdate};
