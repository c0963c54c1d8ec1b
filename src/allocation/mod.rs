//! Capacity-aware placement of work-minutes over calendar days.

pub mod fragments;
pub mod plan;
pub mod session;
pub mod trace;

pub use fragments::{AllocationFragment, merge_consecutive_days};
pub use plan::{
    CapacityAllocator, DayAllocation, DayPlan, MultiDayAllocationPlan,
    calculate_multi_day_allocation_plan,
};
pub use session::{AllocationSession, OverflowDecision, PendingOverflow};
pub use trace::{DayDecision, PlanEvent, PlanObserver, RecordingObserver, TracingObserver};
