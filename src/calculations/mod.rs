pub mod backward_pass;
pub mod critical_path;
pub mod forward_pass;
pub mod relations;

pub use critical_path::{CpmEntry, CpmResult, calculate_critical_path, critical_path_entry};
