//! File adapters for projects, dependency lists and allocation fragments.
//!
//! Writes are plain file replacements; there is no transactional store.

use crate::error::ScheduleError;
use serde_json::Error as SerdeJsonError;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("serialization error: {0}")]
    Serialization(#[from] SerdeJsonError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    #[error("invalid data: {0}")]
    InvalidData(String),
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

pub mod file;

pub use file::{
    load_dependencies_from_csv, load_project_from_json, save_dependencies_to_csv,
    save_fragments_to_csv, save_project_to_json,
};
