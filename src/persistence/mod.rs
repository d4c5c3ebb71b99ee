use polars::prelude::PolarsError;
use serde_json::Error as SerdeJsonError;
use std::io;
use thiserror::Error;

use crate::assignment::AssignmentSnapshot;
use crate::error::TimephasedError;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("serialization error: {0}")]
    Serialization(#[from] SerdeJsonError),
    #[error("dataframe conversion error: {0}")]
    DataFrame(#[from] PolarsError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[cfg(feature = "sqlite")]
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid timephased data: {0}")]
    Engine(#[from] TimephasedError),
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("no assignment stored with id {0}")]
    NotFound(i32),
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Storage for canonical assignment series.
pub trait AssignmentStore {
    /// Replaces everything stored with `assignments`.
    fn save_assignments(&self, assignments: &[AssignmentSnapshot]) -> PersistenceResult<()>;
    fn load_assignments(&self) -> PersistenceResult<Vec<AssignmentSnapshot>>;
    fn load_assignment(&self, id: i32) -> PersistenceResult<AssignmentSnapshot>;
}

/// Rejects snapshots that could not have come out of the normaliser.
pub fn validate_snapshots(assignments: &[AssignmentSnapshot]) -> PersistenceResult<()> {
    let mut seen = std::collections::HashSet::new();
    for assignment in assignments {
        if !seen.insert(assignment.id) {
            return Err(PersistenceError::InvalidData(format!(
                "duplicate assignment id {}",
                assignment.id
            )));
        }
        for span in assignment.planned.iter().chain(&assignment.complete) {
            if span.finish() < span.start() {
                return Err(PersistenceError::InvalidData(format!(
                    "assignment {} has a span finishing before it starts ({span})",
                    assignment.id
                )));
            }
        }
    }
    Ok(())
}

pub mod file;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use file::{
    ProjectSnapshot, load_raw_records_from_csv, load_snapshot_from_json, read_raw_records,
    save_records_to_csv, save_records_to_json, save_snapshot_to_json,
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteAssignmentStore;
