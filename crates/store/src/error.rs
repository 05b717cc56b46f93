use thiserror::Error;

use crate::memory::RecordId;

/// Failures surfaced by store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("table '{0}' is not defined")]
    UnknownTable(String),

    #[error("no record {id} in table '{table}'")]
    NotFound { table: String, id: RecordId },

    #[error("unique index violation on '{table}.{column}'")]
    UniqueViolation { table: String, column: String },

    #[error("column '{table}.{column}' is not indexed")]
    UnindexedColumn { table: String, column: String },
}

impl StoreError {
    /// Whether this error is the unique-index guard firing.
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, StoreError::UniqueViolation { .. })
    }
}
