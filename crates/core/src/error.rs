use chrono::NaiveDate;

use crate::types::DbId;

/// Domain errors raised by the engine and the schedule store.
///
/// Infeasible individual items (a course that cannot be placed, a student
/// without a seat) are never errors; they surface as `unplaced` lists in the
/// engine results.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{entity} '{key}' not found")]
    NotFound { entity: &'static str, key: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("A schedule for section '{0}' already exists")]
    DuplicateSection(String),

    #[error("Entry {entry_id} already has an adjustment applied for {date}")]
    ConflictAlreadyResolved { entry_id: DbId, date: NaiveDate },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Shorthand for a validation error on a named input field.
    pub fn invalid(field: impl std::fmt::Display, message: impl std::fmt::Display) -> Self {
        Self::Validation(format!("{field}: {message}"))
    }

    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }
}
