//! Error types for the CRUD service

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CrudError>;

/// Failures surfaced by repositories and services.
///
/// A plain "no such record" on read is not an error; reads return
/// `Ok(None)` instead.
#[derive(Error, Debug)]
pub enum CrudError {
    /// Create was handed an entity that already carries an id
    #[error("Entity already exists: {0}")]
    AlreadyExists(String),

    /// Update or link targeted an id that is not stored
    #[error("Entity not found: {0}")]
    NotFound(String),

    /// The storage layer rejected a write because of a foreign key
    #[error("Integrity violation on {operation} ({constraint}): {detail}")]
    IntegrityViolation {
        constraint: String,
        operation: String,
        detail: String,
    },

    #[error("Database error: {0}")]
    Database(String),
}

impl CrudError {
    pub fn integrity(
        constraint: impl Into<String>,
        operation: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        CrudError::IntegrityViolation {
            constraint: constraint.into(),
            operation: operation.into(),
            detail: detail.into(),
        }
    }

    /// Short machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            CrudError::AlreadyExists(_) => "already_exists",
            CrudError::NotFound(_) => "not_found",
            CrudError::IntegrityViolation { .. } => "integrity_violation",
            CrudError::Database(_) => "database",
        }
    }
}
