//! Storage error types for fcst-store.

use chrono::{DateTime, Utc};
use fcst_core::errors::CoreError;
use fcst_validate::{ValidationError, Violation};
use thiserror::Error;

/// Errors from storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A name that must be unique is already taken.
    #[error("Duplicate {entity_type}: {name}")]
    Duplicate { entity_type: String, name: String },

    /// The versioning key (model, timezero, issued_at) is already taken.
    #[error(
        "Forecast for model {model_id} and timezero {timezero_id} already issued at {issued_at}"
    )]
    DuplicateVersion {
        model_id: String,
        timezero_id: String,
        issued_at: DateTime<Utc>,
    },

    /// No stored entity has this identifier.
    #[error("{entity_type} not found: {id}")]
    NotFound { entity_type: String, id: String },

    /// The project breaks its own invariants.
    #[error("Invalid project: {} violation(s)", violations.len())]
    InvalidProject { violations: Vec<Violation> },

    /// Names in a query that match nothing in the project.
    #[error("Unknown query references: {}", names.join(", "))]
    UnknownReferences { names: Vec<String> },

    /// A query result exceeds the configured row limit.
    #[error("Query returns more than {limit} rows")]
    TooManyRows { limit: usize },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl StoreError {
    pub(crate) fn not_found(entity_type: &str, id: &str) -> Self {
        Self::NotFound {
            entity_type: entity_type.to_string(),
            id: id.to_string(),
        }
    }
}
