//! Cross-cutting error types for the forecast engine.
//!
//! Errors that can originate from any crate live here. Component-specific
//! errors (`CodecError`, `ValidationError`, `StoreError`) are defined in their
//! respective crates.

use thiserror::Error;

/// Errors that can be raised by any engine crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No entity with the given name exists in the project.
    #[error("{entity_type} not found: {name}")]
    NotFound { entity_type: String, name: String },

    /// More than one entity matched a name that should be unique.
    #[error("{entity_type} is ambiguous: {name} matched {count} entities")]
    Ambiguous {
        entity_type: String,
        name: String,
        count: usize,
    },

    /// A token did not name any variant of a closed enumeration.
    #[error("Unknown {kind} token: {token:?}")]
    UnknownToken { kind: &'static str, token: String },

    /// Data failed validation (schema, format, constraints).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CoreError {
    pub(crate) fn not_found(entity_type: &str, name: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.to_string(),
            name: name.into(),
        }
    }

    pub(crate) fn ambiguous(entity_type: &str, name: impl Into<String>, count: usize) -> Self {
        Self::Ambiguous {
            entity_type: entity_type.to_string(),
            name: name.into(),
            count,
        }
    }
}
