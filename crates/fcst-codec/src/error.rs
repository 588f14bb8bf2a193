//! Codec error types.

use std::fmt;

use fcst_schema::SchemaError;
use thiserror::Error;

/// One problem found while parsing a tabular row or an exchange record.
///
/// `row` is the 1-based data row (or record) number. Row `0` stands for the
/// header or the file as a whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    pub row: usize,
    pub reason: String,
}

impl RowError {
    pub(crate) fn new(row: usize, reason: impl Into<String>) -> Self {
        Self {
            row,
            reason: reason.into(),
        }
    }

    pub(crate) fn header(reason: impl Into<String>) -> Self {
        Self::new(0, reason)
    }
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.row == 0 {
            write!(f, "header: {}", self.reason)
        } else {
            write!(f, "row {}: {}", self.row, self.reason)
        }
    }
}

fn joined(errors: &[RowError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Error)]
pub enum CodecError {
    /// Tabular input not shaped as expected. Lists every bad row.
    #[error("{} malformed row(s): {}", .0.len(), joined(.0))]
    MalformedRows(Vec<RowError>),

    /// Exchange records whose payload does not fit their class.
    #[error("{} malformed record(s): {}", .0.len(), joined(.0))]
    MalformedRecords(Vec<RowError>),

    /// An in-memory element has no representation in the target format.
    #[error("Cannot encode {unit}/{target}: {reason}")]
    Unrepresentable {
        unit: String,
        target: String,
        reason: String,
    },

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CodecError {
    /// The row-level problems, if this is a parse failure.
    #[must_use]
    pub fn row_errors(&self) -> &[RowError] {
        match self {
            Self::MalformedRows(errors) | Self::MalformedRecords(errors) => errors,
            _ => &[],
        }
    }
}
