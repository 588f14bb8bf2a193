//! Validation error types.

use thiserror::Error;

use crate::report::{ValidationReport, Violation};

/// Number of violations quoted in the error message.
const QUOTED: usize = 3;

fn quoted(violations: &[Violation]) -> String {
    let mut text = violations
        .iter()
        .take(QUOTED)
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    if violations.len() > QUOTED {
        text.push_str("; ...");
    }
    text
}

#[derive(Debug, Error)]
pub enum ValidationError {
    /// The candidate broke one or more rules and was rejected as a whole.
    #[error("Validation failed with {} violation(s): {}", violations.len(), quoted(violations))]
    ValidationFailure { violations: Vec<Violation> },
}

impl ValidationError {
    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        match self {
            Self::ValidationFailure { violations } => violations,
        }
    }
}

impl From<ValidationReport> for ValidationError {
    fn from(report: ValidationReport) -> Self {
        Self::ValidationFailure {
            violations: report.into_violations(),
        }
    }
}
