//! # fcst-validate
//!
//! Validation of candidate forecasts before they are accepted.
//!
//! [`Validator`] resolves every reference of a [`CandidateForecast`] within
//! its project, runs the per-element and forecast-level rules, and on
//! success hands the elements to the hasher. Rejection is all-or-nothing and
//! carries every violation found.
//!
//! [`CandidateForecast`]: fcst_core::entities::CandidateForecast

pub mod error;
pub mod report;
pub mod rules;
mod validator;

pub use error::ValidationError;
pub use report::{ErrorKind, Rule, Stage, ValidationReport, Violation};
pub use rules::{PriorKeys, check_project};
pub use validator::{AcceptedForecast, Validator};
