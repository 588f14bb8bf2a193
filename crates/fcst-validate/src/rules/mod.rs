//! Rule checks, one module per scope.
//!
//! Checks return violations instead of stopping at the first one so a
//! caller sees every problem of a submission in one pass.

pub mod element;
pub mod forecast;
pub mod project;

pub use element::check_element;
pub use forecast::{PriorKeys, check_forecast};
pub use project::check_project;
