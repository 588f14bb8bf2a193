use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{ReferenceDateType, TargetType};

/// An outcome to forecast.
///
/// When `is_step_ahead` is set, `numeric_horizon` counts how far ahead the
/// target looks, in units of `reference_date_type`. Whether the horizon must
/// be integral or bounded is a project-configurable validation rule.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Target {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub target_type: TargetType,
    #[serde(default)]
    pub is_step_ahead: bool,
    #[serde(default)]
    pub numeric_horizon: Option<f64>,
    #[serde(default)]
    pub reference_date_type: Option<ReferenceDateType>,
    /// The target's unit of measure, e.g. `"cases"` or `"percent"`.
    #[serde(default)]
    pub outcome_variable: Option<String>,
    /// Allowed categories for nominal targets. Empty means unrestricted.
    #[serde(default)]
    pub cats: Vec<String>,
}
