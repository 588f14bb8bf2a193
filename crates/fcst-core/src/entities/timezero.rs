use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A calendar date anchoring a forecast's reference point.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct TimeZero {
    pub id: String,
    pub timezero_date: NaiveDate,
    /// Optional database date models should work with for `timezero_date`.
    #[serde(default)]
    pub data_version_date: Option<NaiveDate>,
    #[serde(default)]
    pub is_season_start: bool,
    /// Name of the season this timezero starts, if `is_season_start`.
    #[serde(default)]
    pub season_name: Option<String>,
}
