use chrono::{DateTime, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::prediction::{ElementSet, PredictionElement};

/// Top-level reference metadata of a submission, by human name.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ForecastMeta {
    /// Model abbreviation.
    pub model: String,
    /// Timezero date the forecast is made with respect to.
    pub timezero: NaiveDate,
    /// Version timestamp. `None` lets the store stamp the upload time.
    #[serde(default)]
    pub issued_at: Option<DateTime<Utc>>,
    /// File name or other description of where the data came from.
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A parsed but not yet validated forecast: the unit of validation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct CandidateForecast {
    pub meta: ForecastMeta,
    pub elements: ElementSet,
}

/// A prediction element with its unit and target resolved to identifiers.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct StoredElement {
    pub unit_id: String,
    pub target_id: String,
    pub element: PredictionElement,
}

/// One accepted submission by a model for one timezero.
///
/// (`forecast_model_id`, `time_zero_id`, `issued_at`) is the versioning key:
/// forecasts sharing a model and timezero form a version history ordered by
/// `issued_at`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Forecast {
    pub id: String,
    pub forecast_model_id: String,
    pub time_zero_id: String,
    #[serde(default)]
    pub source: String,
    pub issued_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub notes: Option<String>,
    pub elements: Vec<StoredElement>,
}

impl Forecast {
    /// Every element's `data_hash`, skipping elements that were never hashed.
    pub fn element_hashes(&self) -> impl Iterator<Item = &str> {
        self.elements
            .iter()
            .filter_map(|stored| stored.element.data_hash.as_deref())
    }
}
