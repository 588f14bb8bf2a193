use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default license token for models that do not declare one.
fn default_license() -> String {
    "other".to_string()
}

/// A named, owned model definition. An oracle model supplies ground truth
/// rather than predictions and is excluded from forecast queries.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ForecastModel {
    pub id: String,
    pub name: String,
    pub abbreviation: String,
    pub team_name: String,
    #[serde(default)]
    pub description: String,
    /// `name (affiliation) <email>` entries, comma separated.
    #[serde(default)]
    pub contributors: String,
    #[serde(default = "default_license")]
    pub license: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub citation: Option<String>,
    #[serde(default)]
    pub methods: Option<String>,
    #[serde(default)]
    pub home_url: String,
    #[serde(default)]
    pub aux_data_url: Option<String>,
    #[serde(default)]
    pub is_oracle: bool,
}

impl ForecastModel {
    /// Label used in query output: the abbreviation, or the name when the
    /// abbreviation is empty.
    #[must_use]
    pub fn label(&self) -> &str {
        if self.abbreviation.is_empty() {
            &self.name
        } else {
            &self.abbreviation
        }
    }
}
