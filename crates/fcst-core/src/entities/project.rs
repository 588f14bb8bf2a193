use std::collections::HashMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::entities::{ForecastModel, Target, TimeZero, Unit};
use crate::errors::CoreError;

/// The tenant boundary. Owns its units, targets, timezeros, and models.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub home_url: String,
    #[serde(default = "default_is_public")]
    pub is_public: bool,
    #[serde(default)]
    pub units: Vec<Unit>,
    #[serde(default)]
    pub targets: Vec<Target>,
    #[serde(default)]
    pub timezeros: Vec<TimeZero>,
    #[serde(default)]
    pub models: Vec<ForecastModel>,
}

const fn default_is_public() -> bool {
    true
}

impl Project {
    #[must_use]
    pub fn unit_by_id(&self, id: &str) -> Option<&Unit> {
        self.units.iter().find(|unit| unit.id == id)
    }

    #[must_use]
    pub fn target_by_id(&self, id: &str) -> Option<&Target> {
        self.targets.iter().find(|target| target.id == id)
    }

    #[must_use]
    pub fn timezero_by_id(&self, id: &str) -> Option<&TimeZero> {
        self.timezeros.iter().find(|tz| tz.id == id)
    }

    #[must_use]
    pub fn model_by_id(&self, id: &str) -> Option<&ForecastModel> {
        self.models.iter().find(|model| model.id == id)
    }

    /// Map each timezero id to the name of the season containing it.
    ///
    /// Walks timezeros in date order; a timezero with `is_season_start`
    /// opens a new season that covers it and every later timezero until the
    /// next season start. Timezeros before the first start map to `None`.
    #[must_use]
    pub fn timezero_to_season_name(&self) -> HashMap<String, Option<String>> {
        let mut ordered: Vec<&TimeZero> = self.timezeros.iter().collect();
        ordered.sort_by_key(|tz| tz.timezero_date);

        let mut season: Option<String> = None;
        let mut map = HashMap::with_capacity(ordered.len());
        for tz in ordered {
            if tz.is_season_start {
                season.clone_from(&tz.season_name);
            }
            map.insert(tz.id.clone(), season.clone());
        }
        map
    }

    /// The project's oracle (ground truth) model, if any.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Ambiguous` if more than one model is flagged as
    /// an oracle.
    pub fn oracle_model(&self) -> Result<Option<&ForecastModel>, CoreError> {
        let oracles: Vec<&ForecastModel> =
            self.models.iter().filter(|model| model.is_oracle).collect();
        match oracles.as_slice() {
            [] => Ok(None),
            [oracle] => Ok(Some(oracle)),
            many => Err(CoreError::ambiguous("oracle model", &self.name, many.len())),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn tz(id: &str, day: u32, season: Option<&str>) -> TimeZero {
        TimeZero {
            id: id.into(),
            timezero_date: NaiveDate::from_ymd_opt(2020, 1, day).unwrap(),
            data_version_date: None,
            is_season_start: season.is_some(),
            season_name: season.map(Into::into),
        }
    }

    fn model(id: &str, is_oracle: bool) -> ForecastModel {
        ForecastModel {
            id: id.into(),
            name: format!("model {id}"),
            abbreviation: id.into(),
            team_name: "team".into(),
            description: String::new(),
            contributors: String::new(),
            license: "other".into(),
            notes: String::new(),
            citation: None,
            methods: None,
            home_url: String::new(),
            aux_data_url: None,
            is_oracle,
        }
    }

    fn project() -> Project {
        Project {
            id: "prj-00000001".into(),
            name: "flu".into(),
            description: String::new(),
            home_url: String::new(),
            is_public: true,
            units: vec![],
            targets: vec![],
            timezeros: vec![],
            models: vec![],
        }
    }

    #[test]
    fn seasons_follow_date_order() {
        let mut project = project();
        project.timezeros = vec![
            tz("tzr-3", 20, None),
            tz("tzr-1", 1, None),
            tz("tzr-2", 10, Some("2020-2021")),
            tz("tzr-4", 25, Some("2021-2022")),
        ];
        let seasons = project.timezero_to_season_name();
        assert_eq!(seasons["tzr-1"], None);
        assert_eq!(seasons["tzr-2"].as_deref(), Some("2020-2021"));
        assert_eq!(seasons["tzr-3"].as_deref(), Some("2020-2021"));
        assert_eq!(seasons["tzr-4"].as_deref(), Some("2021-2022"));
    }

    #[test]
    fn oracle_model_lookup() {
        let mut project = project();
        project.models = vec![model("m1", false)];
        assert!(project.oracle_model().unwrap().is_none());

        project.models.push(model("truth", true));
        assert_eq!(project.oracle_model().unwrap().unwrap().id, "truth");

        project.models.push(model("truth2", true));
        assert!(matches!(
            project.oracle_model(),
            Err(CoreError::Ambiguous { count: 2, .. })
        ));
    }

    #[test]
    fn model_label_falls_back_to_name() {
        let mut m = model("m1", false);
        assert_eq!(m.label(), "m1");
        m.abbreviation.clear();
        assert_eq!(m.label(), "model m1");
    }
}
