//! Entity reference resolution.
//!
//! Maps the human names a submission uses (unit abbreviation, target name,
//! timezero date, model abbreviation) to the entities of one project.
//! Lookups are read-only. `Ambiguous` is only reachable if a project was
//! built without its uniqueness checks.

use chrono::NaiveDate;

use crate::entities::{ForecastModel, Project, Target, TimeZero, Unit};
use crate::errors::CoreError;
use crate::value::DATE_FORMAT;

/// Name-to-entity lookup within one project scope.
pub trait EntityResolver {
    /// # Errors
    ///
    /// `CoreError::NotFound` or `CoreError::Ambiguous`.
    fn unit(&self, abbreviation: &str) -> Result<&Unit, CoreError>;

    /// # Errors
    ///
    /// `CoreError::NotFound` or `CoreError::Ambiguous`.
    fn target(&self, name: &str) -> Result<&Target, CoreError>;

    /// # Errors
    ///
    /// `CoreError::NotFound` or `CoreError::Ambiguous`.
    fn timezero(&self, date: NaiveDate) -> Result<&TimeZero, CoreError>;

    /// # Errors
    ///
    /// `CoreError::NotFound` or `CoreError::Ambiguous`.
    fn model(&self, abbreviation: &str) -> Result<&ForecastModel, CoreError>;
}

/// Exactly one match, or the matching resolution error.
fn unique<'a, T: 'a>(
    entity_type: &str,
    name: &str,
    mut matches: impl Iterator<Item = &'a T>,
) -> Result<&'a T, CoreError> {
    let first = matches
        .next()
        .ok_or_else(|| CoreError::not_found(entity_type, name))?;
    let rest = matches.count();
    if rest > 0 {
        return Err(CoreError::ambiguous(entity_type, name, rest + 1));
    }
    Ok(first)
}

impl EntityResolver for Project {
    fn unit(&self, abbreviation: &str) -> Result<&Unit, CoreError> {
        unique(
            "unit",
            abbreviation,
            self.units.iter().filter(|u| u.abbreviation == abbreviation),
        )
    }

    fn target(&self, name: &str) -> Result<&Target, CoreError> {
        unique("target", name, self.targets.iter().filter(|t| t.name == name))
    }

    fn timezero(&self, date: NaiveDate) -> Result<&TimeZero, CoreError> {
        unique(
            "timezero",
            &date.format(DATE_FORMAT).to_string(),
            self.timezeros.iter().filter(|tz| tz.timezero_date == date),
        )
    }

    fn model(&self, abbreviation: &str) -> Result<&ForecastModel, CoreError> {
        unique(
            "model",
            abbreviation,
            self.models.iter().filter(|m| m.label() == abbreviation),
        )
    }
}

/// Find a project by name among those visible to the caller.
///
/// # Errors
///
/// `CoreError::NotFound` or `CoreError::Ambiguous`.
pub fn find_project<'a>(projects: &'a [Project], name: &str) -> Result<&'a Project, CoreError> {
    unique("project", name, projects.iter().filter(|p| p.name == name))
}

#[cfg(test)]
mod tests {
    use crate::enums::TargetType;

    use super::*;

    fn project() -> Project {
        Project {
            id: "prj-00000001".into(),
            name: "flu".into(),
            description: String::new(),
            home_url: String::new(),
            is_public: true,
            units: vec![
                Unit {
                    id: "unt-00000001".into(),
                    name: "United States".into(),
                    abbreviation: "US".into(),
                },
                Unit {
                    id: "unt-00000002".into(),
                    name: "Massachusetts".into(),
                    abbreviation: "MA".into(),
                },
            ],
            targets: vec![Target {
                id: "tgt-00000001".into(),
                name: "1 wk ahead".into(),
                description: String::new(),
                target_type: TargetType::Continuous,
                is_step_ahead: true,
                numeric_horizon: Some(1.0),
                reference_date_type: None,
                outcome_variable: None,
                cats: vec![],
            }],
            timezeros: vec![TimeZero {
                id: "tzr-00000001".into(),
                timezero_date: NaiveDate::from_ymd_opt(2020, 10, 5).unwrap(),
                data_version_date: None,
                is_season_start: false,
                season_name: None,
            }],
            models: vec![],
        }
    }

    #[test]
    fn resolves_by_human_name() {
        let project = project();
        assert_eq!(project.unit("MA").unwrap().id, "unt-00000002");
        assert_eq!(project.target("1 wk ahead").unwrap().id, "tgt-00000001");
        let date = NaiveDate::from_ymd_opt(2020, 10, 5).unwrap();
        assert_eq!(project.timezero(date).unwrap().id, "tzr-00000001");
    }

    #[test]
    fn missing_name_is_not_found() {
        let err = project().unit("XX").unwrap_err();
        let CoreError::NotFound { entity_type, name } = err else {
            panic!("expected NotFound, got {err:?}");
        };
        assert_eq!((entity_type.as_str(), name.as_str()), ("unit", "XX"));
        let date = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        let err = project().timezero(date).unwrap_err();
        assert_eq!(err.to_string(), "timezero not found: 2021-01-01");
    }

    #[test]
    fn duplicate_name_is_ambiguous() {
        let mut project = project();
        let copy = project.units[1].clone();
        project.units.push(copy);
        assert!(matches!(
            project.unit("MA"),
            Err(CoreError::Ambiguous { count: 2, .. })
        ));
    }

    #[test]
    fn finds_project_by_name() {
        let projects = vec![project()];
        assert!(find_project(&projects, "flu").is_ok());
        assert!(matches!(
            find_project(&projects, "covid"),
            Err(CoreError::NotFound { .. })
        ));
    }
}
