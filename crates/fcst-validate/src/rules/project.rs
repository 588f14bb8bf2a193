//! Project-level invariants: name uniqueness, a single oracle, and the
//! step-ahead horizon rules on targets.

use std::collections::BTreeMap;

use fcst_config::ValidationConfig;
use fcst_core::entities::{Project, Target};
use fcst_core::value::DATE_FORMAT;

use crate::report::{Rule, ValidationReport, Violation};

fn report_repeats<'a>(
    report: &mut ValidationReport,
    rule: Rule,
    what: &str,
    names: impl Iterator<Item = &'a str>,
) {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for name in names {
        *counts.entry(name).or_default() += 1;
    }
    for (name, count) in counts.into_iter().filter(|(_, count)| *count > 1) {
        report.push(Violation::general(
            rule,
            format!("{what} {name:?} is used by {count} entities"),
        ));
    }
}

fn horizon_problem(target: &Target, config: &ValidationConfig) -> Option<String> {
    let Some(horizon) = target.numeric_horizon else {
        return Some("step-ahead target has no numeric_horizon".to_string());
    };
    if !horizon.is_finite() || horizon < 0.0 {
        return Some(format!("numeric_horizon {horizon} must be >= 0"));
    }
    if config.integer_horizon && horizon.fract() != 0.0 {
        let unit = target
            .reference_date_type
            .map_or("reference date unit", |unit| unit.as_str());
        return Some(format!("numeric_horizon {horizon} is not a whole number of {unit}s"));
    }
    match config.max_horizon {
        Some(max) if horizon > max => {
            Some(format!("numeric_horizon {horizon} exceeds the maximum {max}"))
        }
        _ => None,
    }
}

/// Every project invariant `project` breaks.
#[must_use]
pub fn check_project(project: &Project, config: &ValidationConfig) -> ValidationReport {
    let mut report = ValidationReport::new();

    report_repeats(
        &mut report,
        Rule::DuplicateUnit,
        "unit abbreviation",
        project.units.iter().map(|unit| unit.abbreviation.as_str()),
    );
    report_repeats(
        &mut report,
        Rule::DuplicateTarget,
        "target name",
        project.targets.iter().map(|target| target.name.as_str()),
    );
    let dates: Vec<String> = project
        .timezeros
        .iter()
        .map(|tz| tz.timezero_date.format(DATE_FORMAT).to_string())
        .collect();
    report_repeats(
        &mut report,
        Rule::DuplicateTimezero,
        "timezero date",
        dates.iter().map(String::as_str),
    );
    report_repeats(
        &mut report,
        Rule::DuplicateModel,
        "model abbreviation",
        project.models.iter().map(|model| model.label()),
    );

    let oracles = project.models.iter().filter(|model| model.is_oracle).count();
    if oracles > 1 {
        report.push(Violation::general(
            Rule::MultipleOracles,
            format!("{oracles} models are flagged as oracle, at most one is allowed"),
        ));
    }

    for target in project.targets.iter().filter(|target| target.is_step_ahead) {
        if let Some(problem) = horizon_problem(target, config) {
            report.push(Violation {
                rule: Rule::StepAheadHorizon,
                unit: None,
                target: Some(target.name.clone()),
                pred_class: None,
                element: None,
                message: problem,
            });
        }
    }

    tracing::debug!(
        project = %project.name,
        violations = report.len(),
        "checked project invariants"
    );
    report
}

#[cfg(test)]
mod tests {
    use fcst_core::entities::{ForecastModel, Unit};
    use fcst_core::enums::TargetType;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn step_ahead(horizon: Option<f64>) -> Target {
        Target {
            id: "tgt-00000001".into(),
            name: "1 wk ahead".into(),
            description: String::new(),
            target_type: TargetType::Continuous,
            is_step_ahead: true,
            numeric_horizon: horizon,
            reference_date_type: None,
            outcome_variable: None,
            cats: Vec::new(),
        }
    }

    fn project(targets: Vec<Target>) -> Project {
        Project {
            id: "prj-00000001".into(),
            name: "flu".into(),
            description: String::new(),
            home_url: String::new(),
            is_public: true,
            units: Vec::new(),
            targets,
            timezeros: Vec::new(),
            models: Vec::new(),
        }
    }

    fn model(abbreviation: &str, is_oracle: bool) -> ForecastModel {
        ForecastModel {
            id: format!("mdl-{abbreviation}"),
            name: abbreviation.to_uppercase(),
            abbreviation: abbreviation.into(),
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

    #[rstest]
    #[case(Some(1.0), ValidationConfig::default(), false)]
    #[case(Some(0.0), ValidationConfig::default(), false)]
    #[case(None, ValidationConfig::default(), true)]
    #[case(Some(-1.0), ValidationConfig::default(), true)]
    #[case(Some(1.5), ValidationConfig::default(), true)]
    #[case(Some(1.5), ValidationConfig { integer_horizon: false, ..Default::default() }, false)]
    #[case(Some(8.0), ValidationConfig { max_horizon: Some(4.0), ..Default::default() }, true)]
    fn step_ahead_horizon(
        #[case] horizon: Option<f64>,
        #[case] config: ValidationConfig,
        #[case] rejected: bool,
    ) {
        let report = check_project(&project(vec![step_ahead(horizon)]), &config);
        assert_eq!(report.has(Rule::StepAheadHorizon), rejected);
    }

    #[test]
    fn repeated_names_are_reported_once_per_name() {
        let mut project = project(vec![step_ahead(Some(1.0)), step_ahead(Some(2.0))]);
        project.units = (0..3)
            .map(|i| Unit {
                id: format!("unt-{i}"),
                name: format!("Unit {i}"),
                abbreviation: "loc1".into(),
            })
            .collect();
        let report = check_project(&project, &ValidationConfig::default());
        assert_eq!(report.count(Rule::DuplicateUnit), 1);
        assert_eq!(report.count(Rule::DuplicateTarget), 1);
        assert!(report.violations()[0].message.contains("used by 3"));
    }

    #[test]
    fn at_most_one_oracle() {
        let mut project = project(vec![]);
        project.models = vec![model("truth", true), model("m1", false)];
        assert!(check_project(&project, &ValidationConfig::default()).is_ok());
        project.models.push(model("truth2", true));
        let report = check_project(&project, &ValidationConfig::default());
        assert_eq!(report.count(Rule::MultipleOracles), 1);
    }
}
