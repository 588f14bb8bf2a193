//! Candidate forecast validation and acceptance.

use fcst_config::ValidationConfig;
use fcst_core::entities::{CandidateForecast, ForecastMeta, Project, StoredElement};
use fcst_core::errors::CoreError;
use fcst_core::prediction::PredictionElement;
use fcst_core::resolve::EntityResolver;
use fcst_hash::assign_hashes;
use rayon::prelude::*;
use serde::Serialize;

use crate::error::ValidationError;
use crate::report::{Rule, ValidationReport, Violation};
use crate::rules::{PriorKeys, check_element, check_forecast};

/// A candidate that passed every rule, with references resolved to
/// identifiers and every element hashed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AcceptedForecast {
    pub meta: ForecastMeta,
    pub model_id: String,
    pub timezero_id: String,
    pub elements: Vec<StoredElement>,
}

/// Identifiers found while checking references.
struct Resolved {
    model_id: String,
    timezero_id: String,
    element_ids: Vec<(String, String)>,
}

fn reference_violation(error: &CoreError) -> Option<(Rule, String)> {
    match error {
        CoreError::NotFound { entity_type, .. } => {
            let rule = match entity_type.as_str() {
                "unit" => Rule::UnknownUnit,
                "target" => Rule::UnknownTarget,
                "timezero" => Rule::UnknownTimezero,
                _ => Rule::UnknownModel,
            };
            Some((rule, error.to_string()))
        }
        CoreError::Ambiguous { .. } => Some((Rule::AmbiguousReference, error.to_string())),
        _ => None,
    }
}

/// Validates candidates against one project.
///
/// Stateless between calls; the same validator can check any number of
/// independent candidates, in parallel through [`Validator::accept_batch`].
#[derive(Debug, Clone)]
pub struct Validator<'p> {
    project: &'p Project,
    config: ValidationConfig,
}

impl<'p> Validator<'p> {
    #[must_use]
    pub const fn new(project: &'p Project, config: ValidationConfig) -> Self {
        Self { project, config }
    }

    #[must_use]
    pub const fn project(&self) -> &'p Project {
        self.project
    }

    #[must_use]
    pub const fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Every rule the candidate breaks, treating it as the first version.
    #[must_use]
    pub fn validate(&self, candidate: &CandidateForecast) -> ValidationReport {
        self.validate_with_prior(candidate, &PriorKeys::new())
    }

    /// Every rule the candidate breaks, given the keys current in earlier
    /// versions of the same forecast.
    #[must_use]
    pub fn validate_with_prior(
        &self,
        candidate: &CandidateForecast,
        prior: &PriorKeys,
    ) -> ValidationReport {
        self.check(candidate, prior).0
    }

    /// Validate and, if nothing is wrong, hash and resolve the candidate.
    ///
    /// # Errors
    ///
    /// `ValidationError::ValidationFailure` with every violation when any
    /// rule fails. No part of the candidate is accepted in that case.
    pub fn accept(
        &self,
        candidate: CandidateForecast,
    ) -> Result<AcceptedForecast, ValidationError> {
        self.accept_with_prior(candidate, &PriorKeys::new())
    }

    /// [`Validator::accept`] with the keys current in earlier versions.
    ///
    /// # Errors
    ///
    /// `ValidationError::ValidationFailure` when any rule fails.
    pub fn accept_with_prior(
        &self,
        candidate: CandidateForecast,
        prior: &PriorKeys,
    ) -> Result<AcceptedForecast, ValidationError> {
        let (report, resolved) = self.check(&candidate, prior);
        let Some(resolved) = resolved.filter(|_| report.is_ok()) else {
            tracing::warn!(
                model = %candidate.meta.model,
                timezero = %candidate.meta.timezero,
                violations = report.len(),
                "rejected forecast"
            );
            return Err(report.into());
        };

        let CandidateForecast { meta, mut elements } = candidate;
        assign_hashes(&mut elements);
        let elements = resolved
            .element_ids
            .into_iter()
            .zip(elements)
            .map(|((unit_id, target_id), element)| StoredElement {
                unit_id,
                target_id,
                element,
            })
            .collect();

        Ok(AcceptedForecast {
            meta,
            model_id: resolved.model_id,
            timezero_id: resolved.timezero_id,
            elements,
        })
    }

    /// Accept independent candidates in parallel. Results keep input order.
    pub fn accept_batch(
        &self,
        candidates: Vec<CandidateForecast>,
    ) -> Vec<Result<AcceptedForecast, ValidationError>> {
        candidates
            .into_par_iter()
            .map(|candidate| self.accept(candidate))
            .collect()
    }

    fn check(
        &self,
        candidate: &CandidateForecast,
        prior: &PriorKeys,
    ) -> (ValidationReport, Option<Resolved>) {
        let mut report = ValidationReport::new();
        let mut general = |result: Result<String, CoreError>| match result {
            Ok(id) => Some(id),
            Err(error) => {
                let (rule, message) = reference_violation(&error)
                    .unwrap_or((Rule::UnknownModel, error.to_string()));
                report.push(Violation::general(rule, message));
                None
            }
        };

        let meta = &candidate.meta;
        let model_id = general(self.project.model(&meta.model).map(|model| model.id.clone()));
        let timezero_id = general(self.project.timezero(meta.timezero).map(|tz| tz.id.clone()));

        let element_ids: Vec<Option<(String, String)>> = candidate
            .elements
            .iter()
            .enumerate()
            .map(|(index, element)| self.check_references(index, element, &mut report))
            .collect();

        report.extend(check_forecast(&candidate.elements, prior));

        tracing::debug!(
            model = %meta.model,
            elements = candidate.elements.len(),
            violations = report.len(),
            "validated candidate forecast"
        );

        let resolved = match (model_id, timezero_id) {
            (Some(model_id), Some(timezero_id)) => element_ids
                .into_iter()
                .collect::<Option<Vec<_>>>()
                .map(|element_ids| Resolved {
                    model_id,
                    timezero_id,
                    element_ids,
                }),
            _ => None,
        };
        (report, resolved)
    }

    /// Resolve the element's unit and target, then run the per-element
    /// rules against the target.
    fn check_references(
        &self,
        index: usize,
        element: &PredictionElement,
        report: &mut ValidationReport,
    ) -> Option<(String, String)> {
        let mut failed = |error: CoreError| {
            if let Some((rule, message)) = reference_violation(&error) {
                report.push(Violation::at(rule, index, element, message));
            }
        };
        let unit = self.project.unit(&element.unit).map_err(&mut failed).ok();
        let target = self.project.target(&element.target).map_err(&mut failed).ok();
        let target = target?;

        report.extend(check_element(index, element, target, &self.config));
        unit.map(|unit| (unit.id.clone(), target.id.clone()))
    }
}
