//! Upload service: the path a candidate forecast takes into the store.
//!
//! ```text
//! resolve -> validate -> hash -> equivalence check -> policy -> insert
//! ```

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use fcst_config::{FcstConfig, IdenticalVersionPolicy, StoreConfig, ValidationConfig};
use fcst_core::entities::{CandidateForecast, Project};
use fcst_core::resolve::EntityResolver;
use fcst_hash::find_equivalent;
use fcst_validate::{PriorKeys, Validator};
use serde::Serialize;

use crate::ForecastStore;
use crate::error::StoreError;
use crate::query::{ForecastQuery, QueryRow, run_query};

/// What an upload did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadOutcome {
    /// The inserted version, or `None` when the upload was skipped.
    pub forecast_id: Option<String>,
    /// An existing version holding exactly the same element hashes.
    pub equivalent_to: Option<String>,
    pub issued_at: DateTime<Utc>,
    pub elements: usize,
}

impl UploadOutcome {
    #[must_use]
    pub const fn is_stored(&self) -> bool {
        self.forecast_id.is_some()
    }
}

/// Orchestrates uploads and queries over a [`ForecastStore`].
#[derive(Debug, Default)]
pub struct ForecastService {
    store: ForecastStore,
    validation: ValidationConfig,
    config: StoreConfig,
}

impl ForecastService {
    #[must_use]
    pub fn new(config: &FcstConfig) -> Self {
        Self {
            store: ForecastStore::new(),
            validation: config.validation.clone(),
            config: config.store.clone(),
        }
    }

    #[must_use]
    pub const fn store(&self) -> &ForecastStore {
        &self.store
    }

    pub const fn store_mut(&mut self) -> &mut ForecastStore {
        &mut self.store
    }

    /// Register a project under this service's validation rules.
    ///
    /// # Errors
    ///
    /// See [`ForecastStore::register_project`].
    pub fn register_project(&mut self, project: Project) -> Result<String, StoreError> {
        self.store.register_project(project, &self.validation)
    }

    fn prior_keys(
        &self,
        project: &Project,
        candidate: &CandidateForecast,
        issued_at: DateTime<Utc>,
    ) -> PriorKeys {
        if !self.validation.allow_cross_version_retraction {
            return PriorKeys::new();
        }
        match (
            project.model(&candidate.meta.model),
            project.timezero(candidate.meta.timezero),
        ) {
            (Ok(model), Ok(tz)) => self.store.prior_keys(&model.id, &tz.id, issued_at),
            _ => PriorKeys::new(),
        }
    }

    /// Validate, hash, and store a candidate as a new version of its
    /// (model, timezero) forecast.
    ///
    /// When every element hash matches an existing version, the outcome
    /// names that version; the `identical_version` policy decides whether
    /// the upload is still inserted.
    ///
    /// # Errors
    ///
    /// `StoreError::Core` for an unknown project, `StoreError::Validation`
    /// with every violation, or `StoreError::DuplicateVersion`.
    pub fn upload(
        &mut self,
        project_name: &str,
        candidate: CandidateForecast,
    ) -> Result<UploadOutcome, StoreError> {
        let project = self.store.project_by_name(project_name)?;
        let issued_at = candidate.meta.issued_at.unwrap_or_else(Utc::now);
        let prior = self.prior_keys(project, &candidate, issued_at);
        let accepted =
            Validator::new(project, self.validation.clone()).accept_with_prior(candidate, &prior)?;

        let hashes: BTreeSet<String> = accepted
            .elements
            .iter()
            .filter_map(|stored| stored.element.data_hash.clone())
            .collect();
        let equivalent_to = find_equivalent(
            &hashes,
            self.store
                .versions(&accepted.model_id, &accepted.timezero_id),
        )
        .map(|forecast| forecast.id.clone());

        let elements = accepted.elements.len();
        if equivalent_to.is_some() && self.config.identical_version == IdenticalVersionPolicy::Skip
        {
            tracing::info!(
                model = %accepted.meta.model,
                equivalent_to = ?equivalent_to,
                "skipped upload identical to a stored version"
            );
            return Ok(UploadOutcome {
                forecast_id: None,
                equivalent_to,
                issued_at,
                elements,
            });
        }

        let forecast_id = self.store.insert_forecast(accepted, issued_at)?;
        tracing::info!(forecast = %forecast_id, elements, "stored upload");
        Ok(UploadOutcome {
            forecast_id: Some(forecast_id),
            equivalent_to,
            issued_at,
            elements,
        })
    }

    /// Current predictions of a project as export rows.
    ///
    /// # Errors
    ///
    /// See [`run_query`].
    pub fn query(
        &self,
        project_name: &str,
        query: &ForecastQuery,
    ) -> Result<Vec<QueryRow>, StoreError> {
        let project = self.store.project_by_name(project_name)?;
        run_query(&self.store, project, query, self.config.max_query_rows)
    }
}
