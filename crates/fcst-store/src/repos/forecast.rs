//! Forecast repository: versioned inserts, version history, and the
//! current-element fold across versions.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use fcst_core::entities::{Forecast, StoredElement};
use fcst_core::enums::PredClass;
use fcst_core::ids::PREFIX_FORECAST;
use fcst_validate::{AcceptedForecast, PriorKeys};

use crate::ForecastStore;
use crate::error::StoreError;

/// Scope of one current element, by resolved identifiers.
type StoredKey = (String, String, PredClass);

fn stored_key(stored: &StoredElement) -> StoredKey {
    (
        stored.unit_id.clone(),
        stored.target_id.clone(),
        stored.element.pred_class(),
    )
}

impl ForecastStore {
    /// Insert an accepted forecast as a new version.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` when the model or timezero is not stored,
    /// `StoreError::DuplicateVersion` when a forecast with the same
    /// (model, timezero, issued_at) exists.
    pub fn insert_forecast(
        &mut self,
        accepted: AcceptedForecast,
        issued_at: DateTime<Utc>,
    ) -> Result<String, StoreError> {
        let project = self
            .project_of_model(&accepted.model_id)
            .ok_or_else(|| StoreError::not_found("model", &accepted.model_id))?;
        if project.timezero_by_id(&accepted.timezero_id).is_none() {
            return Err(StoreError::not_found("timezero", &accepted.timezero_id));
        }
        let taken = self.forecasts.values().any(|f| {
            f.forecast_model_id == accepted.model_id
                && f.time_zero_id == accepted.timezero_id
                && f.issued_at == issued_at
        });
        if taken {
            return Err(StoreError::DuplicateVersion {
                model_id: accepted.model_id,
                timezero_id: accepted.timezero_id,
                issued_at,
            });
        }

        let id = self.generate_id(PREFIX_FORECAST);
        let AcceptedForecast {
            meta,
            model_id,
            timezero_id,
            elements,
        } = accepted;
        let forecast = Forecast {
            id: id.clone(),
            forecast_model_id: model_id,
            time_zero_id: timezero_id,
            source: meta.source.unwrap_or_default(),
            issued_at,
            created_at: Utc::now(),
            notes: meta.notes,
            elements,
        };
        tracing::debug!(
            forecast = %id,
            elements = forecast.elements.len(),
            %issued_at,
            "inserted forecast"
        );
        self.forecasts.insert(id.clone(), forecast);
        Ok(id)
    }

    #[must_use]
    pub fn forecast(&self, id: &str) -> Option<&Forecast> {
        self.forecasts.get(id)
    }

    /// Delete one forecast version with its elements.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` if no forecast has this id.
    pub fn delete_forecast(&mut self, id: &str) -> Result<Forecast, StoreError> {
        self.forecasts
            .remove(id)
            .ok_or_else(|| StoreError::not_found("forecast", id))
    }

    /// Every version of the (model, timezero) forecast, oldest first.
    #[must_use]
    pub fn versions(&self, model_id: &str, timezero_id: &str) -> Vec<&Forecast> {
        let mut versions: Vec<&Forecast> = self
            .forecasts
            .values()
            .filter(|f| f.forecast_model_id == model_id && f.time_zero_id == timezero_id)
            .collect();
        versions.sort_by_key(|f| f.issued_at);
        versions
    }

    /// The newest version issued at or before `as_of` (any time when `None`).
    #[must_use]
    pub fn latest_as_of(
        &self,
        model_id: &str,
        timezero_id: &str,
        as_of: Option<DateTime<Utc>>,
    ) -> Option<&Forecast> {
        self.versions(model_id, timezero_id)
            .into_iter()
            .rev()
            .find(|f| as_of.is_none_or(|as_of| f.issued_at <= as_of))
    }

    /// Fold every version issued at or before `as_of`: per (unit, target,
    /// class) the latest element wins and a retraction leaves the key absent.
    #[must_use]
    pub fn current_elements(
        &self,
        model_id: &str,
        timezero_id: &str,
        as_of: Option<DateTime<Utc>>,
    ) -> Vec<&StoredElement> {
        let mut state: BTreeMap<StoredKey, Option<&StoredElement>> = BTreeMap::new();
        for forecast in self
            .versions(model_id, timezero_id)
            .into_iter()
            .filter(|f| as_of.is_none_or(|as_of| f.issued_at <= as_of))
        {
            for stored in &forecast.elements {
                let current = (!stored.element.is_retract()).then_some(stored);
                state.insert(stored_key(stored), current);
            }
        }
        state.into_values().flatten().collect()
    }

    /// Keys current among versions issued at or before `as_of`, for
    /// validating the retractions of a version issued at `as_of`.
    #[must_use]
    pub fn prior_keys(
        &self,
        model_id: &str,
        timezero_id: &str,
        as_of: DateTime<Utc>,
    ) -> PriorKeys {
        self.current_elements(model_id, timezero_id, Some(as_of))
            .into_iter()
            .map(|stored| stored.element.key())
            .collect()
    }
}
