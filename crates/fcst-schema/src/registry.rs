//! Central schema registry for exchange and entity types.
//!
//! The `SchemaRegistry` builds JSON Schemas from fcst-core types at
//! construction time using [`schemars::schema_for!`] and validates with
//! `jsonschema`.

use std::collections::HashMap;

use fcst_core::enums::PredClass;
use schemars::schema_for;

use crate::error::SchemaError;

/// Named JSON Schemas for every type that crosses the engine boundary.
pub struct SchemaRegistry {
    schemas: HashMap<&'static str, serde_json::Value>,
}

/// Insert a schema into the map, converting the `schemars` output to a
/// `serde_json::Value`.
macro_rules! register {
    ($map:expr, $name:expr, $ty:ty) => {
        $map.insert(
            $name,
            serde_json::to_value(schema_for!($ty))
                .map_err(|e| SchemaError::Generation(format!("{}: {e}", $name)))?,
        );
    };
}

/// Registry name of the payload schema a prediction class uses.
#[must_use]
pub const fn payload_schema_name(class: PredClass) -> &'static str {
    match class {
        PredClass::Point | PredClass::Mean | PredClass::Median | PredClass::Mode => {
            "scalar_payload"
        }
        PredClass::Named => "named_payload",
        PredClass::Bin => "bin_payload",
        PredClass::Sample => "sample_payload",
        PredClass::Quantile => "quantile_payload",
    }
}

impl SchemaRegistry {
    /// Build a registry containing the exchange envelope, payload, and
    /// entity schemas.
    ///
    /// # Errors
    ///
    /// `SchemaError::Generation` if a generated schema cannot be converted
    /// to JSON.
    pub fn new() -> Result<Self, SchemaError> {
        let mut schemas = HashMap::new();

        // --- Exchange envelope (3) ---
        register!(
            schemas,
            "exchange_document",
            fcst_core::exchange::ExchangeDocument
        );
        register!(
            schemas,
            "prediction_record",
            fcst_core::exchange::PredictionRecord
        );
        register!(schemas, "forecast_meta", fcst_core::entities::ForecastMeta);

        // --- Payloads (5) ---
        register!(schemas, "scalar_payload", fcst_core::exchange::ScalarWire);
        register!(schemas, "named_payload", fcst_core::exchange::NamedWire);
        register!(schemas, "bin_payload", fcst_core::exchange::BinWire);
        register!(schemas, "sample_payload", fcst_core::exchange::SampleWire);
        register!(schemas, "quantile_payload", fcst_core::exchange::QuantileWire);

        // --- Entity types (9) ---
        register!(schemas, "project", fcst_core::entities::Project);
        register!(schemas, "unit", fcst_core::entities::Unit);
        register!(schemas, "target", fcst_core::entities::Target);
        register!(schemas, "timezero", fcst_core::entities::TimeZero);
        register!(schemas, "forecast_model", fcst_core::entities::ForecastModel);
        register!(schemas, "forecast", fcst_core::entities::Forecast);
        register!(
            schemas,
            "candidate_forecast",
            fcst_core::entities::CandidateForecast
        );
        register!(
            schemas,
            "prediction_element",
            fcst_core::prediction::PredictionElement
        );
        register!(schemas, "element_set", fcst_core::prediction::ElementSet);

        Ok(Self { schemas })
    }

    /// Get a schema by name. Returns `None` if not found.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.schemas.get(name)
    }

    /// Validate a JSON value against a named schema.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::NotFound` if the schema name is unknown, or
    /// `SchemaError::ValidationFailed` if validation produces errors.
    pub fn validate(&self, name: &str, instance: &serde_json::Value) -> Result<(), SchemaError> {
        let errors = self.errors_for(name, instance, "")?;
        if errors.is_empty() {
            Ok(())
        } else {
            Err(SchemaError::ValidationFailed { errors })
        }
    }

    /// Validate a whole exchange document: the envelope, then every
    /// record's payload against the schema its `class` selects.
    ///
    /// Records without a recognizable class or with a `null` payload are
    /// only checked by the envelope schema. Every error is collected;
    /// payload errors are prefixed with `predictions[i]`.
    ///
    /// # Errors
    ///
    /// `SchemaError::ValidationFailed` listing every error, or
    /// `SchemaError::Generation` if a schema does not compile.
    pub fn validate_document(&self, document: &serde_json::Value) -> Result<(), SchemaError> {
        let mut errors = self.errors_for("exchange_document", document, "")?;

        let records = document
            .get("predictions")
            .and_then(serde_json::Value::as_array)
            .map_or(&[][..], Vec::as_slice);
        for (idx, record) in records.iter().enumerate() {
            let Some(class) = record
                .get("class")
                .and_then(serde_json::Value::as_str)
                .and_then(|token| token.parse::<PredClass>().ok())
            else {
                continue;
            };
            let payload = record.get("data").or_else(|| record.get("prediction"));
            let Some(payload) = payload.filter(|p| !p.is_null()) else {
                continue;
            };
            let prefix = format!("predictions[{idx}] ({class}): ");
            errors.extend(self.errors_for(payload_schema_name(class), payload, &prefix)?);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            tracing::debug!(errors = errors.len(), "exchange document failed schema validation");
            Err(SchemaError::ValidationFailed { errors })
        }
    }

    fn errors_for(
        &self,
        name: &str,
        instance: &serde_json::Value,
        prefix: &str,
    ) -> Result<Vec<String>, SchemaError> {
        let schema = self
            .get(name)
            .ok_or_else(|| SchemaError::NotFound(name.to_string()))?;

        let validator = jsonschema::validator_for(schema)
            .map_err(|e| SchemaError::Generation(format!("{e}")))?;

        Ok(validator
            .iter_errors(instance)
            .map(|e| format!("{prefix}{e}"))
            .collect())
    }

    /// List all registered schema names.
    #[must_use]
    pub fn list(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.schemas.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Number of registered schemas.
    #[must_use]
    pub fn schema_count(&self) -> usize {
        self.schemas.len()
    }
}
