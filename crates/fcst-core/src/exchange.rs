//! Structured exchange envelope.
//!
//! The exchange document is what crosses the engine boundary as JSON:
//! top-level [`ForecastMeta`] plus a flat `predictions` list. Each record
//! carries its payload as an untyped `serde_json::Value` so that the JSON
//! Schema registry can report every structural problem before the codec
//! converts payloads into [`PredictionData`](crate::prediction::PredictionData).
//! The wire payload structs below describe those per-class shapes.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::entities::ForecastMeta;
use crate::enums::PredClass;
use crate::value::PredValue;

/// A complete exchange document.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ExchangeDocument {
    pub meta: ForecastMeta,
    #[serde(default)]
    pub predictions: Vec<PredictionRecord>,
}

/// One prediction record of an exchange document.
///
/// `data` also accepts the legacy key `prediction`. A record whose payload is
/// `null` or missing is a retraction, whatever `is_retract` says.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct PredictionRecord {
    pub unit: String,
    pub target: String,
    #[serde(rename = "class")]
    pub pred_class: PredClass,
    #[serde(default)]
    pub is_retract: bool,
    #[serde(default, alias = "prediction")]
    pub data: Option<serde_json::Value>,
}

impl PredictionRecord {
    #[must_use]
    pub const fn is_retraction(&self) -> bool {
        self.is_retract || self.data.is_none()
    }
}

// ---------------------------------------------------------------------------
// Wire payloads
// ---------------------------------------------------------------------------

/// `{"value": v}` for point, mean, median, mode.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ScalarWire {
    pub value: PredValue,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct NamedWire {
    pub family: String,
    pub param1: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param2: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param3: Option<f64>,
}

/// Parallel `cat` and `prob` arrays.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BinWire {
    pub cat: Vec<PredValue>,
    pub prob: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SampleWire {
    pub sample: Vec<PredValue>,
}

/// Parallel `quantile` and `value` arrays.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct QuantileWire {
    pub quantile: Vec<f64>,
    pub value: Vec<PredValue>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_prediction_key_is_accepted() {
        let json = serde_json::json!({
            "unit": "loc1",
            "target": "pct next week",
            "class": "point",
            "prediction": {"value": 2.1}
        });
        let record: PredictionRecord = serde_json::from_value(json).unwrap();
        assert!(!record.is_retraction());
        assert_eq!(record.data.unwrap()["value"], 2.1);
    }

    #[test]
    fn null_payload_is_retraction() {
        let json = serde_json::json!({
            "unit": "loc1",
            "target": "cases next week",
            "class": "bin",
            "prediction": null
        });
        let record: PredictionRecord = serde_json::from_value(json).unwrap();
        assert!(record.is_retraction());
        assert!(!record.is_retract);
    }

    #[test]
    fn wire_payloads_reject_unknown_fields() {
        let json = serde_json::json!({"value": 1, "extra": 2});
        assert!(serde_json::from_value::<ScalarWire>(json).is_err());
    }

    #[test]
    fn named_wire_omits_missing_params() {
        let wire = NamedWire {
            family: "pois".into(),
            param1: 1.1,
            param2: None,
            param3: None,
        };
        let json = serde_json::to_value(&wire).unwrap();
        assert_eq!(json, serde_json::json!({"family": "pois", "param1": 1.1}));
    }
}
