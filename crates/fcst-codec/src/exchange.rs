//! Structured exchange form.
//!
//! Converts between element sets and the JSON exchange document, and groups
//! elements by (unit, target) for export. Record payloads are checked against
//! the schema registry before typed conversion so that every structural
//! problem in a document is reported at once.

use fcst_core::entities::{CandidateForecast, ForecastMeta};
use fcst_core::enums::PredClass;
use fcst_core::exchange::{
    BinWire, ExchangeDocument, NamedWire, PredictionRecord, QuantileWire, SampleWire, ScalarWire,
};
use fcst_core::prediction::{
    BinData, BinEntry, ElementSet, NamedData, PredictionData, PredictionElement, QuantileData,
    QuantileEntry, SampleData,
};
use fcst_schema::SchemaRegistry;
use serde::{Deserialize, Serialize};

use crate::error::{CodecError, RowError};

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

fn payload_to_json(
    element: &PredictionElement,
    data: &PredictionData,
) -> Result<serde_json::Value, CodecError> {
    let value = match data {
        PredictionData::Point(scalar)
        | PredictionData::Mean(scalar)
        | PredictionData::Median(scalar)
        | PredictionData::Mode(scalar) => serde_json::to_value(ScalarWire {
            value: scalar.value.clone(),
        })?,
        PredictionData::Named(named) => {
            let (param1, param2, param3) = match named.params.as_slice() {
                [p1] => (*p1, None, None),
                [p1, p2] => (*p1, Some(*p2), None),
                [p1, p2, p3] => (*p1, Some(*p2), Some(*p3)),
                other => {
                    return Err(CodecError::Unrepresentable {
                        unit: element.unit.clone(),
                        target: element.target.clone(),
                        reason: format!(
                            "named distributions take 1 to 3 parameters, got {}",
                            other.len()
                        ),
                    });
                }
            };
            serde_json::to_value(NamedWire {
                family: named.family.clone(),
                param1,
                param2,
                param3,
            })?
        }
        PredictionData::Bin(bin) => serde_json::to_value(BinWire {
            cat: bin.entries.iter().map(|e| e.cat.clone()).collect(),
            prob: bin.entries.iter().map(|e| e.prob).collect(),
        })?,
        PredictionData::Sample(sample) => serde_json::to_value(SampleWire {
            sample: sample.samples.clone(),
        })?,
        PredictionData::Quantile(quantile) => serde_json::to_value(QuantileWire {
            quantile: quantile.entries.iter().map(|e| e.quantile).collect(),
            value: quantile.entries.iter().map(|e| e.value.clone()).collect(),
        })?,
    };
    Ok(value)
}

/// Encode one element as an exchange record.
///
/// # Errors
///
/// `CodecError::Unrepresentable` for a named element without 1 to 3
/// parameters.
pub fn element_to_record(element: &PredictionElement) -> Result<PredictionRecord, CodecError> {
    let data = element
        .data()
        .map(|data| payload_to_json(element, data))
        .transpose()?;
    Ok(PredictionRecord {
        unit: element.unit.clone(),
        target: element.target.clone(),
        pred_class: element.pred_class(),
        is_retract: element.is_retract(),
        data,
    })
}

/// Build the exchange document for a forecast, keeping element order.
///
/// # Errors
///
/// See [`element_to_record`].
pub fn to_document(
    meta: &ForecastMeta,
    elements: &ElementSet,
) -> Result<ExchangeDocument, CodecError> {
    let predictions = elements
        .iter()
        .map(element_to_record)
        .collect::<Result<Vec<_>, _>>()?;
    tracing::debug!(records = predictions.len(), "encoded exchange document");
    Ok(ExchangeDocument {
        meta: meta.clone(),
        predictions,
    })
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

fn wire<T: serde::de::DeserializeOwned>(payload: serde_json::Value) -> Result<T, String> {
    serde_json::from_value(payload).map_err(|e| e.to_string())
}

/// Decode one record into an element.
///
/// # Errors
///
/// A reason string when the payload does not fit the record's class, or
/// its parallel arrays differ in length.
pub fn record_to_element(record: PredictionRecord) -> Result<PredictionElement, String> {
    let PredictionRecord {
        unit,
        target,
        pred_class,
        is_retract,
        data,
    } = record;
    let payload = match data {
        Some(payload) if !is_retract && !payload.is_null() => payload,
        _ => return Ok(PredictionElement::retraction(unit, target, pred_class)),
    };

    let data = match pred_class {
        PredClass::Point | PredClass::Mean | PredClass::Median | PredClass::Mode => {
            let scalar: ScalarWire = wire(payload)?;
            PredictionData::scalar(pred_class, scalar.value)
                .ok_or_else(|| format!("{pred_class} is not a single-value class"))?
        }
        PredClass::Named => {
            let named: NamedWire = wire(payload)?;
            let mut params = vec![named.param1];
            match (named.param2, named.param3) {
                (Some(p2), Some(p3)) => params.extend([p2, p3]),
                (Some(p2), None) => params.push(p2),
                (None, Some(_)) => return Err("param3 given without param2".into()),
                (None, None) => {}
            }
            PredictionData::Named(NamedData {
                family: named.family,
                params,
            })
        }
        PredClass::Bin => {
            let bin: BinWire = wire(payload)?;
            if bin.cat.len() != bin.prob.len() {
                return Err(format!(
                    "`cat` and `prob` must have the same length, got {} and {}",
                    bin.cat.len(),
                    bin.prob.len()
                ));
            }
            PredictionData::Bin(BinData {
                entries: bin
                    .cat
                    .into_iter()
                    .zip(bin.prob)
                    .map(|(cat, prob)| BinEntry { cat, prob })
                    .collect(),
            })
        }
        PredClass::Sample => {
            let sample: SampleWire = wire(payload)?;
            PredictionData::Sample(SampleData {
                samples: sample.sample,
            })
        }
        PredClass::Quantile => {
            let quantile: QuantileWire = wire(payload)?;
            if quantile.quantile.len() != quantile.value.len() {
                return Err(format!(
                    "`quantile` and `value` must have the same length, got {} and {}",
                    quantile.quantile.len(),
                    quantile.value.len()
                ));
            }
            PredictionData::Quantile(QuantileData {
                entries: quantile
                    .quantile
                    .into_iter()
                    .zip(quantile.value)
                    .map(|(quantile, value)| QuantileEntry { quantile, value })
                    .collect(),
            })
        }
    };
    Ok(PredictionElement::new(unit, target, data))
}

/// Decode a typed exchange document into a candidate forecast.
///
/// # Errors
///
/// `CodecError::MalformedRecords` listing every bad record (1-based).
pub fn from_document(document: ExchangeDocument) -> Result<CandidateForecast, CodecError> {
    let mut elements = ElementSet::new();
    let mut errors = Vec::new();
    for (idx, record) in document.predictions.into_iter().enumerate() {
        match record_to_element(record) {
            Ok(element) => elements.push(element),
            Err(reason) => errors.push(RowError::new(idx + 1, reason)),
        }
    }
    if !errors.is_empty() {
        tracing::warn!(errors = errors.len(), "exchange document has malformed records");
        return Err(CodecError::MalformedRecords(errors));
    }
    tracing::debug!(elements = elements.len(), "decoded exchange document");
    Ok(CandidateForecast {
        meta: document.meta,
        elements,
    })
}

/// Validate an untyped JSON document against the registry, then decode it.
///
/// # Errors
///
/// `CodecError::Schema` listing every structural problem, or the errors of
/// [`from_document`].
pub fn from_json(
    document: serde_json::Value,
    registry: &SchemaRegistry,
) -> Result<CandidateForecast, CodecError> {
    registry.validate_document(&document)?;
    from_document(serde_json::from_value(document)?)
}

/// Parse JSON text, then see [`from_json`].
///
/// # Errors
///
/// `CodecError::Json` for invalid JSON text, or the errors of [`from_json`].
pub fn from_json_str(
    text: &str,
    registry: &SchemaRegistry,
) -> Result<CandidateForecast, CodecError> {
    from_json(serde_json::from_str(text)?, registry)
}

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

/// All elements of one (unit, target) pair, in submission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportGroup {
    pub unit: String,
    pub target: String,
    pub elements: Vec<PredictionElement>,
}

/// Group elements by (unit, target) in first-appearance order.
#[must_use]
pub fn group_by_unit_target(elements: &ElementSet) -> Vec<ExportGroup> {
    let mut groups: Vec<ExportGroup> = Vec::new();
    for element in elements {
        match groups
            .iter_mut()
            .find(|g| g.unit == element.unit && g.target == element.target)
        {
            Some(group) => group.elements.push(element.clone()),
            None => groups.push(ExportGroup {
                unit: element.unit.clone(),
                target: element.target.clone(),
                elements: vec![element.clone()],
            }),
        }
    }
    groups
}
