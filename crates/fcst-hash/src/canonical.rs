//! Canonical form of a prediction element.
//!
//! Payload entries are sorted by a fixed key (category for bin, level for
//! quantile, the draw itself for sample) so that the same data entered in a
//! different row order has the same form. `-0.0` is folded into `0.0` and
//! every NaN into one bit pattern. Integers and floats stay distinct: `1` and
//! `1.0` are different cells in the tabular format.

use std::cmp::Ordering;

use fcst_core::enums::PredClass;
use fcst_core::prediction::{ElementBody, PredictionData, PredictionElement};
use fcst_core::value::PredValue;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Order-independent view of an element, owned so it can be inspected or
/// serialized for debugging.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalForm {
    pub pred_class: PredClass,
    pub unit: String,
    pub target: String,
    pub is_retract: bool,
    pub payload: CanonicalPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalPayload {
    Retracted,
    Scalar(PredValue),
    Named { family: String, params: Vec<f64> },
    Bin(Vec<(PredValue, f64)>),
    Sample(Vec<PredValue>),
    Quantile(Vec<(f64, PredValue)>),
}

fn normalize(number: f64) -> f64 {
    if number == 0.0 {
        0.0
    } else if number.is_nan() {
        f64::NAN
    } else {
        number
    }
}

fn normalize_value(value: &PredValue) -> PredValue {
    match value {
        PredValue::Float(number) => PredValue::Float(normalize(*number)),
        other => other.clone(),
    }
}

fn cmp_pair_by_value(a: &(PredValue, f64), b: &(PredValue, f64)) -> Ordering {
    a.0.canonical_cmp(&b.0).then_with(|| a.1.total_cmp(&b.1))
}

fn cmp_pair_by_level(a: &(f64, PredValue), b: &(f64, PredValue)) -> Ordering {
    a.0.total_cmp(&b.0).then_with(|| a.1.canonical_cmp(&b.1))
}

impl CanonicalForm {
    #[must_use]
    pub fn of(element: &PredictionElement) -> Self {
        let payload = match &element.body {
            ElementBody::Retraction { .. } => CanonicalPayload::Retracted,
            ElementBody::Prediction(data) => CanonicalPayload::of(data),
        };
        Self {
            pred_class: element.pred_class(),
            unit: element.unit.clone(),
            target: element.target.clone(),
            is_retract: element.is_retract(),
            payload,
        }
    }

    /// Feed the form into a hasher. Every variable-length field is length
    /// prefixed and every value is type tagged, so distinct forms never
    /// produce the same byte stream.
    pub fn feed(&self, hasher: &mut Sha256) {
        feed_str(hasher, self.pred_class.as_str());
        feed_str(hasher, &self.unit);
        feed_str(hasher, &self.target);
        hasher.update([u8::from(self.is_retract)]);
        match &self.payload {
            CanonicalPayload::Retracted => hasher.update(b"r"),
            CanonicalPayload::Scalar(value) => {
                hasher.update(b"v");
                feed_value(hasher, value);
            }
            CanonicalPayload::Named { family, params } => {
                hasher.update(b"n");
                feed_str(hasher, family);
                feed_len(hasher, params.len());
                for param in params {
                    feed_number(hasher, *param);
                }
            }
            CanonicalPayload::Bin(entries) => {
                hasher.update(b"b");
                feed_len(hasher, entries.len());
                for (cat, prob) in entries {
                    feed_value(hasher, cat);
                    feed_number(hasher, *prob);
                }
            }
            CanonicalPayload::Sample(draws) => {
                hasher.update(b"s");
                feed_len(hasher, draws.len());
                for draw in draws {
                    feed_value(hasher, draw);
                }
            }
            CanonicalPayload::Quantile(entries) => {
                hasher.update(b"q");
                feed_len(hasher, entries.len());
                for (level, value) in entries {
                    feed_number(hasher, *level);
                    feed_value(hasher, value);
                }
            }
        }
    }
}

impl CanonicalPayload {
    #[must_use]
    pub fn of(data: &PredictionData) -> Self {
        match data {
            PredictionData::Point(scalar)
            | PredictionData::Mean(scalar)
            | PredictionData::Median(scalar)
            | PredictionData::Mode(scalar) => Self::Scalar(normalize_value(&scalar.value)),
            PredictionData::Named(named) => Self::Named {
                family: named.family.clone(),
                params: named.params.iter().copied().map(normalize).collect(),
            },
            PredictionData::Bin(bin) => {
                let mut entries: Vec<(PredValue, f64)> = bin
                    .entries
                    .iter()
                    .map(|e| (normalize_value(&e.cat), normalize(e.prob)))
                    .collect();
                entries.sort_by(cmp_pair_by_value);
                Self::Bin(entries)
            }
            PredictionData::Sample(sample) => {
                let mut draws: Vec<PredValue> =
                    sample.samples.iter().map(normalize_value).collect();
                draws.sort_by(PredValue::canonical_cmp);
                Self::Sample(draws)
            }
            PredictionData::Quantile(quantile) => {
                let mut entries: Vec<(f64, PredValue)> = quantile
                    .entries
                    .iter()
                    .map(|e| (normalize(e.quantile), normalize_value(&e.value)))
                    .collect();
                entries.sort_by(cmp_pair_by_level);
                Self::Quantile(entries)
            }
        }
    }
}

fn feed_len(hasher: &mut Sha256, len: usize) {
    hasher.update((len as u64).to_le_bytes());
}

fn feed_str(hasher: &mut Sha256, text: &str) {
    feed_len(hasher, text.len());
    hasher.update(text.as_bytes());
}

fn feed_number(hasher: &mut Sha256, number: f64) {
    hasher.update(normalize(number).to_bits().to_le_bytes());
}

fn feed_value(hasher: &mut Sha256, value: &PredValue) {
    match value {
        PredValue::Bool(b) => hasher.update([b'B', u8::from(*b)]),
        PredValue::Int(int) => {
            hasher.update(b"I");
            hasher.update(int.to_le_bytes());
        }
        PredValue::Float(number) => {
            hasher.update(b"F");
            feed_number(hasher, *number);
        }
        PredValue::Text(text) => {
            hasher.update(b"T");
            feed_str(hasher, text);
        }
    }
}

#[cfg(test)]
mod tests {
    use fcst_core::prediction::{BinData, BinEntry};

    use super::*;

    #[test]
    fn bin_entries_sorted_by_category() {
        let element = PredictionElement::new(
            "u",
            "t",
            PredictionData::Bin(BinData {
                entries: vec![
                    BinEntry { cat: "b".into(), prob: 0.5 },
                    BinEntry { cat: "a".into(), prob: 0.5 },
                ],
            }),
        );
        let CanonicalPayload::Bin(entries) = CanonicalForm::of(&element).payload else {
            panic!("expected bin");
        };
        assert_eq!(entries[0].0, PredValue::from("a"));
    }

    #[test]
    fn negative_zero_is_folded() {
        assert_eq!(normalize(-0.0).to_bits(), 0.0_f64.to_bits());
        assert_eq!(normalize(f64::NAN).to_bits(), f64::NAN.to_bits());
        assert_eq!(normalize(-2.5), -2.5);
    }
}
