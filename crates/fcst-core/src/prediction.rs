//! Prediction element model.
//!
//! A forecast is a sequence of `PredictionElement`s, each scoped to one
//! (unit, target) pair and holding either a typed payload
//! ([`PredictionData`]) or a retraction marker. The model only exposes
//! construction and shape; the rules that decide whether a payload is
//! acceptable live in `fcst-validate`.
//!
//! Retraction is append-only. The "current" element for a key is computed by
//! folding the ordered element sequence ([`ElementSet::current`]), never by
//! mutating earlier elements.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::PredClass;
use crate::value::PredValue;

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// Payload of the single-value classes (point, mean, median, mode).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ScalarData {
    pub value: PredValue,
}

/// A named parametric distribution. `family` is kept as the raw token so an
/// unrecognized family survives parsing and is reported by the validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NamedData {
    pub family: String,
    pub params: Vec<f64>,
}

/// One (category, probability) pair of a bin distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BinEntry {
    pub cat: PredValue,
    pub prob: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BinData {
    pub entries: Vec<BinEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SampleData {
    pub samples: Vec<PredValue>,
}

/// One (quantile level, value) pair of a quantile distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QuantileEntry {
    pub quantile: f64,
    pub value: PredValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QuantileData {
    pub entries: Vec<QuantileEntry>,
}

/// Variant-specific payload, one variant per prediction class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "class", content = "data", rename_all = "snake_case")]
pub enum PredictionData {
    Point(ScalarData),
    Mean(ScalarData),
    Median(ScalarData),
    Mode(ScalarData),
    Named(NamedData),
    Bin(BinData),
    Sample(SampleData),
    Quantile(QuantileData),
}

impl PredictionData {
    #[must_use]
    pub const fn pred_class(&self) -> PredClass {
        match self {
            Self::Point(_) => PredClass::Point,
            Self::Mean(_) => PredClass::Mean,
            Self::Median(_) => PredClass::Median,
            Self::Mode(_) => PredClass::Mode,
            Self::Named(_) => PredClass::Named,
            Self::Bin(_) => PredClass::Bin,
            Self::Sample(_) => PredClass::Sample,
            Self::Quantile(_) => PredClass::Quantile,
        }
    }

    /// Build a single-value payload for a scalar class. Returns `None` when
    /// `class` is not one of point, mean, median, mode.
    #[must_use]
    pub fn scalar(class: PredClass, value: PredValue) -> Option<Self> {
        let data = ScalarData { value };
        match class {
            PredClass::Point => Some(Self::Point(data)),
            PredClass::Mean => Some(Self::Mean(data)),
            PredClass::Median => Some(Self::Median(data)),
            PredClass::Mode => Some(Self::Mode(data)),
            _ => None,
        }
    }

    /// The scalar payload, if this is a single-value class.
    #[must_use]
    pub const fn as_scalar(&self) -> Option<&ScalarData> {
        match self {
            Self::Point(data) | Self::Mean(data) | Self::Median(data) | Self::Mode(data) => {
                Some(data)
            }
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Elements
// ---------------------------------------------------------------------------

/// What an element carries: a payload, or a retraction of the current
/// element for the same (unit, target, class).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ElementBody {
    Prediction(PredictionData),
    Retraction { pred_class: PredClass },
}

/// One typed prediction for a (unit, target) pair within a forecast.
///
/// `unit` and `target` are the human names (unit abbreviation, target name)
/// as submitted; identifiers are attached after resolution. `data_hash` is
/// empty until the hasher assigns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PredictionElement {
    pub unit: String,
    pub target: String,
    pub body: ElementBody,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_hash: Option<String>,
}

impl PredictionElement {
    pub fn new(unit: impl Into<String>, target: impl Into<String>, data: PredictionData) -> Self {
        Self {
            unit: unit.into(),
            target: target.into(),
            body: ElementBody::Prediction(data),
            data_hash: None,
        }
    }

    pub fn retraction(
        unit: impl Into<String>,
        target: impl Into<String>,
        pred_class: PredClass,
    ) -> Self {
        Self {
            unit: unit.into(),
            target: target.into(),
            body: ElementBody::Retraction { pred_class },
            data_hash: None,
        }
    }

    #[must_use]
    pub const fn pred_class(&self) -> PredClass {
        match &self.body {
            ElementBody::Prediction(data) => data.pred_class(),
            ElementBody::Retraction { pred_class } => *pred_class,
        }
    }

    #[must_use]
    pub const fn is_retract(&self) -> bool {
        matches!(self.body, ElementBody::Retraction { .. })
    }

    /// The payload, or `None` for a retraction.
    #[must_use]
    pub const fn data(&self) -> Option<&PredictionData> {
        match &self.body {
            ElementBody::Prediction(data) => Some(data),
            ElementBody::Retraction { .. } => None,
        }
    }

    #[must_use]
    pub fn key(&self) -> ElementKey {
        ElementKey {
            unit: self.unit.clone(),
            target: self.target.clone(),
            pred_class: self.pred_class(),
        }
    }
}

/// Scope key under which at most one element may be current.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
pub struct ElementKey {
    pub unit: String,
    pub target: String,
    pub pred_class: PredClass,
}

// ---------------------------------------------------------------------------
// ElementSet
// ---------------------------------------------------------------------------

/// The ordered element collection exclusively owned by one forecast.
///
/// Order is submission order and is significant: it decides which element a
/// retraction supersedes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ElementSet {
    elements: Vec<PredictionElement>,
}

impl ElementSet {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            elements: Vec::new(),
        }
    }

    pub fn push(&mut self, element: PredictionElement) {
        self.elements.push(element);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PredictionElement> {
        self.elements.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, PredictionElement> {
        self.elements.iter_mut()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[PredictionElement] {
        &self.elements
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<PredictionElement> {
        self.elements
    }

    /// Indices of every element per key, in submission order.
    #[must_use]
    pub fn by_key(&self) -> BTreeMap<ElementKey, Vec<usize>> {
        let mut map: BTreeMap<ElementKey, Vec<usize>> = BTreeMap::new();
        for (idx, element) in self.elements.iter().enumerate() {
            map.entry(element.key()).or_default().push(idx);
        }
        map
    }

    /// Fold the element sequence into the current state per key.
    ///
    /// The latest element for a key wins; if it is a retraction the key maps
    /// to `None` (absent).
    #[must_use]
    pub fn current_state(&self) -> BTreeMap<ElementKey, Option<&PredictionElement>> {
        self.elements.iter().fold(BTreeMap::new(), |mut state, element| {
            let current = if element.is_retract() {
                None
            } else {
                Some(element)
            };
            state.insert(element.key(), current);
            state
        })
    }

    /// The current element for `key`, or `None` if it was never predicted or
    /// its latest element is a retraction.
    #[must_use]
    pub fn current(&self, key: &ElementKey) -> Option<&PredictionElement> {
        self.elements
            .iter()
            .rev()
            .find(|element| {
                element.unit == key.unit
                    && element.target == key.target
                    && element.pred_class() == key.pred_class
            })
            .filter(|element| !element.is_retract())
    }

    /// Every current (non-retracted) element, ordered by key.
    #[must_use]
    pub fn current_elements(&self) -> Vec<&PredictionElement> {
        self.current_state().into_values().flatten().collect()
    }
}

impl FromIterator<PredictionElement> for ElementSet {
    fn from_iter<I: IntoIterator<Item = PredictionElement>>(iter: I) -> Self {
        Self {
            elements: iter.into_iter().collect(),
        }
    }
}

impl Extend<PredictionElement> for ElementSet {
    fn extend<I: IntoIterator<Item = PredictionElement>>(&mut self, iter: I) {
        self.elements.extend(iter);
    }
}

impl From<Vec<PredictionElement>> for ElementSet {
    fn from(elements: Vec<PredictionElement>) -> Self {
        Self { elements }
    }
}

impl<'a> IntoIterator for &'a ElementSet {
    type Item = &'a PredictionElement;
    type IntoIter = std::slice::Iter<'a, PredictionElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

impl IntoIterator for ElementSet {
    type Item = PredictionElement;
    type IntoIter = std::vec::IntoIter<PredictionElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.into_iter()
    }
}
