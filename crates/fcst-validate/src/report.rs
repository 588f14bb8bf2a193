//! Violations and the validation report.

use std::collections::BTreeMap;
use std::fmt;

use fcst_core::enums::PredClass;
use fcst_core::prediction::PredictionElement;
use serde::Serialize;

// ---------------------------------------------------------------------------
// ErrorKind / Stage
// ---------------------------------------------------------------------------

/// Error taxonomy a rule belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Ambiguous,
    /// Any rule not covered by a more specific kind.
    ValidationFailure,
    DuplicateElement,
    DanglingRetraction,
    Conflict,
}

/// Reporting order of rules: structure, then references, then individual
/// elements, then the forecast as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Structure,
    References,
    Element,
    Forecast,
}

// ---------------------------------------------------------------------------
// Rule
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    // Project structure
    DuplicateUnit,
    DuplicateTarget,
    DuplicateTimezero,
    DuplicateModel,
    MultipleOracles,
    StepAheadHorizon,
    EmptyForecast,
    // References
    UnknownModel,
    UnknownTimezero,
    UnknownUnit,
    UnknownTarget,
    AmbiguousReference,
    // Elements
    ClassNotAllowed,
    ValueType,
    CategoryNotAllowed,
    NonNumericCentral,
    UnknownFamily,
    FamilyTargetMismatch,
    ParamCount,
    ParamRange,
    BinEmpty,
    BinProbabilityRange,
    BinSum,
    BinDuplicateCategory,
    SampleEmpty,
    QuantileEmpty,
    QuantileLevelRange,
    QuantileDuplicateLevel,
    QuantileMonotonic,
    // Forecast
    DuplicateElement,
    Conflict,
    DanglingRetraction,
}

impl Rule {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DuplicateUnit => "duplicate_unit",
            Self::DuplicateTarget => "duplicate_target",
            Self::DuplicateTimezero => "duplicate_timezero",
            Self::DuplicateModel => "duplicate_model",
            Self::MultipleOracles => "multiple_oracles",
            Self::StepAheadHorizon => "step_ahead_horizon",
            Self::EmptyForecast => "empty_forecast",
            Self::UnknownModel => "unknown_model",
            Self::UnknownTimezero => "unknown_timezero",
            Self::UnknownUnit => "unknown_unit",
            Self::UnknownTarget => "unknown_target",
            Self::AmbiguousReference => "ambiguous_reference",
            Self::ClassNotAllowed => "class_not_allowed",
            Self::ValueType => "value_type",
            Self::CategoryNotAllowed => "category_not_allowed",
            Self::NonNumericCentral => "non_numeric_central",
            Self::UnknownFamily => "unknown_family",
            Self::FamilyTargetMismatch => "family_target_mismatch",
            Self::ParamCount => "param_count",
            Self::ParamRange => "param_range",
            Self::BinEmpty => "bin_empty",
            Self::BinProbabilityRange => "bin_probability_range",
            Self::BinSum => "bin_sum",
            Self::BinDuplicateCategory => "bin_duplicate_category",
            Self::SampleEmpty => "sample_empty",
            Self::QuantileEmpty => "quantile_empty",
            Self::QuantileLevelRange => "quantile_level_range",
            Self::QuantileDuplicateLevel => "quantile_duplicate_level",
            Self::QuantileMonotonic => "quantile_monotonic",
            Self::DuplicateElement => "duplicate_element",
            Self::Conflict => "conflict",
            Self::DanglingRetraction => "dangling_retraction",
        }
    }

    #[must_use]
    pub const fn kind(self) -> ErrorKind {
        match self {
            Self::UnknownModel
            | Self::UnknownTimezero
            | Self::UnknownUnit
            | Self::UnknownTarget => ErrorKind::NotFound,
            Self::AmbiguousReference => ErrorKind::Ambiguous,
            Self::DuplicateElement => ErrorKind::DuplicateElement,
            Self::DanglingRetraction => ErrorKind::DanglingRetraction,
            Self::Conflict => ErrorKind::Conflict,
            _ => ErrorKind::ValidationFailure,
        }
    }

    #[must_use]
    pub const fn stage(self) -> Stage {
        match self {
            Self::DuplicateUnit
            | Self::DuplicateTarget
            | Self::DuplicateTimezero
            | Self::DuplicateModel
            | Self::MultipleOracles
            | Self::StepAheadHorizon
            | Self::EmptyForecast => Stage::Structure,
            Self::UnknownModel
            | Self::UnknownTimezero
            | Self::UnknownUnit
            | Self::UnknownTarget
            | Self::AmbiguousReference => Stage::References,
            Self::DuplicateElement | Self::Conflict | Self::DanglingRetraction => Stage::Forecast,
            _ => Stage::Element,
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Violation
// ---------------------------------------------------------------------------

/// One broken rule, scoped to the element it concerns when there is one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub rule: Rule,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pred_class: Option<PredClass>,
    /// Position of the element in its forecast.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element: Option<usize>,
    pub message: String,
}

impl Violation {
    /// A violation not tied to one element.
    pub fn general(rule: Rule, message: impl Into<String>) -> Self {
        Self {
            rule,
            unit: None,
            target: None,
            pred_class: None,
            element: None,
            message: message.into(),
        }
    }

    /// A violation about the element at `index`.
    pub fn at(
        rule: Rule,
        index: usize,
        element: &PredictionElement,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule,
            unit: Some(element.unit.clone()),
            target: Some(element.target.clone()),
            pred_class: Some(element.pred_class()),
            element: Some(index),
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.rule.kind()
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.rule)?;
        if let (Some(unit), Some(target)) = (&self.unit, &self.target) {
            write!(f, " {unit}/{target}")?;
            if let Some(class) = self.pred_class {
                write!(f, "/{class}")?;
            }
        }
        write!(f, ": {}", self.message)
    }
}

// ---------------------------------------------------------------------------
// ValidationReport
// ---------------------------------------------------------------------------

/// Every violation found in one validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    violations: Vec<Violation>,
}

impl ValidationReport {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            violations: Vec::new(),
        }
    }

    pub fn push(&mut self, violation: Violation) {
        self.violations.push(violation);
    }

    pub fn merge(&mut self, other: Self) {
        self.violations.extend(other.violations);
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.violations.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    #[must_use]
    pub fn into_violations(self) -> Vec<Violation> {
        self.violations
    }

    /// Whether any violation broke `rule`.
    #[must_use]
    pub fn has(&self, rule: Rule) -> bool {
        self.violations.iter().any(|v| v.rule == rule)
    }

    #[must_use]
    pub fn count(&self, rule: Rule) -> usize {
        self.violations.iter().filter(|v| v.rule == rule).count()
    }

    /// Human-readable messages ordered by rule stage, at most `max_per_rule`
    /// per rule, each elided rule followed by an `... and N more` line.
    #[must_use]
    pub fn summarized(&self, max_per_rule: usize) -> Vec<String> {
        let mut by_rule: BTreeMap<(Stage, Rule), Vec<&Violation>> = BTreeMap::new();
        for violation in &self.violations {
            by_rule
                .entry((violation.rule.stage(), violation.rule))
                .or_default()
                .push(violation);
        }

        let mut lines = Vec::new();
        for ((_, rule), violations) in by_rule {
            lines.extend(violations.iter().take(max_per_rule).map(ToString::to_string));
            if violations.len() > max_per_rule {
                lines.push(format!(
                    "[{rule}] ... and {} more",
                    violations.len() - max_per_rule
                ));
            }
        }
        lines
    }
}

impl FromIterator<Violation> for ValidationReport {
    fn from_iter<I: IntoIterator<Item = Violation>>(iter: I) -> Self {
        Self {
            violations: iter.into_iter().collect(),
        }
    }
}

impl Extend<Violation> for ValidationReport {
    fn extend<I: IntoIterator<Item = Violation>>(&mut self, iter: I) {
        self.violations.extend(iter);
    }
}
