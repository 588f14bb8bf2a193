//! Prediction classes, target types, named distribution families, and
//! reference date units.
//!
//! All enums use `snake_case` serialization via `#[serde(rename_all = "snake_case")]`
//! and expose `as_str()` for the token used in tabular and exchange formats.
//! Compatibility tables (which classes a target type accepts, which families
//! apply to which target type) live next to the enums they describe.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

// ---------------------------------------------------------------------------
// PredClass
// ---------------------------------------------------------------------------

/// Discriminant of a prediction element's variant.
///
/// ```text
/// single value : point, mean, median, mode
/// parametric   : named
/// multi-row    : bin, sample, quantile
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum PredClass {
    Bin,
    Named,
    Point,
    Sample,
    Quantile,
    Mean,
    Median,
    Mode,
}

impl PredClass {
    pub const ALL: [Self; 8] = [
        Self::Bin,
        Self::Named,
        Self::Point,
        Self::Sample,
        Self::Quantile,
        Self::Mean,
        Self::Median,
        Self::Mode,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bin => "bin",
            Self::Named => "named",
            Self::Point => "point",
            Self::Sample => "sample",
            Self::Quantile => "quantile",
            Self::Mean => "mean",
            Self::Median => "median",
            Self::Mode => "mode",
        }
    }

    /// Whether one element of this class spans several tabular rows.
    #[must_use]
    pub const fn is_multi_row(self) -> bool {
        matches!(self, Self::Bin | Self::Sample | Self::Quantile)
    }

    /// Whether the payload is a single `value` (point, mean, median, mode).
    #[must_use]
    pub const fn is_scalar(self) -> bool {
        matches!(self, Self::Point | Self::Mean | Self::Median | Self::Mode)
    }
}

impl fmt::Display for PredClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PredClass {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|class| class.as_str() == s)
            .ok_or_else(|| CoreError::UnknownToken {
                kind: "pred_class",
                token: s.to_string(),
            })
    }
}

// ---------------------------------------------------------------------------
// TargetType
// ---------------------------------------------------------------------------

/// The kind of outcome a target describes. Determines which prediction
/// classes and which value types are acceptable for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Continuous,
    Discrete,
    Nominal,
    Binary,
    Date,
}

impl TargetType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Continuous => "continuous",
            Self::Discrete => "discrete",
            Self::Nominal => "nominal",
            Self::Binary => "binary",
            Self::Date => "date",
        }
    }

    /// Prediction classes a target of this type accepts.
    #[must_use]
    pub const fn allowed_classes(self) -> &'static [PredClass] {
        use PredClass::{Bin, Mean, Median, Mode, Named, Point, Quantile, Sample};
        match self {
            Self::Continuous | Self::Discrete => {
                &[Point, Named, Bin, Sample, Quantile, Mean, Median, Mode]
            }
            Self::Nominal => &[Point, Bin, Sample, Mode],
            Self::Binary => &[Point, Bin],
            Self::Date => &[Point, Bin, Sample, Quantile, Mode],
        }
    }

    #[must_use]
    pub fn accepts(self, class: PredClass) -> bool {
        self.allowed_classes().contains(&class)
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// NamedFamily
// ---------------------------------------------------------------------------

/// Recognized parametric distribution families for `named` predictions.
///
/// The family travels through the codec as a plain string; mapping it onto
/// this enum is a validation step, so an unknown family is reported as a rule
/// violation rather than a parse failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum NamedFamily {
    Norm,
    Lnorm,
    Gamma,
    Beta,
    Pois,
    Nbinom,
    Nbinom2,
}

impl NamedFamily {
    pub const ALL: [Self; 7] = [
        Self::Norm,
        Self::Lnorm,
        Self::Gamma,
        Self::Beta,
        Self::Pois,
        Self::Nbinom,
        Self::Nbinom2,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Norm => "norm",
            Self::Lnorm => "lnorm",
            Self::Gamma => "gamma",
            Self::Beta => "beta",
            Self::Pois => "pois",
            Self::Nbinom => "nbinom",
            Self::Nbinom2 => "nbinom2",
        }
    }

    /// Look up a family by its token. Returns `None` for unrecognized names.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|family| family.as_str() == token)
    }

    /// Number of parameters the family takes.
    #[must_use]
    pub const fn param_count(self) -> usize {
        match self {
            Self::Pois => 1,
            Self::Norm | Self::Lnorm | Self::Gamma | Self::Beta | Self::Nbinom | Self::Nbinom2 => 2,
        }
    }

    /// Target type the family's support matches.
    #[must_use]
    pub const fn target_type(self) -> TargetType {
        match self {
            Self::Norm | Self::Lnorm | Self::Gamma | Self::Beta => TargetType::Continuous,
            Self::Pois | Self::Nbinom | Self::Nbinom2 => TargetType::Discrete,
        }
    }
}

impl fmt::Display for NamedFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ReferenceDateType
// ---------------------------------------------------------------------------

/// Native time unit a step-ahead target's horizon is counted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceDateType {
    Day,
    Week,
    Biweek,
    Month,
}

impl ReferenceDateType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Biweek => "biweek",
            Self::Month => "month",
        }
    }
}

impl fmt::Display for ReferenceDateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
