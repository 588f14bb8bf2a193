//! Scalar values carried by predictions.
//!
//! A `PredValue` is what a point prediction holds, what a bin category or a
//! sample draw is, and what a quantile maps to. Its JSON form is the bare
//! JSON scalar (`true`, `3`, `2.5`, `"high"`), so the exchange format does not
//! need a type tag. Dates travel as `YYYY-MM-DD` text and are interpreted only
//! when the target type says so.

use std::cmp::Ordering;
use std::fmt;

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Date format used for date-typed values and timezero references.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A single prediction value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum PredValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl PredValue {
    /// Interpret a non-empty tabular cell.
    ///
    /// Order of attempts: integer, finite float, boolean (any case), text.
    #[must_use]
    pub fn parse_cell(cell: &str) -> Self {
        if let Ok(int) = cell.parse::<i64>() {
            return Self::Int(int);
        }
        if let Ok(float) = cell.parse::<f64>() {
            if float.is_finite() {
                return Self::Float(float);
            }
        }
        if cell.eq_ignore_ascii_case("true") {
            return Self::Bool(true);
        }
        if cell.eq_ignore_ascii_case("false") {
            return Self::Bool(false);
        }
        Self::Text(cell.to_string())
    }

    /// Numeric view of integer and float values.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(int) => Some(*int as f64),
            Self::Float(float) => Some(*float),
            Self::Bool(_) | Self::Text(_) => None,
        }
    }

    /// Date view of text values in `YYYY-MM-DD` form.
    #[must_use]
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Text(text) => NaiveDate::parse_from_str(text, DATE_FORMAT).ok(),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Float(_))
    }

    const fn type_rank(&self) -> u8 {
        match self {
            Self::Bool(_) => 0,
            Self::Int(_) | Self::Float(_) => 1,
            Self::Text(_) => 2,
        }
    }

    /// Equality that treats numbers by magnitude, so `Int(1)` and
    /// `Float(1.0)` name the same category.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn same_value(&self, other: &Self) -> bool {
        match (self.as_f64(), other.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => self == other,
        }
    }

    /// Total order over values: booleans, then numbers, then text.
    ///
    /// Numbers compare by magnitude (`Int(1)` and `Float(1.0)` tie and fall
    /// back to integer-first); text compares bytewise.
    #[must_use]
    pub fn canonical_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (a, b) if a.is_numeric() && b.is_numeric() => {
                let (x, y) = (a.as_f64().unwrap_or_default(), b.as_f64().unwrap_or_default());
                x.total_cmp(&y)
                    .then_with(|| matches!(a, Self::Float(_)).cmp(&matches!(b, Self::Float(_))))
            }
            (a, b) => a.type_rank().cmp(&b.type_rank()),
        }
    }
}

impl fmt::Display for PredValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(int) => write!(f, "{int}"),
            // Keep a fractional part so the cell re-parses as a float.
            Self::Float(float) if float.fract() == 0.0 => write!(f, "{float:.1}"),
            Self::Float(float) => write!(f, "{float}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

impl From<f64> for PredValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<i64> for PredValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for PredValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for PredValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}
