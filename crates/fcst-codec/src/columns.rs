//! Tabular column layout.
//!
//! Which columns each prediction class fills:
//!
//! | class                        | required        | optional       | rows per element |
//! |------------------------------|-----------------|----------------|------------------|
//! | point / mean / median / mode | value           |                | 1                |
//! | named                        | family, param1  | param2, param3 | 1                |
//! | bin                          | cat, prob       |                | 1 per category   |
//! | sample                       | sample          |                | 1 per draw       |
//! | quantile                     | quantile, value |                | 1 per level      |
//!
//! `unit`, `target`, and `class` are required on every row.

use std::fmt;

use csv::StringRecord;
use fcst_core::enums::PredClass;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Unit,
    Target,
    Class,
    Value,
    Cat,
    Prob,
    Sample,
    Quantile,
    Family,
    Param1,
    Param2,
    Param3,
}

impl Column {
    /// Canonical header order.
    pub const ALL: [Self; 12] = [
        Self::Unit,
        Self::Target,
        Self::Class,
        Self::Value,
        Self::Cat,
        Self::Prob,
        Self::Sample,
        Self::Quantile,
        Self::Family,
        Self::Param1,
        Self::Param2,
        Self::Param3,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unit => "unit",
            Self::Target => "target",
            Self::Class => "class",
            Self::Value => "value",
            Self::Cat => "cat",
            Self::Prob => "prob",
            Self::Sample => "sample",
            Self::Quantile => "quantile",
            Self::Family => "family",
            Self::Param1 => "param1",
            Self::Param2 => "param2",
            Self::Param3 => "param3",
        }
    }

    /// Position in [`Column::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Columns every row fills, whatever its class.
    #[must_use]
    pub const fn is_key(self) -> bool {
        matches!(self, Self::Unit | Self::Target | Self::Class)
    }

    /// Columns holding a prediction value, read with [`PredValue::parse_cell`].
    ///
    /// [`PredValue::parse_cell`]: fcst_core::value::PredValue::parse_cell
    #[must_use]
    pub const fn holds_value(self) -> bool {
        matches!(self, Self::Value | Self::Cat | Self::Sample)
    }

    /// Columns whose cells must parse as finite numbers.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::Prob | Self::Quantile | Self::Param1 | Self::Param2 | Self::Param3
        )
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Columns a non-retracted row of `class` must fill. A retraction fills
/// each of them with the retract token instead.
#[must_use]
pub const fn required_columns(class: PredClass) -> &'static [Column] {
    match class {
        PredClass::Point | PredClass::Mean | PredClass::Median | PredClass::Mode => {
            &[Column::Value]
        }
        PredClass::Named => &[Column::Family, Column::Param1],
        PredClass::Bin => &[Column::Cat, Column::Prob],
        PredClass::Sample => &[Column::Sample],
        PredClass::Quantile => &[Column::Quantile, Column::Value],
    }
}

#[must_use]
pub const fn optional_columns(class: PredClass) -> &'static [Column] {
    match class {
        PredClass::Named => &[Column::Param2, Column::Param3],
        _ => &[],
    }
}

/// Map each expected column name to its position in `headers`.
///
/// Returns the positions when every expected name appears exactly once,
/// plus every problem found (duplicates, missing names, unexpected names).
/// Unexpected names alone still yield positions.
pub(crate) fn index_header<S: AsRef<str>>(
    headers: &StringRecord,
    expected: &[S],
) -> (Option<Vec<usize>>, Vec<String>) {
    let mut positions: Vec<Option<usize>> = vec![None; expected.len()];
    let mut problems = Vec::new();
    let mut fatal = false;

    for (pos, name) in headers.iter().enumerate() {
        match expected.iter().position(|e| e.as_ref() == name) {
            Some(slot) => {
                if positions[slot].replace(pos).is_some() {
                    problems.push(format!("duplicate column {name:?}"));
                    fatal = true;
                }
            }
            None => problems.push(format!("unexpected column {name:?}")),
        }
    }

    let mut index = vec![0; expected.len()];
    for (slot, position) in positions.iter().enumerate() {
        match position {
            Some(pos) => index[slot] = *pos,
            None => {
                problems.push(format!("missing column {:?}", expected[slot].as_ref()));
                fatal = true;
            }
        }
    }

    ((!fatal).then_some(index), problems)
}
