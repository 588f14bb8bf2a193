//! Project-specific row rules for the quantile dialect.

use chrono::NaiveDate;
use fcst_core::value::DATE_FORMAT;

use super::QuantileRow;

/// Extra checks run on every data row of a quantile file.
///
/// Returns one message per problem; an empty list accepts the row. Rows
/// are seen before the built-in type and value checks, so a validator
/// must tolerate cells those checks will reject.
pub trait RowValidator: Send + Sync {
    fn check(&self, row: &QuantileRow<'_>) -> Vec<String>;
}

impl<F> RowValidator for F
where
    F: Fn(&QuantileRow<'_>) -> Vec<String> + Send + Sync,
{
    fn check(&self, row: &QuantileRow<'_>) -> Vec<String> {
        self(row)
    }
}

/// Rejects negative numbers in `value`, whatever the row type.
#[derive(Debug, Clone, Copy, Default)]
pub struct NonNegativeValues;

impl RowValidator for NonNegativeValues {
    fn check(&self, row: &QuantileRow<'_>) -> Vec<String> {
        match row.value().parse::<f64>() {
            Ok(value) if value < 0.0 => vec![format!(
                "entries in the `value` column must be non-negative: {:?}",
                row.value()
            )],
            _ => Vec::new(),
        }
    }
}

/// Requires the named columns to hold `YYYY-MM-DD` dates.
///
/// The columns must also be passed to
/// [`QuantileCsv::with_required_columns`](super::QuantileCsv::with_required_columns).
#[derive(Debug, Clone, Default)]
pub struct DateColumns {
    columns: Vec<String>,
}

impl DateColumns {
    #[must_use]
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }
}

impl RowValidator for DateColumns {
    fn check(&self, row: &QuantileRow<'_>) -> Vec<String> {
        self.columns
            .iter()
            .filter_map(|column| {
                let cell = row.get(column).unwrap_or_default();
                NaiveDate::parse_from_str(cell, DATE_FORMAT)
                    .is_err()
                    .then(|| format!("invalid {column} date: {cell:?}"))
            })
            .collect()
    }
}
