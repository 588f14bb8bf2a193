//! Quantile CSV dialect.
//!
//! A narrower tabular format carrying only point and quantile predictions:
//! header `location,target,type,quantile,value` in any order. Point rows are
//! one element each; quantile rows are grouped by (location, target) in
//! first-appearance order, whether or not they are consecutive. A value
//! equal to the retract token retracts; a quantile group must then be
//! retracted in every row. A point row leaves `quantile` empty or non-numeric.
//!
//! Projects add their own columns and row rules through
//! [`QuantileCsv::with_required_columns`] and [`QuantileCsv::with_row_validator`].

mod checks;

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::io;
use std::sync::Arc;

use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use fcst_config::CodecConfig;
use fcst_core::enums::PredClass;
use fcst_core::prediction::{
    ElementBody, ElementSet, PredictionData, PredictionElement, QuantileData, QuantileEntry,
    ScalarData,
};
use fcst_core::value::PredValue;

use crate::columns::index_header;
use crate::error::{CodecError, RowError};
use crate::tabular::format_number;

pub use checks::{DateColumns, NonNegativeValues, RowValidator};

/// Header columns, in the order they are written.
pub const QUANTILE_COLUMNS: [&str; 5] = ["location", "target", "type", "quantile", "value"];

const LOCATION: usize = 0;
const TARGET: usize = 1;
const TYPE: usize = 2;
const QUANTILE: usize = 3;
const VALUE: usize = 4;

/// An error naming the column whose cell broke a rule.
fn bad_cell(row: usize, column: &str, rule: &str, cell: &str) -> RowError {
    RowError::new(row, format!("entries in the `{column}` column must be {rule}: {cell:?}"))
}

/// One accumulated quantile group: first row number and its entries.
/// A `None` value marks a retracted row.
struct QuantileGroup {
    first_row: usize,
    entries: Vec<(f64, Option<PredValue>)>,
}

/// One data row as a [`RowValidator`] sees it.
#[derive(Debug)]
pub struct QuantileRow<'a> {
    record: &'a StringRecord,
    columns: &'a [&'a str],
    positions: &'a [usize],
    target_known: bool,
}

impl QuantileRow<'_> {
    /// Cell of a base or additionally required column.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&str> {
        let slot = self.columns.iter().position(|name| *name == column)?;
        self.record.get(self.positions[slot])
    }

    fn base(&self, slot: usize) -> &str {
        self.record.get(self.positions[slot]).unwrap_or_default()
    }

    #[must_use]
    pub fn location(&self) -> &str {
        self.base(LOCATION)
    }

    #[must_use]
    pub fn target(&self) -> &str {
        self.base(TARGET)
    }

    #[must_use]
    pub fn row_type(&self) -> &str {
        self.base(TYPE)
    }

    #[must_use]
    pub fn quantile(&self) -> &str {
        self.base(QUANTILE)
    }

    #[must_use]
    pub fn value(&self) -> &str {
        self.base(VALUE)
    }

    /// False when valid targets were given and this row's target is not one.
    #[must_use]
    pub const fn is_target_known(&self) -> bool {
        self.target_known
    }
}

/// Reads and writes the quantile CSV dialect.
#[derive(Clone)]
pub struct QuantileCsv {
    retract_token: String,
    valid_targets: Option<BTreeSet<String>>,
    extra_columns: Vec<String>,
    validators: Vec<Arc<dyn RowValidator>>,
}

impl fmt::Debug for QuantileCsv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuantileCsv")
            .field("retract_token", &self.retract_token)
            .field("valid_targets", &self.valid_targets)
            .field("extra_columns", &self.extra_columns)
            .field("validators", &self.validators.len())
            .finish()
    }
}

impl Default for QuantileCsv {
    fn default() -> Self {
        Self::new(&CodecConfig::default())
    }
}

impl QuantileCsv {
    #[must_use]
    pub fn new(config: &CodecConfig) -> Self {
        Self {
            retract_token: config.retract_token.clone(),
            valid_targets: None,
            extra_columns: Vec::new(),
            validators: Vec::new(),
        }
    }

    /// Restrict target names. Unknown names are reported once, together.
    #[must_use]
    pub fn with_valid_targets<I, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.valid_targets = Some(targets.into_iter().map(Into::into).collect());
        self
    }

    /// Require columns beyond the base five. Their cells reach row
    /// validators through [`QuantileRow::get`]; [`write`](Self::write)
    /// emits the base columns only.
    #[must_use]
    pub fn with_required_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for column in columns {
            let column = column.into();
            if !QUANTILE_COLUMNS.contains(&column.as_str()) && !self.extra_columns.contains(&column)
            {
                self.extra_columns.push(column);
            }
        }
        self
    }

    /// Run `validator` on every data row. Its messages are reported as
    /// errors of that row, alongside the built-in checks.
    #[must_use]
    pub fn with_row_validator(mut self, validator: impl RowValidator + 'static) -> Self {
        self.validators.push(Arc::new(validator));
        self
    }

    /// Parse a quantile CSV file.
    ///
    /// Duplicate or missing header columns stop parsing. Every other problem
    /// (unexpected columns, bad types, out-of-range quantiles, non-numeric
    /// values, partially retracted groups, unknown targets, no data rows) is
    /// collected and reported together.
    ///
    /// # Errors
    ///
    /// `CodecError::MalformedRows` with header and file-level problems as
    /// row 0; `CodecError::Csv` if the header cannot be read.
    pub fn read<R: io::Read>(&self, reader: R) -> Result<ElementSet, CodecError> {
        let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(reader);
        let headers = reader.headers()?.clone();
        let columns: Vec<&str> = QUANTILE_COLUMNS
            .into_iter()
            .chain(self.extra_columns.iter().map(String::as_str))
            .collect();
        let (index, problems) = index_header(&headers, &columns);
        let mut errors: Vec<RowError> = problems.into_iter().map(RowError::header).collect();
        let Some(index) = index else {
            return Err(CodecError::MalformedRows(errors));
        };

        // Elements in first-appearance order. Quantile slots are filled from
        // `groups` once every row has been read.
        let mut order: Vec<Option<PredictionElement>> = Vec::new();
        let mut groups: HashMap<(String, String), (usize, QuantileGroup)> = HashMap::new();
        let mut unknown_targets = BTreeSet::new();
        let mut data_rows = 0;

        for (idx, record) in reader.records().enumerate() {
            let row = idx + 1;
            let record = match record {
                Ok(record) => record,
                Err(err) => {
                    errors.push(RowError::new(row, err.to_string()));
                    continue;
                }
            };
            data_rows += 1;
            let cell = |slot: usize| record.get(index[slot]).unwrap_or_default();
            let (location, target) = (cell(LOCATION), cell(TARGET));

            let target_known = self
                .valid_targets
                .as_ref()
                .is_none_or(|valid| valid.contains(target));
            if !target_known {
                unknown_targets.insert(target.to_string());
            }
            let view = QuantileRow {
                record: &record,
                columns: &columns,
                positions: &index,
                target_known,
            };
            for validator in &self.validators {
                errors.extend(
                    validator
                        .check(&view)
                        .into_iter()
                        .map(|message| RowError::new(row, message)),
                );
            }

            let value = cell(VALUE);
            let retracted = value == self.retract_token;
            let parsed_value = if retracted {
                None
            } else {
                match value.parse::<f64>() {
                    Ok(number) if number.is_finite() => Some(PredValue::parse_cell(value)),
                    _ => {
                        errors.push(bad_cell(row, "value", "a number", value));
                        continue;
                    }
                }
            };

            match cell(TYPE) {
                "point" => {
                    let level = cell(QUANTILE);
                    if level.parse::<f64>().is_ok_and(f64::is_finite) {
                        errors.push(bad_cell(row, "quantile", "empty for `point` entries", level));
                        continue;
                    }
                    let element = match parsed_value {
                        Some(value) => PredictionElement::new(
                            location,
                            target,
                            PredictionData::Point(ScalarData { value }),
                        ),
                        None => PredictionElement::retraction(location, target, PredClass::Point),
                    };
                    order.push(Some(element));
                }
                "quantile" => {
                    let level = cell(QUANTILE);
                    let quantile = match level.parse::<f64>() {
                        Ok(q) if (0.0..=1.0).contains(&q) => q,
                        _ if retracted && level == self.retract_token => f64::NAN,
                        _ => {
                            errors.push(bad_cell(row, "quantile", "a number in [0, 1]", level));
                            continue;
                        }
                    };
                    let key = (location.to_string(), target.to_string());
                    let (_, group) = groups.entry(key).or_insert_with(|| {
                        order.push(None);
                        (
                            order.len() - 1,
                            QuantileGroup {
                                first_row: row,
                                entries: Vec::new(),
                            },
                        )
                    });
                    group.entries.push((quantile, parsed_value));
                }
                other => errors.push(bad_cell(row, "type", "\"point\" or \"quantile\"", other)),
            }
        }

        let mut slotted: Vec<_> = groups.into_iter().collect();
        slotted.sort_by_key(|(_, (slot, _))| *slot);
        for ((location, target), (slot, group)) in slotted {
            let retracted = group.entries.iter().filter(|(_, v)| v.is_none()).count();
            let element = if retracted == group.entries.len() {
                PredictionElement::retraction(location, target, PredClass::Quantile)
            } else if retracted > 0 {
                errors.push(RowError::new(
                    group.first_row,
                    format!(
                        "retracted quantile values must all be {:?}, only {retracted} of {} were",
                        self.retract_token,
                        group.entries.len()
                    ),
                ));
                continue;
            } else {
                let entries = group
                    .entries
                    .into_iter()
                    .filter_map(|(quantile, value)| {
                        value.map(|value| QuantileEntry { quantile, value })
                    })
                    .collect();
                PredictionElement::new(
                    location,
                    target,
                    PredictionData::Quantile(QuantileData { entries }),
                )
            };
            order[slot] = Some(element);
        }

        if !unknown_targets.is_empty() {
            let names: Vec<String> = unknown_targets.into_iter().collect();
            errors.push(RowError::header(format!(
                "invalid target name(s): {}",
                names.join(", ")
            )));
        }
        if data_rows == 0 {
            errors.push(RowError::header("no data rows in file"));
        }

        if errors.is_empty() {
            let elements: ElementSet = order.into_iter().flatten().collect();
            tracing::debug!(rows = data_rows, elements = elements.len(), "parsed quantile csv");
            Ok(elements)
        } else {
            errors.sort_by_key(|e| e.row);
            tracing::warn!(errors = errors.len(), "quantile csv rejected");
            Err(CodecError::MalformedRows(errors))
        }
    }

    /// Write point and quantile elements in the quantile dialect. Elements
    /// of other classes are skipped.
    ///
    /// # Errors
    ///
    /// `CodecError::Csv` or `CodecError::Io` on write failure.
    pub fn write<W: io::Write>(&self, elements: &ElementSet, writer: W) -> Result<(), CodecError> {
        let mut writer = WriterBuilder::new().from_writer(writer);
        writer.write_record(QUANTILE_COLUMNS)?;
        let token = self.retract_token.as_str();
        for element in elements {
            let (unit, target) = (element.unit.as_str(), element.target.as_str());
            match &element.body {
                ElementBody::Retraction {
                    pred_class: PredClass::Point,
                } => writer.write_record([unit, target, "point", "", token])?,
                ElementBody::Retraction {
                    pred_class: PredClass::Quantile,
                } => writer.write_record([unit, target, "quantile", token, token])?,
                ElementBody::Prediction(PredictionData::Point(point)) => {
                    let value = point.value.to_string();
                    writer.write_record([unit, target, "point", "", value.as_str()])?;
                }
                ElementBody::Prediction(PredictionData::Quantile(quantile)) => {
                    for entry in &quantile.entries {
                        let level = format_number(entry.quantile);
                        let value = entry.value.to_string();
                        writer.write_record([unit, target, "quantile", &level, &value])?;
                    }
                }
                _ => {}
            }
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn read(text: &str) -> Result<ElementSet, CodecError> {
        QuantileCsv::default().read(text.as_bytes())
    }

    #[test]
    fn groups_quantiles_by_location_and_target() {
        let text = "\
location,target,type,quantile,value
US,1 wk ahead cum death,point,NA,7
US,1 wk ahead cum death,quantile,0.025,5
MA,1 wk ahead cum death,quantile,0.5,1
US,1 wk ahead cum death,quantile,0.975,9
";
        let set = read(text).unwrap();
        assert_eq!(set.len(), 3);
        let classes: Vec<_> = set.iter().map(|e| (e.unit.as_str(), e.pred_class())).collect();
        assert_eq!(
            classes,
            vec![
                ("US", PredClass::Point),
                ("US", PredClass::Quantile),
                ("MA", PredClass::Quantile),
            ]
        );
        let PredictionData::Quantile(quantile) = set.as_slice()[1].data().unwrap() else {
            panic!("expected quantile");
        };
        assert_eq!(quantile.entries.len(), 2);
    }

    #[test]
    fn columns_may_be_reordered() {
        let text = "value,quantile,type,target,location\n3,0.5,quantile,t1,US\n";
        assert_eq!(read(text).unwrap().len(), 1);
    }

    #[test]
    fn fully_retracted_group_is_one_retraction() {
        let text = "\
location,target,type,quantile,value
US,t1,quantile,0.1,NULL
US,t1,quantile,0.9,NULL
US,t1,point,NA,NULL
";
        let set = read(text).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.iter().all(PredictionElement::is_retract));
    }

    #[test]
    fn every_problem_is_reported() {
        let text = "\
location,target,type,quantile,value,extra
US,t1,quantile,1.5,3,x
US,t1,quantile,0.5,abc,x
US,t1,bogus,0.5,3,x
MA,t1,quantile,0.1,NULL,x
MA,t1,quantile,0.9,4,x
";
        let err = read(text).unwrap_err();
        let rows: Vec<usize> = err.row_errors().iter().map(|e| e.row).collect();
        assert_eq!(rows, vec![0, 1, 2, 3, 4]);
        assert!(err.row_errors()[0].reason.contains("unexpected column"));
        assert!(err.row_errors()[4].reason.contains("only 1 of 2"));
    }

    #[test]
    fn missing_column_stops_parsing() {
        let err = read("location,target,type,value\nUS,t1,point,1\n").unwrap_err();
        assert_eq!(err.row_errors().len(), 1);
        assert!(err.row_errors()[0].reason.contains("quantile"));
    }

    #[test]
    fn empty_file_is_an_error() {
        let err = read("location,target,type,quantile,value\n").unwrap_err();
        assert!(err.to_string().contains("no data rows"));
    }

    #[test]
    fn unknown_targets_are_listed_together() {
        let text = "\
location,target,type,quantile,value
US,bad1,point,NA,1
US,bad2,point,NA,1
US,good,point,NA,1
";
        let err = QuantileCsv::default()
            .with_valid_targets(["good"])
            .read(text.as_bytes())
            .unwrap_err();
        assert_eq!(err.row_errors().len(), 1);
        assert!(err.row_errors()[0].reason.contains("bad1, bad2"));
    }

    #[test]
    fn point_rows_need_an_empty_quantile() {
        let text = "\
location,target,type,quantile,value
US,t1,point,0.5,7
US,t1,point,,8
US,t1,point,NA,9
";
        let err = read(text).unwrap_err();
        assert_eq!(err.row_errors().len(), 1);
        assert_eq!(err.row_errors()[0].row, 1);
        assert!(err.row_errors()[0].reason.contains("empty for `point` entries"));
    }

    #[test]
    fn extra_required_columns_reach_row_validators() {
        let text = "\
forecast_date,location,target,type,quantile,value,target_end_date
2020-05-04,US,1 wk ahead cum death,point,NA,-3,
2020-05-04,US,1 wk ahead cum death,quantile,0.5,4,05/09/2020
2020-05-04,US,1 wk ahead cum death,quantile,0.9,6,2020-05-09
";
        let codec = QuantileCsv::default()
            .with_required_columns(["forecast_date", "target_end_date", "value"])
            .with_row_validator(NonNegativeValues)
            .with_row_validator(DateColumns::new(["forecast_date", "target_end_date"]));
        let err = codec.read(text.as_bytes()).unwrap_err();
        let found: Vec<(usize, &str)> = err
            .row_errors()
            .iter()
            .map(|e| (e.row, e.reason.as_str()))
            .collect();
        assert_eq!(
            found,
            vec![
                (1, "entries in the `value` column must be non-negative: \"-3\""),
                (1, "invalid target_end_date date: \"\""),
                (2, "invalid target_end_date date: \"05/09/2020\""),
            ]
        );
    }

    #[test]
    fn missing_extra_column_stops_parsing() {
        let err = QuantileCsv::default()
            .with_required_columns(["forecast_date"])
            .read("location,target,type,quantile,value\nUS,t1,point,,1\n".as_bytes())
            .unwrap_err();
        assert_eq!(err.row_errors().len(), 1);
        assert!(err.row_errors()[0].reason.contains("forecast_date"));
    }

    #[test]
    fn closures_are_row_validators() {
        let only_us = |row: &QuantileRow<'_>| -> Vec<String> {
            if row.location() == "US" {
                Vec::new()
            } else {
                vec![format!("unknown location {:?}", row.location())]
            }
        };
        let text = "location,target,type,quantile,value\nUS,t1,point,,1\nXX,t1,point,,2\n";
        let err = QuantileCsv::default()
            .with_row_validator(only_us)
            .read(text.as_bytes())
            .unwrap_err();
        assert_eq!(err.row_errors().len(), 1);
        assert_eq!(err.row_errors()[0].row, 2);
    }

    #[test]
    fn write_keeps_only_point_and_quantile() {
        let set: ElementSet = vec![
            PredictionElement::new(
                "US",
                "t1",
                PredictionData::Point(ScalarData {
                    value: PredValue::Float(7.0),
                }),
            ),
            PredictionElement::new(
                "US",
                "t1",
                PredictionData::Sample(fcst_core::prediction::SampleData {
                    samples: vec![PredValue::Int(1)],
                }),
            ),
            PredictionElement::new(
                "US",
                "t1",
                PredictionData::Quantile(QuantileData {
                    entries: vec![QuantileEntry {
                        quantile: 0.5,
                        value: PredValue::Float(6.5),
                    }],
                }),
            ),
            PredictionElement::retraction("MA", "t1", PredClass::Quantile),
        ]
        .into();
        let mut out = Vec::new();
        QuantileCsv::default().write(&set, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "location,target,type,quantile,value\n\
             US,t1,point,,7.0\n\
             US,t1,quantile,0.5,6.5\n\
             MA,t1,quantile,NULL,NULL\n"
        );
    }

    #[test]
    fn written_file_reads_back() {
        let text = "\
location,target,type,quantile,value
US,t1,point,,7.0
US,t1,quantile,0.25,6.5
US,t1,quantile,0.75,8.0
MA,t1,quantile,NULL,NULL
";
        let set = read(text).unwrap();
        let mut out = Vec::new();
        QuantileCsv::default().write(&set, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), text);
    }
}
