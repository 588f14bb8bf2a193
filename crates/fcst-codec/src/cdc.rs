//! CDC FluSight CSV dialect.
//!
//! Header `location,target,type,unit,bin_start_incl,bin_end_notincl,value`.
//! Header names are compared without case or double quotes, and a trailing
//! empty column (from a trailing comma) is dropped from the header and from
//! every row. `type` is `Point` or `Bin`, in any case.
//!
//! Targets come in two scales:
//!
//! | scale   | targets                                          | bin category               |
//! |---------|--------------------------------------------------|----------------------------|
//! | week    | `Season onset`, `Season peak week`               | epi week number or `none`  |
//! | percent | `Season peak percentage`, `1 wk ahead` .. `4 wk` | lower bound of a 0.1 bin   |
//!
//! A point row leaves both bin columns `NA`. Bin rows of one (location,
//! target) become one bin element at the position of their first row; each
//! point row is its own element. `bin_end_notincl` is derived on write and
//! ignored on read. The dialect has no retractions.
//!
//! With a season start year, week-scale values are read as the `YYYY-MM-DD`
//! Monday of their epi week and written back as week numbers.

use std::collections::{BTreeSet, HashMap};
use std::io;

use chrono::{Datelike, Days, NaiveDate};
use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use fcst_core::prediction::{
    BinData, BinEntry, ElementBody, ElementSet, PredictionData, PredictionElement, ScalarData,
};
use fcst_core::value::{DATE_FORMAT, PredValue};

use crate::columns::index_header;
use crate::error::{CodecError, RowError};
use crate::tabular::format_number;

/// Header columns, in the order they are written.
pub const CDC_COLUMNS: [&str; 7] = [
    "location",
    "target",
    "type",
    "unit",
    "bin_start_incl",
    "bin_end_notincl",
    "value",
];

/// Cell text for "not applicable".
pub const NA: &str = "NA";

/// Week-scale bin category for "no onset".
pub const NO_ONSET: &str = "none";

pub const WEEK_TARGETS: [&str; 2] = ["Season onset", "Season peak week"];

pub const PERCENT_TARGETS: [&str; 5] = [
    "Season peak percentage",
    "1 wk ahead",
    "2 wk ahead",
    "3 wk ahead",
    "4 wk ahead",
];

const LOCATION: usize = 0;
const TARGET: usize = 1;
const TYPE: usize = 2;
const BIN_START: usize = 4;
const VALUE: usize = 6;

/// Highest percent bin: `[13, 100)`.
const TOP_PERCENT_BIN: f64 = 13.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scale {
    Week,
    Percent,
}

impl Scale {
    const fn unit(self) -> &'static str {
        match self {
            Self::Week => "week",
            Self::Percent => "percent",
        }
    }
}

// ---------------------------------------------------------------------------
// Epi weeks
// ---------------------------------------------------------------------------

/// Sunday that starts epi week 1 of `year`: the week holding January 4.
fn epi_year_start(year: i32) -> Option<NaiveDate> {
    let jan4 = NaiveDate::from_ymd_opt(year, 1, 4)?;
    jan4.checked_sub_days(Days::new(u64::from(jan4.weekday().num_days_from_sunday())))
}

/// Epi week number holding `date`.
#[must_use]
pub fn epi_week(date: NaiveDate) -> Option<u32> {
    let year = date.year();
    let mut start = epi_year_start(year)?;
    if date < start {
        start = epi_year_start(year - 1)?;
    } else if date >= epi_year_start(year + 1)? {
        return Some(1);
    }
    u32::try_from(date.signed_duration_since(start).num_days() / 7 + 1).ok()
}

/// Monday of epi week `week` in the season that starts in
/// `season_start_year`. Weeks 30 and later fall in the start year, earlier
/// weeks in the following one. `None` for a week the year does not have.
#[must_use]
pub fn monday_of_epi_week(week: u32, season_start_year: i32) -> Option<NaiveDate> {
    if !(1..=53).contains(&week) {
        return None;
    }
    let year = if week >= 30 {
        season_start_year
    } else {
        season_start_year + 1
    };
    let monday = epi_year_start(year)?.checked_add_days(Days::new(u64::from((week - 1) * 7 + 1)))?;
    (epi_week(monday) == Some(week)).then_some(monday)
}

/// Week number of an integral cell such as `7` or `7.0`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn week_number(cell: &str) -> Option<u32> {
    let number = cell.parse::<f64>().ok()?;
    (number.fract() == 0.0 && (1.0..=53.0).contains(&number)).then_some(number as u32)
}

/// Upper bound of the percent bin starting at `lower`.
fn percent_bin_end(lower: f64) -> f64 {
    if (lower - TOP_PERCENT_BIN).abs() < f64::EPSILON {
        100.0
    } else {
        ((lower * 10.0).round() + 1.0) / 10.0
    }
}

// ---------------------------------------------------------------------------
// Codec
// ---------------------------------------------------------------------------

/// One element slot in first-appearance order.
enum Slot {
    Point(PredictionElement),
    Bin {
        unit: String,
        target: String,
        entries: Vec<BinEntry>,
    },
}

/// Reads and writes the CDC FluSight CSV dialect.
#[derive(Debug, Clone)]
pub struct CdcCsv {
    week_targets: BTreeSet<String>,
    percent_targets: BTreeSet<String>,
    season_start_year: Option<i32>,
}

impl Default for CdcCsv {
    fn default() -> Self {
        Self {
            week_targets: WEEK_TARGETS.map(str::to_string).into(),
            percent_targets: PERCENT_TARGETS.map(str::to_string).into(),
            season_start_year: None,
        }
    }
}

impl CdcCsv {
    /// Replace the target names of both scales.
    #[must_use]
    pub fn with_targets<W, P, S>(mut self, week: W, percent: P) -> Self
    where
        W: IntoIterator<Item = S>,
        P: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.week_targets = week.into_iter().map(Into::into).collect();
        self.percent_targets = percent.into_iter().map(Into::into).collect();
        self
    }

    /// Read week-scale values as dates within this season.
    #[must_use]
    pub const fn with_season_start_year(mut self, year: i32) -> Self {
        self.season_start_year = Some(year);
        self
    }

    fn scale(&self, target: &str) -> Option<Scale> {
        if self.week_targets.contains(target) {
            Some(Scale::Week)
        } else if self.percent_targets.contains(target) {
            Some(Scale::Percent)
        } else {
            None
        }
    }

    /// A week-scale cell as stored: a Monday date when a season is set and
    /// the cell is a week number, lowercase text otherwise. `NA` and blank
    /// cells mean no onset.
    fn week_value(&self, cell: &str) -> PredValue {
        if cell.is_empty() || cell == NA {
            return PredValue::from(NO_ONSET);
        }
        let date = self
            .season_start_year
            .zip(week_number(cell))
            .and_then(|(year, week)| monday_of_epi_week(week, year));
        match date {
            Some(date) => PredValue::Text(date.format(DATE_FORMAT).to_string()),
            None => PredValue::Text(cell.to_lowercase()),
        }
    }

    /// A stored week-scale value as cell text.
    fn week_cell(&self, value: &PredValue) -> String {
        match (self.season_start_year, value.as_date().and_then(epi_week)) {
            (Some(_), Some(week)) => week.to_string(),
            _ => value.to_string(),
        }
    }

    /// Parse a CDC CSV file.
    ///
    /// Every bad row and every unknown target is reported together.
    ///
    /// # Errors
    ///
    /// `CodecError::MalformedRows` with header and file-level problems as
    /// row 0; `CodecError::Csv` if the header cannot be read.
    pub fn read<R: io::Read>(&self, reader: R) -> Result<ElementSet, CodecError> {
        let mut reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(reader);
        let raw = reader.headers()?.clone();
        let mut names: Vec<String> = raw
            .iter()
            .map(|name| name.replace('"', "").to_lowercase())
            .collect();
        if names.len() == CDC_COLUMNS.len() + 1 && names.last().is_some_and(String::is_empty) {
            names.pop();
        }
        let width = names.len();
        let (index, problems) = index_header(&StringRecord::from(names), &CDC_COLUMNS);
        let index = match index {
            Some(index) if problems.is_empty() => index,
            _ => {
                tracing::warn!(problems = problems.len(), "cdc header rejected");
                return Err(CodecError::MalformedRows(
                    problems.into_iter().map(RowError::header).collect(),
                ));
            }
        };

        let mut slots: Vec<Slot> = Vec::new();
        let mut bins: HashMap<(String, String), usize> = HashMap::new();
        let mut errors = Vec::new();
        let mut unknown_targets = BTreeSet::new();

        for (idx, record) in reader.records().enumerate() {
            let row = idx + 1;
            let record = match record {
                Ok(record) => record,
                Err(err) => {
                    errors.push(RowError::new(row, err.to_string()));
                    continue;
                }
            };
            let trailing = record.len() == width + 1 && record.get(width) == Some("");
            if record.len() != width && !trailing {
                errors.push(RowError::new(
                    row,
                    format!("expected {width} cells, found {}", record.len()),
                ));
                continue;
            }

            let cell = |slot: usize| record.get(index[slot]).unwrap_or_default();
            let (location, target) = (cell(LOCATION), cell(TARGET));
            let Some(scale) = self.scale(target) else {
                unknown_targets.insert(target.to_string());
                continue;
            };
            let value = cell(VALUE);

            match cell(TYPE).to_lowercase().as_str() {
                "point" => {
                    let value = match scale {
                        Scale::Week => self.week_value(value),
                        Scale::Percent => match value.parse::<f64>() {
                            Ok(number) if number.is_finite() => PredValue::parse_cell(value),
                            _ => {
                                errors.push(RowError::new(
                                    row,
                                    format!("point value must be a number: {value:?}"),
                                ));
                                continue;
                            }
                        },
                    };
                    slots.push(Slot::Point(PredictionElement::new(
                        location,
                        target,
                        PredictionData::Point(ScalarData { value }),
                    )));
                }
                "bin" => {
                    let prob = match value.parse::<f64>() {
                        Ok(prob) if prob.is_finite() => prob,
                        _ => {
                            errors.push(RowError::new(
                                row,
                                format!("bin value must be a probability: {value:?}"),
                            ));
                            continue;
                        }
                    };
                    let start = cell(BIN_START);
                    let cat = match scale {
                        Scale::Week => self.week_value(start),
                        Scale::Percent => match start.parse::<f64>() {
                            Ok(lower) if lower.is_finite() => PredValue::Float(lower),
                            _ => {
                                errors.push(RowError::new(
                                    row,
                                    format!("bin_start_incl must be a number: {start:?}"),
                                ));
                                continue;
                            }
                        },
                    };
                    let key = (location.to_string(), target.to_string());
                    let slot = *bins.entry(key).or_insert_with(|| {
                        slots.push(Slot::Bin {
                            unit: location.to_string(),
                            target: target.to_string(),
                            entries: Vec::new(),
                        });
                        slots.len() - 1
                    });
                    if let Slot::Bin { entries, .. } = &mut slots[slot] {
                        entries.push(BinEntry { cat, prob });
                    }
                }
                other => errors.push(RowError::new(
                    row,
                    format!("type must be \"Point\" or \"Bin\": {other:?}"),
                )),
            }
        }

        if !unknown_targets.is_empty() {
            let names: Vec<String> = unknown_targets.into_iter().collect();
            errors.push(RowError::header(format!(
                "invalid target name(s): {}",
                names.join(", ")
            )));
        }
        if errors.is_empty() {
            let elements: ElementSet = slots
                .into_iter()
                .map(|slot| match slot {
                    Slot::Point(element) => element,
                    Slot::Bin {
                        unit,
                        target,
                        entries,
                    } => {
                        let data = PredictionData::Bin(BinData { entries });
                        PredictionElement::new(unit, target, data)
                    }
                })
                .collect();
            tracing::debug!(elements = elements.len(), "parsed cdc csv");
            Ok(elements)
        } else {
            errors.sort_by_key(|e| e.row);
            tracing::warn!(errors = errors.len(), "cdc csv rejected");
            Err(CodecError::MalformedRows(errors))
        }
    }

    /// Write point and bin elements in the CDC dialect.
    ///
    /// # Errors
    ///
    /// `CodecError::Unrepresentable` for a retraction, another class, a
    /// target of neither scale, or a bin category the scale cannot hold;
    /// `CodecError::Csv` or `CodecError::Io` on write failure.
    pub fn write<W: io::Write>(&self, elements: &ElementSet, writer: W) -> Result<(), CodecError> {
        let mut writer = WriterBuilder::new().from_writer(writer);
        writer.write_record(CDC_COLUMNS)?;
        for element in elements {
            for record in self.element_records(element)? {
                writer.write_record(&record)?;
            }
        }
        writer.flush()?;
        Ok(())
    }

    fn element_records(&self, element: &PredictionElement) -> Result<Vec<[String; 7]>, CodecError> {
        let unrepresentable = |reason: String| CodecError::Unrepresentable {
            unit: element.unit.clone(),
            target: element.target.clone(),
            reason,
        };
        let scale = self
            .scale(&element.target)
            .ok_or_else(|| unrepresentable("target is not a CDC target".into()))?;
        let row = |kind: &str, start: String, end: String, value: String| {
            [
                element.unit.clone(),
                element.target.clone(),
                kind.to_string(),
                scale.unit().to_string(),
                start,
                end,
                value,
            ]
        };

        let data = match &element.body {
            ElementBody::Retraction { .. } => {
                return Err(unrepresentable("the CDC format has no retractions".into()));
            }
            ElementBody::Prediction(data) => data,
        };
        match (data, scale) {
            (PredictionData::Point(point), Scale::Week) => {
                let value = self.week_cell(&point.value);
                Ok(vec![row("Point", NA.into(), NA.into(), value)])
            }
            (PredictionData::Point(point), Scale::Percent) => {
                Ok(vec![row("Point", NA.into(), NA.into(), point.value.to_string())])
            }
            (PredictionData::Bin(bin), Scale::Week) => bin
                .entries
                .iter()
                .map(|entry| {
                    let start = self.week_cell(&entry.cat);
                    let end = if start == NO_ONSET {
                        NO_ONSET.to_string()
                    } else {
                        let week = start
                            .parse::<u32>()
                            .map_err(|_| unrepresentable(format!("week bin {start:?}")))?;
                        (week + 1).to_string()
                    };
                    Ok(row("Bin", start, end, format_number(entry.prob)))
                })
                .collect(),
            (PredictionData::Bin(bin), Scale::Percent) => bin
                .entries
                .iter()
                .map(|entry| {
                    let lower = entry
                        .cat
                        .as_f64()
                        .ok_or_else(|| unrepresentable(format!("percent bin {}", entry.cat)))?;
                    Ok(row(
                        "Bin",
                        format_number(lower),
                        format_number(percent_bin_end(lower)),
                        format_number(entry.prob),
                    ))
                })
                .collect(),
            (other, _) => Err(unrepresentable(format!(
                "{} predictions have no CDC form",
                other.pred_class()
            ))),
        }
    }
}
