//! Row-oriented tabular format.
//!
//! One row per (unit, target, payload fragment). Bin, sample, and quantile
//! elements span several consecutive rows; a group closes when a row with a
//! different (unit, target, class) begins. Parsing never consults a project:
//! it builds a candidate element set that the validator checks afterwards.
//!
//! Row order is preserved both ways. A row is accepted only when each of its
//! cells is already in the form rendering writes back (integral floats in
//! value columns keep a `.0`, numeric columns use their shortest form), and
//! only the columns its class uses are filled. Any accepted input therefore
//! renders back to itself.

use std::io;

use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use fcst_config::CodecConfig;
use fcst_core::enums::PredClass;
use fcst_core::prediction::{
    BinData, BinEntry, ElementBody, ElementSet, NamedData, PredictionData, PredictionElement,
    QuantileData, QuantileEntry, SampleData,
};
use fcst_core::value::PredValue;
use serde::{Deserialize, Serialize};

use crate::columns::{Column, index_header, optional_columns, required_columns};
use crate::error::{CodecError, RowError};

// ---------------------------------------------------------------------------
// Row
// ---------------------------------------------------------------------------

/// One tabular row. An empty cell means "not given".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub unit: String,
    pub target: String,
    pub class: String,
    pub value: String,
    pub cat: String,
    pub prob: String,
    pub sample: String,
    pub quantile: String,
    pub family: String,
    pub param1: String,
    pub param2: String,
    pub param3: String,
}

impl Row {
    #[must_use]
    pub fn get(&self, column: Column) -> &str {
        match column {
            Column::Unit => &self.unit,
            Column::Target => &self.target,
            Column::Class => &self.class,
            Column::Value => &self.value,
            Column::Cat => &self.cat,
            Column::Prob => &self.prob,
            Column::Sample => &self.sample,
            Column::Quantile => &self.quantile,
            Column::Family => &self.family,
            Column::Param1 => &self.param1,
            Column::Param2 => &self.param2,
            Column::Param3 => &self.param3,
        }
    }

    pub fn set(&mut self, column: Column, cell: impl Into<String>) {
        let slot = match column {
            Column::Unit => &mut self.unit,
            Column::Target => &mut self.target,
            Column::Class => &mut self.class,
            Column::Value => &mut self.value,
            Column::Cat => &mut self.cat,
            Column::Prob => &mut self.prob,
            Column::Sample => &mut self.sample,
            Column::Quantile => &mut self.quantile,
            Column::Family => &mut self.family,
            Column::Param1 => &mut self.param1,
            Column::Param2 => &mut self.param2,
            Column::Param3 => &mut self.param3,
        };
        *slot = cell.into();
    }

    /// Cells in canonical column order.
    #[must_use]
    pub fn cells(&self) -> [&str; 12] {
        Column::ALL.map(|column| self.get(column))
    }

    fn from_record(record: &StringRecord, index: &[usize]) -> Self {
        let mut row = Self::default();
        for column in Column::ALL {
            if let Some(cell) = record.get(index[column.index()]) {
                row.set(column, cell);
            }
        }
        row
    }
}

/// Shortest plain text for a number in a numeric column.
pub(crate) fn format_number(number: f64) -> String {
    format!("{number}")
}

/// Text `cell` renders back as once parsed, or `None` for free-text columns.
fn canonical_cell(column: Column, cell: &str) -> Result<Option<String>, String> {
    if column.is_numeric() {
        match cell.parse::<f64>() {
            Ok(number) if number.is_finite() => Ok(Some(format_number(number))),
            _ => Err(format!("{column} must be a finite number, got {cell:?}")),
        }
    } else if column.holds_value() {
        Ok(Some(PredValue::parse_cell(cell).to_string()))
    } else {
        Ok(None)
    }
}

fn parse_number(row: &Row, column: Column) -> Result<f64, String> {
    let cell = row.get(column);
    match cell.parse::<f64>() {
        Ok(number) if number.is_finite() => Ok(number),
        _ => Err(format!("{column} must be a finite number, got {cell:?}")),
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// One row's contribution to the element set.
enum Fragment {
    /// A complete single-row element, or a retraction.
    Whole(PredictionElement),
    /// One row of a multi-row element.
    Part {
        unit: String,
        target: String,
        part: Part,
    },
}

enum Part {
    Bin(BinEntry),
    Sample(PredValue),
    Quantile(QuantileEntry),
}

impl Part {
    fn into_data(self) -> PredictionData {
        match self {
            Self::Bin(entry) => PredictionData::Bin(BinData {
                entries: vec![entry],
            }),
            Self::Sample(draw) => PredictionData::Sample(SampleData {
                samples: vec![draw],
            }),
            Self::Quantile(entry) => PredictionData::Quantile(QuantileData {
                entries: vec![entry],
            }),
        }
    }
}

/// Append `part` to `open` if it continues the same group. Hands the part
/// back otherwise.
fn absorb(open: &mut PredictionElement, unit: &str, target: &str, part: Part) -> Option<Part> {
    if open.unit != unit || open.target != target {
        return Some(part);
    }
    match (&mut open.body, part) {
        (ElementBody::Prediction(PredictionData::Bin(data)), Part::Bin(entry)) => {
            data.entries.push(entry);
        }
        (ElementBody::Prediction(PredictionData::Sample(data)), Part::Sample(draw)) => {
            data.samples.push(draw);
        }
        (ElementBody::Prediction(PredictionData::Quantile(data)), Part::Quantile(entry)) => {
            data.entries.push(entry);
        }
        (_, part) => return Some(part),
    }
    None
}

/// Converts between [`Row`]s and prediction elements.
#[derive(Debug, Clone)]
pub struct TabularCodec {
    retract_token: String,
}

impl Default for TabularCodec {
    fn default() -> Self {
        Self::new(&CodecConfig::default())
    }
}

impl TabularCodec {
    #[must_use]
    pub fn new(config: &CodecConfig) -> Self {
        Self {
            retract_token: config.retract_token.clone(),
        }
    }

    #[must_use]
    pub fn retract_token(&self) -> &str {
        &self.retract_token
    }

    /// Parse rows into an element set.
    ///
    /// A bad row is skipped and reported; parsing continues so every bad row
    /// is listed. A skipped row does not close the group it sits in.
    ///
    /// # Errors
    ///
    /// `CodecError::MalformedRows` listing every bad row (1-based).
    pub fn parse(&self, rows: &[Row]) -> Result<ElementSet, CodecError> {
        tracing::debug!(rows = rows.len(), "parsing tabular rows");
        let mut elements = ElementSet::new();
        let mut errors = Vec::new();
        let mut open: Option<PredictionElement> = None;

        for (idx, row) in rows.iter().enumerate() {
            match self.parse_row(row) {
                Err(reason) => errors.push(RowError::new(idx + 1, reason)),
                Ok(Fragment::Whole(element)) => {
                    elements.extend(open.take());
                    elements.push(element);
                }
                Ok(Fragment::Part { unit, target, part }) => {
                    let leftover = match open.as_mut() {
                        Some(current) => absorb(current, &unit, &target, part),
                        None => Some(part),
                    };
                    if let Some(part) = leftover {
                        elements.extend(open.take());
                        open = Some(PredictionElement::new(unit, target, part.into_data()));
                    }
                }
            }
        }
        elements.extend(open);

        if errors.is_empty() {
            tracing::debug!(elements = elements.len(), "parsed tabular rows");
            Ok(elements)
        } else {
            tracing::warn!(errors = errors.len(), "tabular input has malformed rows");
            Err(CodecError::MalformedRows(errors))
        }
    }

    fn parse_row(&self, row: &Row) -> Result<Fragment, String> {
        if row.unit.is_empty() {
            return Err("missing unit".into());
        }
        if row.target.is_empty() {
            return Err("missing target".into());
        }
        let class: PredClass = row
            .class
            .parse()
            .map_err(|_| format!("unrecognized class {:?}", row.class))?;

        let required = required_columns(class);
        let optional = optional_columns(class);
        let stray: Vec<&str> = Column::ALL
            .into_iter()
            .filter(|column| !column.is_key() && !row.get(*column).is_empty())
            .filter(|column| !required.contains(column) && !optional.contains(column))
            .map(Column::as_str)
            .collect();
        if !stray.is_empty() {
            return Err(format!(
                "{class} row fills column(s) it does not use: {}",
                stray.join(", ")
            ));
        }

        let missing: Vec<&str> = required
            .iter()
            .filter(|column| row.get(**column).is_empty())
            .map(|column| column.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(format!(
                "{class} row is missing required column(s): {}",
                missing.join(", ")
            ));
        }

        let retracted = required
            .iter()
            .filter(|column| row.get(**column) == self.retract_token)
            .count();
        if retracted == required.len() {
            return Ok(Fragment::Whole(PredictionElement::retraction(
                row.unit.as_str(),
                row.target.as_str(),
                class,
            )));
        }
        if retracted > 0 {
            return Err(format!(
                "a retraction must hold {:?} in every required column of a {class} row",
                self.retract_token
            ));
        }

        for column in required.iter().chain(optional) {
            let cell = row.get(*column);
            if cell.is_empty() {
                continue;
            }
            if let Some(canonical) = canonical_cell(*column, cell)? {
                if canonical != cell {
                    return Err(format!(
                        "{column} cell {cell:?} is not in canonical form, write it as {canonical:?}"
                    ));
                }
            }
        }

        let whole = |data: PredictionData| -> Result<Fragment, String> {
            Ok(Fragment::Whole(PredictionElement::new(
                row.unit.as_str(),
                row.target.as_str(),
                data,
            )))
        };
        let part = |part: Part| -> Result<Fragment, String> {
            Ok(Fragment::Part {
                unit: row.unit.clone(),
                target: row.target.clone(),
                part,
            })
        };

        match class {
            PredClass::Point | PredClass::Mean | PredClass::Median | PredClass::Mode => {
                let value = PredValue::parse_cell(&row.value);
                let data = PredictionData::scalar(class, value)
                    .ok_or_else(|| format!("{class} is not a single-value class"))?;
                whole(data)
            }
            PredClass::Named => {
                let mut params = vec![parse_number(row, Column::Param1)?];
                let given: Vec<Column> = optional
                    .iter()
                    .copied()
                    .filter(|column| !row.get(*column).is_empty())
                    .collect();
                if given == [Column::Param3] {
                    return Err("param3 given without param2".into());
                }
                for column in given {
                    params.push(parse_number(row, column)?);
                }
                whole(PredictionData::Named(NamedData {
                    family: row.family.clone(),
                    params,
                }))
            }
            PredClass::Bin => part(Part::Bin(BinEntry {
                cat: PredValue::parse_cell(&row.cat),
                prob: parse_number(row, Column::Prob)?,
            })),
            PredClass::Sample => part(Part::Sample(PredValue::parse_cell(&row.sample))),
            PredClass::Quantile => part(Part::Quantile(QuantileEntry {
                quantile: parse_number(row, Column::Quantile)?,
                value: PredValue::parse_cell(&row.value),
            })),
        }
    }

    // -----------------------------------------------------------------------
    // Rendering
    // -----------------------------------------------------------------------

    /// Render elements as rows, in element order.
    ///
    /// A retraction renders as one row. An element with an empty multi-row
    /// payload renders no rows.
    #[must_use]
    pub fn render(&self, elements: &ElementSet) -> Vec<Row> {
        let rows: Vec<Row> = elements
            .iter()
            .flat_map(|element| self.render_element(element))
            .collect();
        tracing::debug!(elements = elements.len(), rows = rows.len(), "rendered tabular rows");
        rows
    }

    fn render_element(&self, element: &PredictionElement) -> Vec<Row> {
        let base = Row {
            unit: element.unit.clone(),
            target: element.target.clone(),
            class: element.pred_class().as_str().to_string(),
            ..Row::default()
        };

        let data = match &element.body {
            ElementBody::Retraction { pred_class } => {
                let mut row = base;
                for column in required_columns(*pred_class) {
                    row.set(*column, self.retract_token.as_str());
                }
                return vec![row];
            }
            ElementBody::Prediction(data) => data,
        };

        match data {
            PredictionData::Point(scalar)
            | PredictionData::Mean(scalar)
            | PredictionData::Median(scalar)
            | PredictionData::Mode(scalar) => vec![Row {
                value: scalar.value.to_string(),
                ..base
            }],
            PredictionData::Named(named) => {
                let mut row = Row {
                    family: named.family.clone(),
                    ..base
                };
                for (column, param) in [Column::Param1, Column::Param2, Column::Param3]
                    .into_iter()
                    .zip(&named.params)
                {
                    row.set(column, format_number(*param));
                }
                vec![row]
            }
            PredictionData::Bin(bin) => bin
                .entries
                .iter()
                .map(|entry| Row {
                    cat: entry.cat.to_string(),
                    prob: format_number(entry.prob),
                    ..base.clone()
                })
                .collect(),
            PredictionData::Sample(sample) => sample
                .samples
                .iter()
                .map(|draw| Row {
                    sample: draw.to_string(),
                    ..base.clone()
                })
                .collect(),
            PredictionData::Quantile(quantile) => quantile
                .entries
                .iter()
                .map(|entry| Row {
                    quantile: format_number(entry.quantile),
                    value: entry.value.to_string(),
                    ..base.clone()
                })
                .collect(),
        }
    }

    // -----------------------------------------------------------------------
    // CSV I/O
    // -----------------------------------------------------------------------

    /// Read rows from CSV text. Columns may appear in any order but each must
    /// appear exactly once and no others may appear. Cells are trimmed.
    ///
    /// # Errors
    ///
    /// `CodecError::MalformedRows` listing header problems (row 0) or rows
    /// whose cell count does not match the header; `CodecError::Csv` if the
    /// header cannot be read.
    pub fn read_rows<R: io::Read>(&self, reader: R) -> Result<Vec<Row>, CodecError> {
        let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(reader);
        let headers = reader.headers()?.clone();
        let (index, problems) = index_header(&headers, &Column::ALL.map(Column::as_str));
        let index = match index {
            Some(index) if problems.is_empty() => index,
            _ => {
                tracing::warn!(problems = problems.len(), "tabular header rejected");
                return Err(CodecError::MalformedRows(
                    problems.into_iter().map(RowError::header).collect(),
                ));
            }
        };

        let mut rows = Vec::new();
        let mut errors = Vec::new();
        for (idx, record) in reader.records().enumerate() {
            match record {
                Ok(record) => rows.push(Row::from_record(&record, &index)),
                Err(err) => errors.push(RowError::new(idx + 1, err.to_string())),
            }
        }
        if errors.is_empty() {
            Ok(rows)
        } else {
            Err(CodecError::MalformedRows(errors))
        }
    }

    /// Read and parse CSV text into an element set.
    ///
    /// # Errors
    ///
    /// See [`read_rows`](Self::read_rows) and [`parse`](Self::parse).
    pub fn read_csv<R: io::Read>(&self, reader: R) -> Result<ElementSet, CodecError> {
        let rows = self.read_rows(reader)?;
        self.parse(&rows)
    }

    /// Write rows as CSV text with the canonical header.
    ///
    /// # Errors
    ///
    /// `CodecError::Csv` or `CodecError::Io` on write failure.
    pub fn write_rows<W: io::Write>(&self, rows: &[Row], writer: W) -> Result<(), CodecError> {
        let mut writer = WriterBuilder::new().from_writer(writer);
        writer.write_record(Column::ALL.map(Column::as_str))?;
        for row in rows {
            writer.write_record(row.cells())?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Render elements and write them as CSV text.
    ///
    /// # Errors
    ///
    /// See [`write_rows`](Self::write_rows).
    pub fn write_csv<W: io::Write>(
        &self,
        elements: &ElementSet,
        writer: W,
    ) -> Result<(), CodecError> {
        self.write_rows(&self.render(elements), writer)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn row(unit: &str, target: &str, class: &str, cells: &[(Column, &str)]) -> Row {
        let mut row = Row {
            unit: unit.into(),
            target: target.into(),
            class: class.into(),
            ..Row::default()
        };
        for (column, cell) in cells {
            row.set(*column, *cell);
        }
        row
    }

    #[test]
    fn bin_rows_accumulate_into_one_element() {
        let rows = vec![
            row("UnitA", "Target1", "bin", &[(Column::Cat, "low"), (Column::Prob, "0.3")]),
            row("UnitA", "Target1", "bin", &[(Column::Cat, "high"), (Column::Prob, "0.7")]),
        ];
        let set = TabularCodec::default().parse(&rows).unwrap();
        assert_eq!(set.len(), 1);
        let PredictionData::Bin(bin) = set.as_slice()[0].data().unwrap() else {
            panic!("expected bin");
        };
        assert_eq!(bin.entries.len(), 2);
        assert_eq!(bin.entries[1].cat, PredValue::from("high"));
    }

    #[test]
    fn group_closes_on_key_change() {
        let rows = vec![
            row("u1", "t1", "sample", &[(Column::Sample, "1")]),
            row("u1", "t1", "sample", &[(Column::Sample, "2")]),
            row("u2", "t1", "sample", &[(Column::Sample, "3")]),
            row("u1", "t1", "point", &[(Column::Value, "4")]),
            row("u1", "t1", "sample", &[(Column::Sample, "5")]),
        ];
        let set = TabularCodec::default().parse(&rows).unwrap();
        let classes: Vec<_> = set.iter().map(PredictionElement::pred_class).collect();
        assert_eq!(
            classes,
            vec![PredClass::Sample, PredClass::Sample, PredClass::Point, PredClass::Sample]
        );
    }

    #[test]
    fn consecutive_single_row_elements_stay_separate() {
        let rows = vec![
            row("u1", "t1", "point", &[(Column::Value, "1")]),
            row("u1", "t1", "point", &[(Column::Value, "1")]),
        ];
        assert_eq!(TabularCodec::default().parse(&rows).unwrap().len(), 2);
    }

    #[test]
    fn retraction_row_fills_every_required_column() {
        let rows = vec![row(
            "u1",
            "t1",
            "quantile",
            &[(Column::Quantile, "NULL"), (Column::Value, "NULL")],
        )];
        let set = TabularCodec::default().parse(&rows).unwrap();
        assert!(set.as_slice()[0].is_retract());
        assert_eq!(set.as_slice()[0].pred_class(), PredClass::Quantile);
    }

    #[test]
    fn all_row_errors_are_reported() {
        let rows = vec![
            row("u1", "t1", "histogram", &[(Column::Value, "1")]),
            row("u1", "t1", "bin", &[(Column::Cat, "a")]),
            row("u1", "t1", "bin", &[(Column::Cat, "a"), (Column::Prob, "lots")]),
            row("u1", "t1", "point", &[(Column::Value, "1")]),
            row("u1", "t1", "quantile", &[(Column::Quantile, "NULL"), (Column::Value, "3")]),
            row("", "t1", "point", &[(Column::Value, "1")]),
            row(
                "u1",
                "t1",
                "named",
                &[(Column::Family, "norm"), (Column::Param1, "0"), (Column::Param3, "1")],
            ),
        ];
        let err = TabularCodec::default().parse(&rows).unwrap_err();
        let numbers: Vec<usize> = err.row_errors().iter().map(|e| e.row).collect();
        assert_eq!(numbers, vec![1, 2, 3, 5, 6, 7]);
        assert!(err.row_errors()[0].reason.contains("unrecognized class"));
        assert!(err.row_errors()[1].reason.contains("prob"));
    }

    #[test]
    fn named_params_are_collected_in_order() {
        let rows = vec![row(
            "u1",
            "t1",
            "named",
            &[(Column::Family, "gamma"), (Column::Param1, "1.5"), (Column::Param2, "2")],
        )];
        let set = TabularCodec::default().parse(&rows).unwrap();
        let PredictionData::Named(named) = set.as_slice()[0].data().unwrap() else {
            panic!("expected named");
        };
        assert_eq!(named.family, "gamma");
        assert_eq!(named.params, vec![1.5, 2.0]);
    }

    #[test]
    fn render_is_inverse_of_parse() {
        let rows = vec![
            row("u1", "t1", "point", &[(Column::Value, "1.0")]),
            row("u1", "t1", "mean", &[(Column::Value, "12")]),
            row(
                "u1",
                "t1",
                "named",
                &[(Column::Family, "norm"), (Column::Param1, "1"), (Column::Param2, "0.5")],
            ),
            row("u1", "t1", "bin", &[(Column::Cat, "true"), (Column::Prob, "0.25")]),
            row("u1", "t1", "bin", &[(Column::Cat, "false"), (Column::Prob, "0.75")]),
            row("u1", "t2", "sample", &[(Column::Sample, "2020-01-05")]),
            row("u1", "t2", "quantile", &[(Column::Quantile, "0.5"), (Column::Value, "2.5")]),
            row("u1", "t2", "quantile", &[(Column::Quantile, "0.025"), (Column::Value, "1.0")]),
            row("u2", "t1", "bin", &[(Column::Cat, "NULL"), (Column::Prob, "NULL")]),
        ];
        let codec = TabularCodec::default();
        assert_eq!(codec.render(&codec.parse(&rows).unwrap()), rows);
    }

    #[test]
    fn custom_retract_token() {
        let codec = TabularCodec::new(&CodecConfig {
            retract_token: "RETRACT".into(),
        });
        let rows = vec![row("u1", "t1", "point", &[(Column::Value, "RETRACT")])];
        let set = codec.parse(&rows).unwrap();
        assert!(set.as_slice()[0].is_retract());
        assert_eq!(codec.render(&set), rows);
    }

    #[test]
    fn csv_header_problems_are_row_zero() {
        let text = "unit,target,class,value\nu1,t1,point,1\n";
        let err = TabularCodec::default().read_csv(text.as_bytes()).unwrap_err();
        assert!(err.row_errors().iter().all(|e| e.row == 0));
        assert!(err.to_string().contains("missing column \"cat\""));
    }
}
