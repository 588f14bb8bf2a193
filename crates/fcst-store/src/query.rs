//! Forecast queries: current predictions of a project flattened to rows.

use std::collections::HashMap;
use std::io;

use chrono::{DateTime, NaiveDate, Utc};
use fcst_core::entities::{ForecastModel, Project, StoredElement, TimeZero};
use fcst_core::enums::PredClass;
use fcst_core::prediction::PredictionData;
use fcst_core::value::DATE_FORMAT;
use serde::Serialize;

use crate::ForecastStore;
use crate::error::StoreError;

/// Header of query output.
pub const QUERY_COLUMNS: [&str; 15] = [
    "model", "timezero", "season", "unit", "target", "class", "value", "cat", "prob", "sample",
    "quantile", "family", "param1", "param2", "param3",
];

/// Filters of a forecast query. An empty list matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForecastQuery {
    /// Model abbreviations.
    pub models: Vec<String>,
    /// Unit abbreviations.
    pub units: Vec<String>,
    /// Target names.
    pub targets: Vec<String>,
    pub timezeros: Vec<NaiveDate>,
    pub classes: Vec<PredClass>,
    /// Only versions issued at or before this instant.
    pub as_of: Option<DateTime<Utc>>,
}

/// One output row. Columns a class does not use are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueryRow {
    pub model: String,
    pub timezero: String,
    pub season: String,
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

/// Names in `wanted` that none of `known` carries, as `"{what} {name}"`.
fn unknown(what: &str, wanted: &[String], known: &[&str]) -> Vec<String> {
    wanted
        .iter()
        .filter(|name| !known.contains(&name.as_str()))
        .map(|name| format!("{what} {name}"))
        .collect()
}

fn selected<T: PartialEq>(filter: &[T], value: &T) -> bool {
    filter.is_empty() || filter.contains(value)
}

/// Flatten one stored element into rows sharing `base`.
fn element_rows(base: &QueryRow, stored: &StoredElement) -> Vec<QueryRow> {
    let with = |fill: &dyn Fn(&mut QueryRow)| {
        let mut row = base.clone();
        fill(&mut row);
        row
    };
    let Some(data) = stored.element.data() else {
        return Vec::new();
    };
    match data {
        PredictionData::Named(named) => vec![with(&|row| {
            row.family.clone_from(&named.family);
            let mut params = named.params.iter().map(ToString::to_string);
            row.param1 = params.next().unwrap_or_default();
            row.param2 = params.next().unwrap_or_default();
            row.param3 = params.next().unwrap_or_default();
        })],
        PredictionData::Bin(bin) => bin
            .entries
            .iter()
            .map(|entry| {
                with(&|row| {
                    row.cat = entry.cat.to_string();
                    row.prob = entry.prob.to_string();
                })
            })
            .collect(),
        PredictionData::Sample(sample) => sample
            .samples
            .iter()
            .map(|draw| with(&|row| row.sample = draw.to_string()))
            .collect(),
        PredictionData::Quantile(quantile) => quantile
            .entries
            .iter()
            .map(|entry| {
                with(&|row| {
                    row.quantile = entry.quantile.to_string();
                    row.value = entry.value.to_string();
                })
            })
            .collect(),
        scalar => scalar
            .as_scalar()
            .map(|data| with(&|row| row.value = data.value.to_string()))
            .into_iter()
            .collect(),
    }
}

/// Current predictions of `project` matching `query`, one row per payload
/// fragment, ordered by model, timezero date, and element key. Oracle
/// models are never included.
///
/// # Errors
///
/// `StoreError::UnknownReferences` listing every filter name that matches
/// nothing, `StoreError::TooManyRows` when the result would exceed
/// `max_rows`.
pub fn run_query(
    store: &ForecastStore,
    project: &Project,
    query: &ForecastQuery,
    max_rows: usize,
) -> Result<Vec<QueryRow>, StoreError> {
    let model_labels: Vec<&str> = project.models.iter().map(ForecastModel::label).collect();
    let unit_names: Vec<&str> = project.units.iter().map(|u| u.abbreviation.as_str()).collect();
    let target_names: Vec<&str> = project.targets.iter().map(|t| t.name.as_str()).collect();

    let mut names = unknown("model", &query.models, &model_labels);
    names.extend(unknown("unit", &query.units, &unit_names));
    names.extend(unknown("target", &query.targets, &target_names));
    names.extend(
        query
            .timezeros
            .iter()
            .filter(|date| !project.timezeros.iter().any(|tz| tz.timezero_date == **date))
            .map(|date| format!("timezero {}", date.format(DATE_FORMAT))),
    );
    if !names.is_empty() {
        return Err(StoreError::UnknownReferences { names });
    }

    let seasons = project.timezero_to_season_name();
    let mut timezeros: Vec<&TimeZero> = project
        .timezeros
        .iter()
        .filter(|tz| selected(&query.timezeros, &tz.timezero_date))
        .collect();
    timezeros.sort_by_key(|tz| tz.timezero_date);
    let units: HashMap<&str, &str> = project
        .units
        .iter()
        .map(|u| (u.id.as_str(), u.abbreviation.as_str()))
        .collect();
    let targets: HashMap<&str, &str> = project
        .targets
        .iter()
        .map(|t| (t.id.as_str(), t.name.as_str()))
        .collect();

    let mut rows = Vec::new();
    let models = project
        .models
        .iter()
        .filter(|m| !m.is_oracle && selected(&query.models, &m.label().to_string()));
    for model in models {
        for tz in &timezeros {
            for stored in store.current_elements(&model.id, &tz.id, query.as_of) {
                let unit = units.get(stored.unit_id.as_str()).copied().unwrap_or_default();
                let target = targets.get(stored.target_id.as_str()).copied().unwrap_or_default();
                let class = stored.element.pred_class();
                if !selected(&query.units, &unit.to_string())
                    || !selected(&query.targets, &target.to_string())
                    || !selected(&query.classes, &class)
                {
                    continue;
                }
                let base = QueryRow {
                    model: model.label().to_string(),
                    timezero: tz.timezero_date.format(DATE_FORMAT).to_string(),
                    season: seasons.get(&tz.id).cloned().flatten().unwrap_or_default(),
                    unit: unit.to_string(),
                    target: target.to_string(),
                    class: class.to_string(),
                    ..QueryRow::default()
                };
                rows.extend(element_rows(&base, stored));
                if rows.len() > max_rows {
                    return Err(StoreError::TooManyRows { limit: max_rows });
                }
            }
        }
    }

    tracing::debug!(project = %project.name, rows = rows.len(), "ran forecast query");
    Ok(rows)
}

/// Write query rows as CSV with the [`QUERY_COLUMNS`] header.
///
/// # Errors
///
/// `StoreError::Csv` on write failure.
pub fn write_rows<W: io::Write>(rows: &[QueryRow], writer: W) -> Result<(), StoreError> {
    let mut out = csv::Writer::from_writer(writer);
    if rows.is_empty() {
        out.write_record(QUERY_COLUMNS)?;
    }
    for row in rows {
        out.serialize(row)?;
    }
    out.flush().map_err(csv::Error::from)?;
    Ok(())
}
