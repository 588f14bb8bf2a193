//! # fcst-store
//!
//! In-memory reference implementation of the forecast storage boundary.
//!
//! [`ForecastStore`] holds registered projects and their accepted forecasts
//! and enforces the constraints a relational store would: unique names per
//! project, a unique versioning key per forecast, and cascading deletes.
//! [`ForecastService`] runs uploads through validation and hashing before
//! inserting, and [`query`] exports current predictions as rows.

pub mod error;
pub mod query;
pub mod repos;
pub mod service;

use std::collections::BTreeMap;

use fcst_core::entities::{Forecast, Project};
use fcst_core::ids::format_id;

pub use error::StoreError;
pub use query::{ForecastQuery, QUERY_COLUMNS, QueryRow};
pub use service::{ForecastService, UploadOutcome};

/// Central handle for stored projects and forecasts.
///
/// A forecast is owned by the store entry for its id; its project is the
/// one owning its model.
#[derive(Debug, Default)]
pub struct ForecastStore {
    projects: Vec<Project>,
    forecasts: BTreeMap<String, Forecast>,
    next_seq: u32,
}

impl ForecastStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a prefixed identifier, e.g. `"fct-0000000a"`.
    pub fn generate_id(&mut self, prefix: &str) -> String {
        self.next_seq += 1;
        format_id(prefix, self.next_seq)
    }

    /// Every registered project, in registration order.
    #[must_use]
    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    /// Number of stored forecasts across all projects.
    #[must_use]
    pub fn forecast_count(&self) -> usize {
        self.forecasts.len()
    }
}
