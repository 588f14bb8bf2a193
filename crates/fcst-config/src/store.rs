//! Storage boundary configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What to do when an upload's element hashes match an existing version of
/// the same (model, timezero).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdenticalVersionPolicy {
    /// Insert it as a new version anyway.
    #[default]
    Store,
    /// Do not insert; report the existing equivalent version.
    Skip,
}

impl IdenticalVersionPolicy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Store => "store",
            Self::Skip => "skip",
        }
    }
}

impl fmt::Display for IdenticalVersionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const fn default_max_query_rows() -> usize {
    200_000
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct StoreConfig {
    #[serde(default)]
    pub identical_version: IdenticalVersionPolicy,

    /// Maximum number of rows a forecast query may return.
    #[serde(default = "default_max_query_rows")]
    pub max_query_rows: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            identical_version: IdenticalVersionPolicy::default(),
            max_query_rows: default_max_query_rows(),
        }
    }
}
