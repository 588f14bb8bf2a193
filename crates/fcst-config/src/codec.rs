//! Tabular codec configuration.

use serde::{Deserialize, Serialize};

/// Default cell token marking a retraction row.
fn default_retract_token() -> String {
    "NULL".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct CodecConfig {
    /// Token that fills every required column of a retraction row.
    #[serde(default = "default_retract_token")]
    pub retract_token: String,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            retract_token: default_retract_token(),
        }
    }
}
