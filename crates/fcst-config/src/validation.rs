//! Validation rule configuration.
//!
//! Tolerances and the step-ahead horizon rules are project policy rather than
//! engine constants, so they live here.

use serde::{Deserialize, Serialize};

/// Absolute tolerance on the sum of bin probabilities.
const fn default_bin_sum_tolerance() -> f64 {
    1e-6
}

/// Relative tolerance when comparing adjacent quantile values.
const fn default_quantile_value_rel_tolerance() -> f64 {
    1e-5
}

const fn default_true() -> bool {
    true
}

const fn default_max_messages_per_rule() -> usize {
    10
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ValidationConfig {
    #[serde(default = "default_bin_sum_tolerance")]
    pub bin_sum_tolerance: f64,

    /// Two adjacent quantile values within this relative distance are
    /// treated as equal when checking monotonicity.
    #[serde(default = "default_quantile_value_rel_tolerance")]
    pub quantile_value_rel_tolerance: f64,

    /// Require step-ahead horizons to be whole numbers of the target's
    /// reference date unit.
    #[serde(default = "default_true")]
    pub integer_horizon: bool,

    /// Upper bound on step-ahead horizons. `None` means unbounded.
    #[serde(default)]
    pub max_horizon: Option<f64>,

    /// Let a retraction nullify a prediction made by an earlier version of
    /// the same (model, timezero) forecast.
    #[serde(default = "default_true")]
    pub allow_cross_version_retraction: bool,

    /// Cap on messages per rule in summarized reports.
    #[serde(default = "default_max_messages_per_rule")]
    pub max_messages_per_rule: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            bin_sum_tolerance: default_bin_sum_tolerance(),
            quantile_value_rel_tolerance: default_quantile_value_rel_tolerance(),
            integer_horizon: true,
            max_horizon: None,
            allow_cross_version_retraction: true,
            max_messages_per_rule: default_max_messages_per_rule(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        let config = ValidationConfig::default();
        assert!((config.bin_sum_tolerance - 1e-6).abs() < f64::EPSILON);
        assert!((config.quantile_value_rel_tolerance - 1e-5).abs() < f64::EPSILON);
        assert!(config.integer_horizon);
        assert!(config.max_horizon.is_none());
        assert!(config.allow_cross_version_retraction);
        assert_eq!(config.max_messages_per_rule, 10);
    }
}
