//! # fcst-config
//!
//! Layered configuration loading for the forecast engine using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`FCST_*` prefix, `__` as separator)
//! 2. Project-level `.fcst/config.toml`
//! 3. User-level `~/.config/fcst/config.toml`
//! 4. Built-in defaults
//!
//! Figment maps `FCST_VALIDATION__BIN_SUM_TOLERANCE` -> `validation.bin_sum_tolerance`,
//! `FCST_STORE__IDENTICAL_VERSION` -> `store.identical_version`, etc.
//!
//! ```no_run
//! use fcst_config::FcstConfig;
//!
//! let config = FcstConfig::load_with_dotenv().expect("config");
//! println!("retract token: {}", config.codec.retract_token);
//! ```

mod codec;
mod error;
mod store;
mod validation;

pub use codec::CodecConfig;
pub use error::ConfigError;
pub use store::{IdenticalVersionPolicy, StoreConfig};
pub use validation::ValidationConfig;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct FcstConfig {
    #[serde(default)]
    pub codec: CodecConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

impl FcstConfig {
    /// Load configuration from all sources (TOML files + environment variables)
    /// and check it with [`validate`](Self::validate).
    ///
    /// Does NOT call `dotenvy`; use [`load_with_dotenv`](Self::load_with_dotenv)
    /// for `.env` file loading.
    ///
    /// # Errors
    ///
    /// `ConfigError::Figment` if a source cannot be parsed or extracted, or
    /// `ConfigError::InvalidValue` if a value is out of range.
    pub fn load() -> Result<Self, ConfigError> {
        let config: Self = Self::figment().extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with `.env` file support.
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load).
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        Self::load_dotenv_from_workspace();
        Self::load()
    }

    /// Build the figment provider chain.
    ///
    /// Public so tests can inspect the figment directly or add providers on top.
    #[must_use]
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(global_path));
            }
        }

        let local_path = PathBuf::from(".fcst/config.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        figment.merge(Env::prefixed("FCST_").split("__"))
    }

    /// Check value ranges that serde cannot express.
    ///
    /// # Errors
    ///
    /// `ConfigError::InvalidValue` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let validation = &self.validation;
        if !(validation.bin_sum_tolerance.is_finite() && validation.bin_sum_tolerance >= 0.0) {
            return Err(ConfigError::invalid(
                "validation.bin_sum_tolerance",
                "must be a finite, non-negative number",
            ));
        }
        if !(validation.quantile_value_rel_tolerance.is_finite()
            && validation.quantile_value_rel_tolerance >= 0.0)
        {
            return Err(ConfigError::invalid(
                "validation.quantile_value_rel_tolerance",
                "must be a finite, non-negative number",
            ));
        }
        if let Some(max) = validation.max_horizon {
            if !(max.is_finite() && max >= 0.0) {
                return Err(ConfigError::invalid(
                    "validation.max_horizon",
                    "must be a finite, non-negative number",
                ));
            }
        }
        if validation.max_messages_per_rule == 0 {
            return Err(ConfigError::invalid(
                "validation.max_messages_per_rule",
                "must be at least 1",
            ));
        }
        if self.codec.retract_token.trim().is_empty() {
            return Err(ConfigError::invalid(
                "codec.retract_token",
                "must not be blank",
            ));
        }
        if self.store.max_query_rows == 0 {
            return Err(ConfigError::invalid("store.max_query_rows", "must be at least 1"));
        }
        Ok(())
    }

    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("fcst").join("config.toml"))
    }

    /// Load `.env` from the workspace root, walking up from
    /// `CARGO_MANIFEST_DIR` when set, else from the current directory.
    /// Does nothing if no `.env` is found.
    fn load_dotenv_from_workspace() {
        if let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") {
            let mut dir = PathBuf::from(manifest_dir);
            // crate -> crates/ -> workspace root
            for _ in 0..3 {
                let env_path = dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                    return;
                }
                if !dir.pop() {
                    break;
                }
            }
        }

        let _ = dotenvy::dotenv();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = FcstConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.codec.retract_token, "NULL");
        assert_eq!(config.store.identical_version, IdenticalVersionPolicy::Store);
    }

    #[test]
    fn figment_builds_without_files() {
        let config: FcstConfig = FcstConfig::figment()
            .extract()
            .expect("should extract defaults");
        assert_eq!(config.validation.max_messages_per_rule, 10);
        assert_eq!(config.store.max_query_rows, 200_000);
    }

    #[test]
    fn negative_tolerance_is_rejected() {
        let mut config = FcstConfig::default();
        config.validation.bin_sum_tolerance = -1.0;
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref field, .. } if field == "validation.bin_sum_tolerance"
        ));
    }

    #[test]
    fn blank_retract_token_is_rejected() {
        let mut config = FcstConfig::default();
        config.codec.retract_token = "  ".into();
        assert!(config.validate().is_err());
    }
}
