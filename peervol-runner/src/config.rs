//! Serializable pipeline configuration.
//!
//! Every tunable that the pipeline stages need lives here and is passed down
//! explicitly. Missing TOML keys take the documented defaults.

use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use peervol_core::{ForecastConfig, SelectionConfig, SyntheticProvider, MAX_REPORTING_LAG_DAYS};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Synthetic-fallback settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Fall back to synthetic series when the external source cannot serve
    /// the target and at least one peer. Off by default.
    pub synthetic_fallback: bool,
    /// Master seed for the synthetic generator.
    pub synthetic_seed: u64,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            synthetic_fallback: false,
            synthetic_seed: SyntheticProvider::DEFAULT_SEED,
        }
    }
}

/// Full configuration for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Sector code targets are drawn from (GICS, e.g. "45").
    pub sector: String,
    /// Targets must list on or after this date. Also the first day of series data.
    pub start_date: NaiveDate,
    /// Last day of series data (inclusive).
    pub end_date: NaiveDate,
    /// Maximum peers per target.
    pub peer_count: usize,
    /// Trailing training rows per walk-forward step.
    pub window_size: usize,
    /// Target to forecast. `None` picks the first target in the sector.
    pub target: Option<String>,
    pub selection: SelectionConfig,
    pub forecast: ForecastConfig,
    pub data: DataConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sector: "45".to_string(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
            end_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap_or_default(),
            peer_count: 10,
            window_size: 6,
            target: None,
            selection: SelectionConfig::default(),
            forecast: ForecastConfig::default(),
            data: DataConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_size == 0 {
            return Err(ConfigError::Invalid("window_size must be positive".into()));
        }
        if self.peer_count == 0 {
            return Err(ConfigError::Invalid("peer_count must be positive".into()));
        }
        if self.start_date > self.end_date {
            return Err(ConfigError::Invalid(format!(
                "start_date {} is after end_date {}",
                self.start_date, self.end_date
            )));
        }
        if !(0..=MAX_REPORTING_LAG_DAYS).contains(&self.selection.reporting_lag_days) {
            return Err(ConfigError::Invalid(format!(
                "selection.reporting_lag_days must be within 0..={MAX_REPORTING_LAG_DAYS}"
            )));
        }
        Ok(())
    }

    /// Deterministic BLAKE3 hash of the config, for artifact naming.
    pub fn config_hash(&self) -> String {
        let json = serde_json::to_string(self).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}
