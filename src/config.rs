//! Configuration for the monitor (machwatch.toml)
//!
//! Every field has a default, so an empty file (or no file at all) yields the
//! stock setup: one reading per minute, z-score scoring over the last 10
//! readings, CSV export every 10 readings.
//!
//! # Example machwatch.toml
//!
//! ```toml
//! [sensor]
//! vibration_min = 0.5
//! vibration_max = 5.0
//!
//! [scoring]
//! method = "isolation_forest"
//! contamination = 0.1
//!
//! [monitor]
//! interval_secs = 30
//!
//! [storage]
//! database_path = "/var/lib/machwatch/machine_health.jsonl"
//! csv_path = "/var/lib/machwatch/machine_data.csv"
//! ```

use crate::window::RetentionPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors raised while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Scoring algorithm used for each reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMethod {
    /// Combined z-score against the recent window
    #[default]
    Zscore,
    /// Isolation Forest fitted on the recent window
    IsolationForest,
}

/// Simulated sensor ranges
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Vibration lower bound (mm/s)
    pub vibration_min: f64,
    /// Vibration upper bound (mm/s, exclusive)
    pub vibration_max: f64,
    /// Temperature lower bound (°C)
    pub temperature_min: f64,
    /// Temperature upper bound (°C, exclusive)
    pub temperature_max: f64,
    /// Fixed RNG seed for reproducible simulated readings
    pub seed: Option<u64>,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            vibration_min: 0.5,
            vibration_max: 5.0,
            temperature_min: 20.0,
            temperature_max: 80.0,
            seed: None,
        }
    }
}

/// Anomaly scoring parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub method: ScoringMethod,
    /// Readings required in the window before any judgment is made (default: 5)
    pub min_history: usize,
    /// Number of most recent readings the score is computed against (default: 10)
    pub lookback: usize,
    /// Combined z-score above which a reading is flagged (default: 4.0)
    pub combined_threshold: f64,
    /// Expected share of outliers for the Isolation Forest (default: 0.1)
    pub contamination: f64,
    /// Trees in the Isolation Forest (default: 100)
    pub num_trees: usize,
    /// Isolation Forest RNG seed (default: 42)
    pub random_state: u64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            method: ScoringMethod::Zscore,
            min_history: 5,
            lookback: 10,
            combined_threshold: 4.0,
            contamination: 0.1,
            num_trees: 100,
            random_state: 42,
        }
    }
}

/// Acquisition loop cadence and alerting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    /// Seconds between readings (default: 60)
    pub interval_secs: u64,
    /// Scores strictly below this raise a maintenance alert (default: -0.5)
    pub alert_threshold: f64,
    /// Export the full history every N readings (default: 10)
    pub export_every: u64,
    /// Export once more when the loop stops gracefully (default: true)
    pub export_on_shutdown: bool,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            alert_threshold: -0.5,
            export_every: 10,
            export_on_shutdown: true,
        }
    }
}

impl MonitorSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Where readings are persisted and exported
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub database_path: PathBuf,
    pub csv_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("machine_health.jsonl"),
            csv_path: PathBuf::from("machine_data.csv"),
        }
    }
}

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub sensor: SensorConfig,
    pub scoring: ScoringConfig,
    pub window: RetentionPolicy,
    pub monitor: MonitorSettings,
    pub storage: StorageConfig,
}

impl MonitorConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sensor = &self.sensor;
        if !is_range(sensor.vibration_min, sensor.vibration_max) {
            return Err(ConfigError::Invalid(format!(
                "sensor.vibration_min ({}) must be below sensor.vibration_max ({})",
                sensor.vibration_min, sensor.vibration_max
            )));
        }
        if !is_range(sensor.temperature_min, sensor.temperature_max) {
            return Err(ConfigError::Invalid(format!(
                "sensor.temperature_min ({}) must be below sensor.temperature_max ({})",
                sensor.temperature_min, sensor.temperature_max
            )));
        }

        let scoring = &self.scoring;
        if scoring.min_history == 0 {
            return Err(ConfigError::Invalid(
                "scoring.min_history must be >= 1".to_string(),
            ));
        }
        if scoring.lookback < 2 {
            return Err(ConfigError::Invalid(format!(
                "scoring.lookback must be >= 2, got {}",
                scoring.lookback
            )));
        }
        if !scoring.combined_threshold.is_finite() || scoring.combined_threshold < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "scoring.combined_threshold must be a non-negative number, got {}",
                scoring.combined_threshold
            )));
        }
        if scoring.contamination.is_nan()
            || scoring.contamination <= 0.0
            || scoring.contamination >= 0.5
        {
            return Err(ConfigError::Invalid(format!(
                "scoring.contamination must be in (0, 0.5), got {}",
                scoring.contamination
            )));
        }
        if scoring.num_trees == 0 {
            return Err(ConfigError::Invalid(
                "scoring.num_trees must be >= 1".to_string(),
            ));
        }

        let window = &self.window;
        if window.drop_oldest == 0 || window.drop_oldest > window.capacity {
            return Err(ConfigError::Invalid(format!(
                "window.drop_oldest must be in [1, capacity={}], got {}",
                window.capacity, window.drop_oldest
            )));
        }
        if window.capacity < scoring.lookback {
            return Err(ConfigError::Invalid(format!(
                "window.capacity ({}) must hold at least scoring.lookback ({}) readings",
                window.capacity, scoring.lookback
            )));
        }

        if self.monitor.export_every == 0 {
            return Err(ConfigError::Invalid(
                "monitor.export_every must be >= 1".to_string(),
            ));
        }

        Ok(())
    }
}

fn is_range(low: f64, high: f64) -> bool {
    low.is_finite() && high.is_finite() && low < high
}
