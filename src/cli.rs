//! CLI argument parsing for machwatch

use crate::config::{MonitorConfig, ScoringMethod};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "machwatch")]
#[command(version)]
#[command(about = "Predictive maintenance monitor for machine vibration and temperature", long_about = None)]
pub struct Cli {
    /// Load configuration from a TOML file (defaults apply to missing keys)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Seconds between readings (overrides monitor.interval_secs)
    #[arg(short = 'i', long = "interval", value_name = "SECS")]
    pub interval: Option<u64>,

    /// Reading store path (overrides storage.database_path)
    #[arg(long = "db", value_name = "PATH")]
    pub database: Option<PathBuf>,

    /// CSV export path (overrides storage.csv_path)
    #[arg(long = "csv", value_name = "PATH")]
    pub csv: Option<PathBuf>,

    /// Anomaly scoring method (overrides scoring.method)
    #[arg(long = "scorer", value_enum, value_name = "METHOD")]
    pub scorer: Option<ScoringMethod>,

    /// Seed for the simulated sensor (overrides sensor.seed)
    #[arg(long = "seed", value_name = "SEED")]
    pub seed: Option<u64>,

    /// Replay recorded `vibration,temperature` rows instead of simulating
    #[arg(long = "replay", value_name = "CSV")]
    pub replay: Option<PathBuf>,

    /// Stop after this many readings
    #[arg(short = 'n', long = "max-readings", value_name = "COUNT")]
    pub max_readings: Option<u64>,

    /// Export the stored history to CSV and exit
    #[arg(long = "export-only")]
    pub export_only: bool,

    /// Enable trace-level logging
    #[arg(long = "debug")]
    pub debug: bool,
}

impl Cli {
    /// Apply command-line overrides on top of file configuration
    pub fn apply_overrides(&self, config: &mut MonitorConfig) {
        if let Some(interval) = self.interval {
            config.monitor.interval_secs = interval;
        }
        if let Some(ref database) = self.database {
            config.storage.database_path = database.clone();
        }
        if let Some(ref csv) = self.csv {
            config.storage.csv_path = csv.clone();
        }
        if let Some(scorer) = self.scorer {
            config.scoring.method = scorer;
        }
        if let Some(seed) = self.seed {
            config.sensor.seed = Some(seed);
        }
    }
}
