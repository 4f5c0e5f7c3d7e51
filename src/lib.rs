//! Machwatch - predictive maintenance monitor
//!
//! This library samples machine vibration and temperature, scores each
//! reading against a sliding window of recent history, persists every scored
//! reading, raises maintenance alerts and periodically exports the history
//! to CSV.

pub mod alert;
pub mod anomaly;
pub mod cli;
pub mod clock;
pub mod config;
pub mod csv_output;
pub mod export;
pub mod isolation_forest;
pub mod monitor;
pub mod sample;
pub mod sensor;
pub mod stats;
pub mod storage;
pub mod window;
