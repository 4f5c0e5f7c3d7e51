//! Sensor acquisition
//!
//! The monitor pulls one complete [`Sample`] per cycle from a
//! [`SensorSource`]. Two sources ship with the crate: a pseudo-random
//! simulator standing in for hardware, and a replay source that plays back
//! a fixed sequence (from memory or a recorded CSV file).

use crate::config::SensorConfig;
use crate::sample::Sample;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Acquisition failures; every variant stops the monitor
#[derive(Error, Debug)]
pub enum SensorError {
    /// Hardware sources return this when a read exceeds their deadline
    #[error("Sensor read timed out after {0:?}")]
    Timeout(Duration),

    #[error("Sensor fault: {0}")]
    Fault(String),

    #[error("Sensor replay exhausted after {0} readings")]
    Exhausted(usize),
}

/// Source of machine readings
pub trait SensorSource {
    /// Read one sample; must return or fail within bounded time
    fn read(&mut self) -> Result<Sample, SensorError>;
}

/// Pseudo-random readings within configured ranges
#[derive(Debug)]
pub struct SimulatedSensor {
    rng: StdRng,
    config: SensorConfig,
}

impl SimulatedSensor {
    /// Build a simulator; ranges must be non-empty (see `MonitorConfig::validate`)
    pub fn new(config: SensorConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng, config }
    }
}

impl SensorSource for SimulatedSensor {
    fn read(&mut self) -> Result<Sample, SensorError> {
        let vibration = self
            .rng
            .gen_range(self.config.vibration_min..self.config.vibration_max);
        let temperature = self
            .rng
            .gen_range(self.config.temperature_min..self.config.temperature_max);
        Ok(Sample::new(vibration, temperature))
    }
}

/// Plays back a fixed sequence of readings, then reports exhaustion
#[derive(Debug, Clone, Default)]
pub struct ReplaySensor {
    pending: VecDeque<Sample>,
    delivered: usize,
}

impl ReplaySensor {
    pub fn new(samples: impl IntoIterator<Item = Sample>) -> Self {
        Self {
            pending: samples.into_iter().collect(),
            delivered: 0,
        }
    }

    /// Load `vibration,temperature` rows from a CSV file
    ///
    /// A leading header row and blank lines are skipped. Extra columns are
    /// ignored.
    pub fn from_csv_file<P: AsRef<Path>>(path: P) -> Result<Self, SensorError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            SensorError::Fault(format!("cannot read replay file {}: {}", path.display(), e))
        })?;
        Self::from_csv_str(&content)
    }

    pub fn from_csv_str(content: &str) -> Result<Self, SensorError> {
        let mut samples = Vec::new();

        for (line_no, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let mut fields = line.split(',').map(str::trim);
            let (Some(first), Some(second)) = (fields.next(), fields.next()) else {
                return Err(SensorError::Fault(format!(
                    "replay line {}: expected vibration,temperature",
                    line_no + 1
                )));
            };

            match (first.parse::<f64>(), second.parse::<f64>()) {
                (Ok(vibration), Ok(temperature)) => {
                    let sample = Sample::new(vibration, temperature);
                    if !sample.is_finite() {
                        return Err(SensorError::Fault(format!(
                            "replay line {}: non-finite reading",
                            line_no + 1
                        )));
                    }
                    samples.push(sample);
                }
                // Header row
                _ if samples.is_empty() && line_no == 0 => continue,
                _ => {
                    return Err(SensorError::Fault(format!(
                        "replay line {}: cannot parse '{}'",
                        line_no + 1,
                        line
                    )));
                }
            }
        }

        Ok(Self::new(samples))
    }

    /// Readings not yet delivered
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl SensorSource for ReplaySensor {
    fn read(&mut self) -> Result<Sample, SensorError> {
        let sample = self
            .pending
            .pop_front()
            .ok_or(SensorError::Exhausted(self.delivered))?;
        self.delivered += 1;
        Ok(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulated_readings_within_ranges() {
        let config = SensorConfig {
            seed: Some(42),
            ..SensorConfig::default()
        };
        let mut sensor = SimulatedSensor::new(config);

        for _ in 0..1000 {
            let sample = sensor.read().unwrap();
            assert!((0.5..5.0).contains(&sample.vibration));
            assert!((20.0..80.0).contains(&sample.temperature));
        }
    }

    #[test]
    fn test_simulated_seed_is_reproducible() {
        let config = SensorConfig {
            seed: Some(7),
            ..SensorConfig::default()
        };
        let mut a = SimulatedSensor::new(config.clone());
        let mut b = SimulatedSensor::new(config);

        for _ in 0..10 {
            assert_eq!(a.read().unwrap(), b.read().unwrap());
        }
    }

    #[test]
    fn test_replay_then_exhausted() {
        let mut sensor = ReplaySensor::new([Sample::new(1.0, 20.0), Sample::new(2.0, 21.0)]);
        assert_eq!(sensor.read().unwrap(), Sample::new(1.0, 20.0));
        assert_eq!(sensor.read().unwrap(), Sample::new(2.0, 21.0));
        assert!(matches!(sensor.read(), Err(SensorError::Exhausted(2))));
    }

    #[test]
    fn test_replay_csv_with_header() {
        let csv = "vibration,temperature\n1.5,30.0\n\n2.5, 31.5\n";
        let sensor = ReplaySensor::from_csv_str(csv).unwrap();
        assert_eq!(sensor.remaining(), 2);
    }

    #[test]
    fn test_replay_csv_without_header() {
        let csv = "1.5,30.0\n2.5,31.5,extra\n";
        let mut sensor = ReplaySensor::from_csv_str(csv).unwrap();
        assert_eq!(sensor.remaining(), 2);
        assert_eq!(sensor.read().unwrap(), Sample::new(1.5, 30.0));
    }

    #[test]
    fn test_replay_csv_rejects_garbage() {
        let csv = "1.5,30.0\nabc,def\n";
        assert!(matches!(
            ReplaySensor::from_csv_str(csv),
            Err(SensorError::Fault(_))
        ));
    }

    #[test]
    fn test_replay_csv_rejects_single_column() {
        assert!(ReplaySensor::from_csv_str("1.5\n").is_err());
    }

    #[test]
    fn test_replay_csv_rejects_non_finite() {
        assert!(ReplaySensor::from_csv_str("NaN,20.0\n").is_err());
    }
}
