//! Sensor readings and their scored, persisted form

use serde::{Deserialize, Serialize};

/// One reading of both machine channels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Vibration velocity (mm/s)
    pub vibration: f64,
    /// Temperature (°C)
    pub temperature: f64,
}

impl Sample {
    pub fn new(vibration: f64, temperature: f64) -> Self {
        Self {
            vibration,
            temperature,
        }
    }

    /// True when both channels hold finite values
    pub fn is_finite(&self) -> bool {
        self.vibration.is_finite() && self.temperature.is_finite()
    }
}

/// A sample with its capture time and anomaly score, as handed to storage
///
/// Serializes flat: `{"timestamp", "vibration", "temperature", "anomaly_score"}`,
/// mirroring the columns of the `machine_data` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredSample {
    /// Local time, `YYYY-MM-DD HH:MM:SS`
    pub timestamp: String,
    #[serde(flatten)]
    pub sample: Sample,
    pub anomaly_score: f64,
}

impl ScoredSample {
    pub fn new(timestamp: impl Into<String>, sample: Sample, anomaly_score: f64) -> Self {
        Self {
            timestamp: timestamp.into(),
            sample,
            anomaly_score,
        }
    }
}
