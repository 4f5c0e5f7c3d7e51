//! Anomaly scoring against the sliding window
//!
//! Each new reading is scored against the readings that came *before* it:
//! the current sample is not yet in the window at scoring time. The z-score
//! scorer combines per-channel z-scores over the last `lookback` readings
//! into a single magnitude and reports [`ANOMALY_SCORE`] once that
//! magnitude crosses the threshold.
//!
//! The output mixes two scales: a non-negative magnitude for normal
//! readings and the `-1.0` outlier label (negative = outlier, as in common
//! outlier-detection libraries). Alerting compares against a negative
//! threshold, so only the label can trigger it.

use crate::config::{ScoringConfig, ScoringMethod};
use crate::isolation_forest::IsolationForestScorer;
use crate::sample::Sample;
use crate::stats::{self, StatsError};
use crate::window::SlidingWindow;
use serde::Serialize;

/// Score reported for a reading judged anomalous
pub const ANOMALY_SCORE: f64 = -1.0;

/// Score reported while the window is too short to judge
pub const NO_JUDGMENT: f64 = 0.0;

/// Scores one reading against prior history
pub trait AnomalyScorer {
    /// Score `current` against `window`, which must not contain `current` yet
    fn score(&mut self, current: &Sample, window: &SlidingWindow) -> f64;

    /// Short identifier for logs
    fn name(&self) -> &'static str;
}

/// Build the scorer selected by `config.method`
pub fn scorer_for(config: &ScoringConfig) -> Box<dyn AnomalyScorer> {
    match config.method {
        ScoringMethod::Zscore => Box::new(ZScoreScorer::from_config(config)),
        ScoringMethod::IsolationForest => Box::new(IsolationForestScorer::from_config(config)),
    }
}

/// Intermediate values of a z-score evaluation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub vibration_mean: f64,
    pub vibration_stddev: f64,
    pub temperature_mean: f64,
    pub temperature_stddev: f64,
    pub vibration_z: f64,
    pub temperature_z: f64,
    /// Mean of the squared channel z-scores
    pub combined: f64,
}

impl ScoreBreakdown {
    fn is_finite(&self) -> bool {
        [
            self.vibration_mean,
            self.vibration_stddev,
            self.temperature_mean,
            self.temperature_stddev,
            self.combined,
        ]
        .iter()
        .all(|v| v.is_finite())
    }

    /// Final score under a given threshold
    ///
    /// A baseline or combined value that overflowed on extreme readings is
    /// reported as [`ANOMALY_SCORE`].
    pub fn score(&self, threshold: f64) -> f64 {
        if !self.is_finite() || self.combined > threshold {
            ANOMALY_SCORE
        } else {
            self.combined
        }
    }
}

/// Baseline statistics of one channel
#[derive(Debug, Clone, Copy)]
struct ChannelBaseline {
    mean: f64,
    stddev: f64,
}

impl ChannelBaseline {
    fn from_values(values: &[f64]) -> Result<Self, StatsError> {
        let mean = stats::mean(values)?;
        let stddev = stats::stddev(values, mean)?;
        Ok(Self { mean, stddev })
    }

    /// Z-score of `value`; zero when the baseline has no spread
    fn z_score(&self, value: f64) -> f64 {
        if self.stddev > 0.0 {
            (value - self.mean) / self.stddev
        } else {
            0.0
        }
    }
}

/// Combined z-score scorer
#[derive(Debug, Clone)]
pub struct ZScoreScorer {
    min_history: usize,
    lookback: usize,
    threshold: f64,
}

impl ZScoreScorer {
    /// Create a scorer
    ///
    /// # Arguments
    /// * `min_history` - Readings needed before any judgment (default: 5)
    /// * `lookback` - Recent readings the baseline is built from (default: 10)
    /// * `threshold` - Combined z-score above which a reading is anomalous (default: 4.0)
    pub fn new(min_history: usize, lookback: usize, threshold: f64) -> Self {
        Self {
            min_history: min_history.max(1),
            lookback: lookback.max(1),
            threshold,
        }
    }

    pub fn from_config(config: &ScoringConfig) -> Self {
        Self::new(
            config.min_history,
            config.lookback,
            config.combined_threshold,
        )
    }

    /// Compute the full breakdown, or `None` with insufficient history
    pub fn evaluate(&self, current: &Sample, window: &SlidingWindow) -> Option<ScoreBreakdown> {
        if window.len() < self.min_history {
            return None;
        }

        let recent = window.tail(self.lookback);
        let vibrations: Vec<f64> = recent.iter().map(|s| s.vibration).collect();
        let temperatures: Vec<f64> = recent.iter().map(|s| s.temperature).collect();

        // min_history >= 1 keeps `recent` non-empty
        let vibration = ChannelBaseline::from_values(&vibrations).ok()?;
        let temperature = ChannelBaseline::from_values(&temperatures).ok()?;

        let vibration_z = vibration.z_score(current.vibration);
        let temperature_z = temperature.z_score(current.temperature);
        let combined = (vibration_z * vibration_z + temperature_z * temperature_z) / 2.0;

        Some(ScoreBreakdown {
            vibration_mean: vibration.mean,
            vibration_stddev: vibration.stddev,
            temperature_mean: temperature.mean,
            temperature_stddev: temperature.stddev,
            vibration_z,
            temperature_z,
            combined,
        })
    }
}

impl Default for ZScoreScorer {
    fn default() -> Self {
        Self::from_config(&ScoringConfig::default())
    }
}

impl AnomalyScorer for ZScoreScorer {
    fn score(&mut self, current: &Sample, window: &SlidingWindow) -> f64 {
        match self.evaluate(current, window) {
            Some(breakdown) => {
                tracing::debug!(
                    vibration_z = breakdown.vibration_z,
                    temperature_z = breakdown.temperature_z,
                    combined = breakdown.combined,
                    "z-score evaluation"
                );
                breakdown.score(self.threshold)
            }
            None => NO_JUDGMENT,
        }
    }

    fn name(&self) -> &'static str {
        "zscore"
    }
}
