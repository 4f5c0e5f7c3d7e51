//! Descriptive statistics over reading channels
//!
//! Population statistics (divide by N) over `f64` slices. Callers are
//! expected to hand in non-empty input; an empty slice is reported as
//! [`StatsError::EmptyInput`] rather than producing `NaN`.

use thiserror::Error;

/// Errors raised by the statistics helpers
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StatsError {
    #[error("Cannot compute statistics over an empty sequence")]
    EmptyInput,
}

/// Arithmetic mean
///
/// Accumulates offsets from the first value, so a constant sequence
/// returns that value exactly and its standard deviation is exactly zero.
pub fn mean(values: &[f64]) -> Result<f64, StatsError> {
    let Some(&pivot) = values.first() else {
        return Err(StatsError::EmptyInput);
    };
    let offset: f64 = values.iter().map(|&x| x - pivot).sum();
    Ok(pivot + offset / values.len() as f64)
}

/// Population standard deviation around a precomputed mean
pub fn stddev(values: &[f64], mean: f64) -> Result<f64, StatsError> {
    if values.is_empty() {
        return Err(StatsError::EmptyInput);
    }
    let sum_sq_diff: f64 = values.iter().map(|&x| (x - mean) * (x - mean)).sum();
    Ok((sum_sq_diff / values.len() as f64).sqrt())
}

/// Calculate percentile from sorted data (linear interpolation)
///
/// `percentile` is in `[0, 100]`. Returns 0.0 for empty input.
pub fn percentile(sorted_data: &[f64], percentile: f64) -> f64 {
    if sorted_data.is_empty() {
        return 0.0;
    }
    if sorted_data.len() == 1 {
        return sorted_data[0];
    }

    let index = (percentile.clamp(0.0, 100.0) / 100.0) * (sorted_data.len() - 1) as f64;
    let lower = index.floor() as usize;
    let upper = index.ceil() as usize;

    if lower == upper {
        sorted_data[lower]
    } else {
        let weight = index - lower as f64;
        sorted_data[lower] + (sorted_data[upper] - sorted_data[lower]) * weight
    }
}
