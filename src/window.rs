//! Bounded history of recent samples
//!
//! The window grows by one sample per cycle. Once it exceeds its capacity
//! the oldest block is evicted in a single drain, so the window never holds
//! a partially trimmed history.

use crate::sample::Sample;
use serde::{Deserialize, Serialize};

/// Hard cap and eviction block size for the sliding window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionPolicy {
    /// Maximum number of samples kept before eviction (default: 100)
    pub capacity: usize,
    /// Number of oldest samples dropped when `capacity` is exceeded (default: 50)
    pub drop_oldest: usize,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            capacity: 100,
            drop_oldest: 50,
        }
    }
}

/// Chronologically ordered window of recent samples
#[derive(Debug, Clone, Default)]
pub struct SlidingWindow {
    samples: Vec<Sample>,
    policy: RetentionPolicy,
}

impl SlidingWindow {
    pub fn new(policy: RetentionPolicy) -> Self {
        Self {
            samples: Vec::with_capacity(policy.capacity + 1),
            policy,
        }
    }

    /// Append a sample at the newest end
    pub fn push(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    /// Evict the oldest block if the window is over capacity
    ///
    /// Returns the number of samples removed (0 when within capacity).
    pub fn retain_recent(&mut self) -> usize {
        if self.samples.len() <= self.policy.capacity {
            return 0;
        }
        let evict = self.policy.drop_oldest.min(self.samples.len());
        self.samples.drain(..evict);
        evict
    }

    /// Up to the last `n` samples, oldest first
    pub fn tail(&self, n: usize) -> &[Sample] {
        let start = self.samples.len().saturating_sub(n);
        &self.samples[start..]
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    pub fn policy(&self) -> RetentionPolicy {
        self.policy
    }
}
