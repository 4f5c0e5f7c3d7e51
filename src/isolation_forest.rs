//! Isolation Forest scoring over the recent window
//!
//! An alternative to the z-score scorer: an Isolation Forest is fitted on
//! the last readings plus the current one, and the current reading is
//! labelled an outlier when its isolation score ranks within the expected
//! contamination share of the training set. Output follows the
//! outlier-detection convention: `-1.0` for an outlier, `1.0` otherwise.
//!
//! The forest is rebuilt for every reading from an RNG seeded with
//! `random_state`, so identical windows always produce identical labels.
//!
//! # References
//!
//! Liu, F. T., Ting, K. M., & Zhou, Z. H. (2008). Isolation forest.
//! In 2008 Eighth IEEE International Conference on Data Mining (pp. 413-422).

use crate::anomaly::{AnomalyScorer, ANOMALY_SCORE, NO_JUDGMENT};
use crate::config::ScoringConfig;
use crate::sample::Sample;
use crate::stats;
use crate::window::SlidingWindow;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Default sub-sampling size (following original paper)
const DEFAULT_SUBSAMPLE_SIZE: usize = 256;

/// Score reported for a reading judged normal
pub const INLIER_SCORE: f64 = 1.0;

/// Feature vector: `[vibration, temperature]`
pub type Point = [f64; 2];

fn to_point(sample: &Sample) -> Point {
    [sample.vibration, sample.temperature]
}

/// A node in an Isolation Tree
#[derive(Debug, Clone)]
enum IsolationNode {
    /// Internal node with split feature and threshold
    Internal {
        feature_idx: usize,
        threshold: f64,
        left: Box<IsolationNode>,
        right: Box<IsolationNode>,
    },
    /// Leaf node with sample count (for path length calculation)
    Leaf { size: usize },
}

impl IsolationNode {
    /// Calculate path length from root to this node for a given point
    fn path_length(&self, point: &Point, current_depth: usize) -> f64 {
        match self {
            IsolationNode::Internal {
                feature_idx,
                threshold,
                left,
                right,
            } => {
                if point[*feature_idx] < *threshold {
                    left.path_length(point, current_depth + 1)
                } else {
                    right.path_length(point, current_depth + 1)
                }
            }
            IsolationNode::Leaf { size } => {
                // Add average path length for unresolved instances
                current_depth as f64 + Self::average_path_length(*size)
            }
        }
    }

    /// Average path length of an unsuccessful BST search over n points
    fn average_path_length(n: usize) -> f64 {
        if n <= 1 {
            return 0.0;
        }
        // Harmonic number approximation: H(n-1) ≈ ln(n-1) + γ
        const EULER_GAMMA: f64 = 0.5772156649;
        2.0 * (((n - 1) as f64).ln() + EULER_GAMMA) - 2.0 * (n - 1) as f64 / n as f64
    }
}

/// Single Isolation Tree
#[derive(Debug, Clone)]
struct IsolationTree {
    root: IsolationNode,
}

impl IsolationTree {
    fn build<R: Rng>(points: &[Point], max_depth: usize, rng: &mut R) -> Self {
        let root = Self::build_node(points, 0, max_depth, rng);
        IsolationTree { root }
    }

    fn build_node<R: Rng>(
        points: &[Point],
        depth: usize,
        max_depth: usize,
        rng: &mut R,
    ) -> IsolationNode {
        if depth >= max_depth || points.len() <= 1 {
            return IsolationNode::Leaf { size: points.len() };
        }

        // Randomly select a feature to split on
        let feature_idx = rng.gen_range(0..2);

        let mut min_val = f64::MAX;
        let mut max_val = f64::MIN;
        for point in points {
            min_val = min_val.min(point[feature_idx]);
            max_val = max_val.max(point[feature_idx]);
        }

        // Constant feature on this branch: cannot split further
        if (max_val - min_val).abs() < f64::EPSILON {
            return IsolationNode::Leaf { size: points.len() };
        }

        // Spread beyond f64 range: no threshold can be sampled
        if !(max_val - min_val).is_finite() {
            return IsolationNode::Leaf { size: points.len() };
        }

        let threshold = rng.gen_range(min_val..max_val);

        let (left_points, right_points): (Vec<Point>, Vec<Point>) = points
            .iter()
            .copied()
            .partition(|point| point[feature_idx] < threshold);

        if left_points.is_empty() || right_points.is_empty() {
            return IsolationNode::Leaf { size: points.len() };
        }

        let left = Box::new(Self::build_node(&left_points, depth + 1, max_depth, rng));
        let right = Box::new(Self::build_node(&right_points, depth + 1, max_depth, rng));

        IsolationNode::Internal {
            feature_idx,
            threshold,
            left,
            right,
        }
    }

    fn path_length(&self, point: &Point) -> f64 {
        self.root.path_length(point, 0)
    }
}

/// Isolation Forest - ensemble of Isolation Trees
#[derive(Debug, Clone)]
pub struct IsolationForest {
    trees: Vec<IsolationTree>,
    num_trees: usize,
    subsample_size: usize,
    /// Sub-sample size actually used by the last fit
    fitted_size: usize,
}

impl IsolationForest {
    pub fn new(num_trees: usize, subsample_size: Option<usize>) -> Self {
        IsolationForest {
            trees: Vec::new(),
            num_trees,
            subsample_size: subsample_size.unwrap_or(DEFAULT_SUBSAMPLE_SIZE),
            fitted_size: 0,
        }
    }

    /// Fit the forest, replacing any previously built trees
    pub fn fit<R: Rng>(&mut self, points: &[Point], rng: &mut R) {
        self.trees.clear();
        self.fitted_size = self.subsample_size.min(points.len());
        if self.fitted_size == 0 {
            return;
        }

        let max_depth = (self.fitted_size.max(2) as f64).log2().ceil() as usize;
        let mut indices: Vec<usize> = (0..points.len()).collect();

        for _ in 0..self.num_trees {
            indices.shuffle(rng);
            let subsample: Vec<Point> = indices[..self.fitted_size]
                .iter()
                .map(|&i| points[i])
                .collect();

            self.trees.push(IsolationTree::build(&subsample, max_depth, rng));
        }
    }

    /// Anomaly score in `[0, 1]`; higher is more anomalous
    pub fn anomaly_score(&self, point: &Point) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }

        let avg_path_length: f64 = self
            .trees
            .iter()
            .map(|tree| tree.path_length(point))
            .sum::<f64>()
            / self.trees.len() as f64;

        let c = IsolationNode::average_path_length(self.fitted_size);
        if c <= 0.0 {
            return 0.5;
        }
        2_f64.powf(-avg_path_length / c)
    }
}

/// Scorer that labels the current reading with a freshly fitted forest
#[derive(Debug, Clone)]
pub struct IsolationForestScorer {
    min_history: usize,
    lookback: usize,
    num_trees: usize,
    contamination: f64,
    random_state: u64,
}

impl IsolationForestScorer {
    pub fn from_config(config: &ScoringConfig) -> Self {
        Self {
            min_history: config.min_history.max(1),
            lookback: config.lookback.max(2),
            num_trees: config.num_trees.max(1),
            contamination: config.contamination,
            random_state: config.random_state,
        }
    }
}

impl Default for IsolationForestScorer {
    fn default() -> Self {
        Self::from_config(&ScoringConfig::default())
    }
}

impl AnomalyScorer for IsolationForestScorer {
    fn score(&mut self, current: &Sample, window: &SlidingWindow) -> f64 {
        if window.len() < self.min_history {
            return NO_JUDGMENT;
        }

        let mut training: Vec<Point> = window
            .tail(self.lookback - 1)
            .iter()
            .map(to_point)
            .collect();
        training.push(to_point(current));

        let mut rng = StdRng::seed_from_u64(self.random_state);
        let mut forest = IsolationForest::new(self.num_trees, None);
        forest.fit(&training, &mut rng);

        let mut scores: Vec<f64> = training.iter().map(|p| forest.anomaly_score(p)).collect();
        let current_score = scores[scores.len() - 1];
        scores.sort_by(f64::total_cmp);
        let threshold = stats::percentile(&scores, (1.0 - self.contamination) * 100.0);

        tracing::debug!(
            current_score,
            threshold,
            training = training.len(),
            "isolation forest evaluation"
        );

        if current_score > threshold {
            ANOMALY_SCORE
        } else {
            INLIER_SCORE
        }
    }

    fn name(&self) -> &'static str {
        "isolation_forest"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::RetentionPolicy;

    fn calm_window(n: usize) -> SlidingWindow {
        let mut window = SlidingWindow::new(RetentionPolicy::default());
        for i in 0..n {
            let jitter = (i % 3) as f64 * 0.1;
            window.push(Sample::new(1.0 + jitter, 20.0 + jitter));
        }
        window
    }

    #[test]
    fn test_isolation_tree_outlier_has_shorter_path() {
        let points = vec![[1.0, 2.0], [1.1, 2.1], [10.0, 20.0]];
        let mut rng = StdRng::seed_from_u64(7);

        let mut outlier_total = 0.0;
        let mut normal_total = 0.0;
        for _ in 0..50 {
            let tree = IsolationTree::build(&points, 10, &mut rng);
            outlier_total += tree.path_length(&[10.0, 20.0]);
            normal_total += tree.path_length(&[1.0, 2.0]);
        }
        assert!(outlier_total < normal_total);
    }

    #[test]
    fn test_isolation_forest_detects_outliers() {
        let points = vec![
            [1.0, 2.0],
            [1.1, 2.1],
            [0.9, 1.9],
            [1.2, 2.2],
            [10.0, 20.0], // Clear outlier
        ];

        let mut forest = IsolationForest::new(100, Some(4));
        forest.fit(&points, &mut StdRng::seed_from_u64(42));

        let outlier_score = forest.anomaly_score(&[10.0, 20.0]);
        let normal_score = forest.anomaly_score(&[1.0, 2.0]);
        assert!(
            outlier_score > normal_score,
            "Outlier score ({}) should be > normal score ({})",
            outlier_score,
            normal_score
        );
    }

    #[test]
    fn test_unfitted_forest_scores_zero() {
        let forest = IsolationForest::new(10, None);
        assert_eq!(forest.anomaly_score(&[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_average_path_length() {
        assert_eq!(IsolationNode::average_path_length(1), 0.0);
        let apl_10 = IsolationNode::average_path_length(10);
        assert!(apl_10 > 2.0 && apl_10 < 4.0);
    }

    #[test]
    fn test_scorer_insufficient_history() {
        let mut scorer = IsolationForestScorer::default();
        let window = calm_window(4);
        assert_eq!(scorer.score(&Sample::new(500.0, 500.0), &window), NO_JUDGMENT);
    }

    #[test]
    fn test_scorer_flags_far_outlier() {
        let mut scorer = IsolationForestScorer::default();
        let window = calm_window(20);
        assert_eq!(
            scorer.score(&Sample::new(100.0, 200.0), &window),
            ANOMALY_SCORE
        );
    }

    #[test]
    fn test_scorer_identical_readings_are_inliers() {
        let mut scorer = IsolationForestScorer::default();
        let mut window = SlidingWindow::new(RetentionPolicy::default());
        for _ in 0..12 {
            window.push(Sample::new(2.0, 40.0));
        }
        assert_eq!(scorer.score(&Sample::new(2.0, 40.0), &window), INLIER_SCORE);
    }

    #[test]
    fn test_scorer_extreme_magnitude_window_does_not_panic() {
        let mut scorer = IsolationForestScorer::default();
        let mut window = SlidingWindow::new(RetentionPolicy::default());
        for _ in 0..5 {
            window.push(Sample::new(-1e308, 20.0));
            window.push(Sample::new(1e308, 21.0));
        }

        let score = scorer.score(&Sample::new(1.0, 20.0), &window);
        assert!(score == ANOMALY_SCORE || score == INLIER_SCORE);
    }

    #[test]
    fn test_tree_leaf_on_overflowing_spread() {
        let points = vec![[-1e308, 5.0], [1e308, 5.0]];
        let tree = IsolationTree::build(&points, 10, &mut StdRng::seed_from_u64(1));
        assert_eq!(tree.path_length(&[0.0, 5.0]), IsolationNode::average_path_length(2));
    }

    #[test]
    fn test_scorer_is_deterministic() {
        let window = calm_window(15);
        let current = Sample::new(1.15, 20.05);

        let first = IsolationForestScorer::default().score(&current, &window);
        let second = IsolationForestScorer::default().score(&current, &window);
        assert_eq!(first, second);
    }
}
