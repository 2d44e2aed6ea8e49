//! Isolation forest: randomized recursive bisection trees.
//!
//! Points that separate from the rest in fewer random splits get a higher
//! anomaly score. Trees are grown on row subsamples, each from its own
//! `StdRng` seeded with `seed + tree index`, so a fixed seed reproduces the
//! same flags.

use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};

use crate::config::OutlierConfig;
use crate::error::OutlierError;
use crate::scorer::OutlierDetector;

const EULER_GAMMA: f64 = 0.577_215_664_9;

/// Average path length of an unsuccessful BST search over `n` points.
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

#[derive(Debug)]
enum Node {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

fn grow(
    matrix: &[[f64; 2]],
    rows: Vec<usize>,
    depth: usize,
    max_depth: usize,
    rng: &mut StdRng,
) -> Node {
    if depth >= max_depth || rows.len() <= 1 {
        return Node::Leaf { size: rows.len() };
    }

    // Only features that still vary inside this node can split it.
    let mut candidates: Vec<(usize, f64, f64)> = Vec::with_capacity(2);
    for feature in 0..2 {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for &r in &rows {
            let v = matrix[r][feature];
            lo = lo.min(v);
            hi = hi.max(v);
        }
        if hi > lo {
            candidates.push((feature, lo, hi));
        }
    }
    if candidates.is_empty() {
        return Node::Leaf { size: rows.len() };
    }

    let (feature, lo, hi) = candidates[rng.gen_range(0..candidates.len())];
    let threshold = rng.gen_range(lo..hi);
    let (left, right): (Vec<usize>, Vec<usize>) =
        rows.into_iter().partition(|&r| matrix[r][feature] <= threshold);

    Node::Split {
        feature,
        threshold,
        left: Box::new(grow(matrix, left, depth + 1, max_depth, rng)),
        right: Box::new(grow(matrix, right, depth + 1, max_depth, rng)),
    }
}

fn path_length(node: &Node, point: &[f64; 2], depth: usize) -> f64 {
    match node {
        Node::Leaf { size } => depth as f64 + average_path_length(*size),
        Node::Split {
            feature,
            threshold,
            left,
            right,
        } => {
            let next = if point[*feature] <= *threshold { left } else { right };
            path_length(next, point, depth + 1)
        }
    }
}

/// Percentile with linear interpolation between closest ranks. `q` in [0, 1].
fn percentile(values: &[f64], q: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

#[derive(Debug, Clone, PartialEq)]
pub struct IsolationForest {
    pub n_estimators: usize,
    pub max_samples: usize,
    pub contamination: f64,
    pub seed: u64,
}

impl Default for IsolationForest {
    fn default() -> Self {
        Self::from_config(&OutlierConfig::default())
    }
}

impl IsolationForest {
    pub fn from_config(config: &OutlierConfig) -> Self {
        Self {
            n_estimators: config.n_estimators,
            max_samples: config.max_samples,
            contamination: config.contamination,
            seed: config.seed,
        }
    }

    /// Anomaly score per row in (0, 1]; higher means more isolated.
    pub fn score_samples(&self, matrix: &[[f64; 2]]) -> Result<Vec<f64>, OutlierError> {
        let n = matrix.len();
        if n < 2 {
            return Err(OutlierError::TooFewRows(n));
        }
        for (row, point) in matrix.iter().enumerate() {
            if let Some(column) = point.iter().position(|v| !v.is_finite()) {
                return Err(OutlierError::NonFinite { row, column });
            }
        }

        let sample_size = self.max_samples.min(n).max(2);
        let max_depth = (sample_size as f64).log2().ceil() as usize;

        let mut total = vec![0.0f64; n];
        for t in 0..self.n_estimators.max(1) {
            let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(t as u64));
            let sample = index::sample(&mut rng, n, sample_size).into_vec();
            let tree = grow(matrix, sample, 0, max_depth, &mut rng);
            for (acc, point) in total.iter_mut().zip(matrix) {
                *acc += path_length(&tree, point, 0);
            }
        }

        let trees = self.n_estimators.max(1) as f64;
        let norm = average_path_length(sample_size);
        Ok(total
            .into_iter()
            .map(|sum| 2f64.powf(-(sum / trees) / norm))
            .collect())
    }
}

impl OutlierDetector for IsolationForest {
    fn detect(&self, matrix: &[[f64; 2]]) -> Result<Vec<bool>, OutlierError> {
        let scores = self.score_samples(matrix)?;
        let threshold = percentile(&scores, 1.0 - self.contamination);
        Ok(scores.into_iter().map(|s| s > threshold).collect())
    }
}
