//! Isolation forest over a single scalar feature.
//!
//! Each tree recursively cuts a random subsample at a uniformly drawn split
//! point until values are isolated or the depth limit is reached. Outliers
//! isolate after few cuts, so a short average path means a high anomaly score.
//!
//! Every node remembers the range of values it was grown from. A value that
//! lies outside a split node's range by more than the node's width is treated
//! as isolated there; closer values follow the split like any other. A leaf
//! uses the width of the split above it, or zero when the whole tree is one
//! leaf (a constant training window), so values just past the training
//! extremes score like those extremes while distant ones isolate at once.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::config::ModelConfig;
use crate::detect::{DetectError, ScoringModel, Snapshot, Trainer, Verdict};

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Average path length of an unsuccessful BST search over `n` items; the
/// normalizer for isolation depths.
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

/// Linear-interpolated quantile of an already sorted slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

#[derive(Debug)]
struct Node {
    lo: f64,
    hi: f64,
    kind: NodeKind,
}

#[derive(Debug)]
enum NodeKind {
    Leaf { size: usize },
    Split { at: f64, left: Box<Node>, right: Box<Node> },
}

#[derive(Debug)]
struct IsolationTree {
    root: Node,
}

impl IsolationTree {
    fn grow(sample: Vec<f64>, depth: usize, depth_limit: usize, rng: &mut StdRng) -> Node {
        let lo = sample.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = sample.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        if depth >= depth_limit || sample.len() <= 1 || lo >= hi {
            return Node {
                lo,
                hi,
                kind: NodeKind::Leaf { size: sample.len() },
            };
        }

        // `at` lies in [lo, hi), so both sides are non-empty.
        let at = rng.gen_range(lo..hi);
        let (left, right): (Vec<f64>, Vec<f64>) = sample.into_iter().partition(|&v| v <= at);

        Node {
            lo,
            hi,
            kind: NodeKind::Split {
                at,
                left: Box::new(Self::grow(left, depth + 1, depth_limit, rng)),
                right: Box::new(Self::grow(right, depth + 1, depth_limit, rng)),
            },
        }
    }

    fn path_length(&self, x: f64) -> f64 {
        let mut node = &self.root;
        let mut depth = 0.0;
        // Width of the enclosing split; zero at the root.
        let mut slack = 0.0;
        loop {
            let outside = (node.lo - x).max(x - node.hi);
            match &node.kind {
                NodeKind::Leaf { size } => {
                    if outside > slack {
                        return depth + 1.0;
                    }
                    return depth + average_path_length(*size);
                }
                NodeKind::Split { at, left, right } => {
                    let width = node.hi - node.lo;
                    if outside > width {
                        return depth + 1.0;
                    }
                    slack = width;
                    node = if x <= *at { left } else { right };
                    depth += 1.0;
                }
            }
        }
    }
}

/// Trains [`IsolationForestModel`]s with fixed hyperparameters.
#[derive(Debug, Clone)]
pub struct IsolationForestTrainer {
    n_estimators: usize,
    max_samples: usize,
    contamination: f64,
    seed: u64,
}

impl IsolationForestTrainer {
    pub fn new(n_estimators: usize, max_samples: usize, contamination: f64, seed: u64) -> Self {
        Self {
            n_estimators,
            max_samples,
            contamination,
            seed,
        }
    }

    pub fn from_config(config: &ModelConfig) -> Self {
        Self::new(
            config.n_estimators,
            config.max_samples,
            config.contamination,
            config.seed,
        )
    }

    /// Fit a forest to the snapshot. Fails only on an empty snapshot.
    ///
    /// A snapshot of one repeated value grows single-leaf trees; every
    /// training score is then equal, and any other value scores above it.
    pub fn fit(&self, snapshot: &Snapshot) -> Result<IsolationForestModel, DetectError> {
        let values = snapshot.values();
        if values.is_empty() {
            return Err(DetectError::EmptySnapshot);
        }

        let data: Vec<f64> = values.iter().map(|&v| v as f64).collect();
        let sample_size = self.max_samples.clamp(2, data.len());
        let depth_limit = (sample_size as f64).log2().ceil() as usize;
        let mut rng = StdRng::seed_from_u64(self.seed);

        let trees: Vec<IsolationTree> = (0..self.n_estimators.max(1))
            .map(|_| {
                let sample: Vec<f64> = index::sample(&mut rng, data.len(), sample_size)
                    .iter()
                    .map(|i| data[i])
                    .collect();
                IsolationTree {
                    root: IsolationTree::grow(sample, 0, depth_limit, &mut rng),
                }
            })
            .collect();

        let mut model = IsolationForestModel {
            trees,
            normalizer: average_path_length(sample_size),
            threshold: f64::INFINITY,
            training_samples: data.len(),
        };

        let mut scores: Vec<f64> = data.iter().map(|&x| model.score_f64(x)).collect();
        scores.sort_by(f64::total_cmp);
        model.threshold = quantile(&scores, 1.0 - self.contamination);

        debug!(
            samples = data.len(),
            sample_size,
            trees = model.trees.len(),
            threshold = model.threshold,
            "isolation forest fitted"
        );
        Ok(model)
    }
}

impl Trainer for IsolationForestTrainer {
    fn train(&self, snapshot: &Snapshot) -> Result<Arc<dyn ScoringModel>, DetectError> {
        Ok(Arc::new(self.fit(snapshot)?))
    }
}

/// A fitted isolation forest with its contamination-derived threshold.
#[derive(Debug)]
pub struct IsolationForestModel {
    trees: Vec<IsolationTree>,
    normalizer: f64,
    threshold: f64,
    training_samples: usize,
}

impl IsolationForestModel {
    /// Anomaly score in (0, 1]; higher is more anomalous.
    pub fn anomaly_score(&self, value: i64) -> f64 {
        self.score_f64(value as f64)
    }

    /// Scores strictly above this are anomalous.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn training_samples(&self) -> usize {
        self.training_samples
    }

    fn score_f64(&self, x: f64) -> f64 {
        let mean_path = self.trees.iter().map(|t| t.path_length(x)).sum::<f64>()
            / self.trees.len() as f64;
        2f64.powf(-mean_path / self.normalizer)
    }
}

impl ScoringModel for IsolationForestModel {
    fn predict(&self, value: i64) -> Verdict {
        if self.anomaly_score(value) > self.threshold {
            Verdict::Anomalous
        } else {
            Verdict::Normal
        }
    }
}
