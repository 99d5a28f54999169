//! Seeded random forest of CART regression trees.
//!
//! Each tree is grown on a bootstrap sample of rows and considers a random
//! `sqrt(p)` subset of features at every split. A feature's importance is
//! the total squared-error reduction of the splits that use it, averaged
//! over the trees. All randomness comes from one `ChaCha8Rng` seeded from
//! the configured seed, so results are reproducible across runs and
//! platforms.

use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForestParams {
    pub trees: usize,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    pub sample_fraction: f64,
    pub seed: u64,
}

struct Split {
    feature: usize,
    threshold: f64,
    gain: f64,
}

struct TreeBuilder<'a> {
    features: &'a [Vec<f64>],
    target: &'a [f64],
    params: ForestParams,
    features_per_split: usize,
    importance: Vec<f64>,
}

impl<'a> TreeBuilder<'a> {
    fn new(features: &'a [Vec<f64>], target: &'a [f64], params: ForestParams) -> Self {
        let p = features.len();
        Self {
            features,
            target,
            params,
            features_per_split: ((p as f64).sqrt().round() as usize).clamp(1, p.max(1)),
            importance: vec![0.0; p],
        }
    }

    /// Sum of squared errors around the mean of `rows`.
    fn sse(&self, rows: &[usize]) -> f64 {
        let n = rows.len() as f64;
        let (sum, sum_sq) = rows.iter().fold((0.0, 0.0), |(s, sq), &r| {
            let y = self.target[r];
            (s + y, sq + y * y)
        });
        (sum_sq - sum * sum / n).max(0.0)
    }

    fn best_split(&self, rows: &[usize], parent_sse: f64, rng: &mut ChaCha8Rng) -> Option<Split> {
        let leaf = self.params.min_samples_leaf.max(1);
        let candidates = sample(rng, self.features.len(), self.features_per_split);

        let mut best: Option<Split> = None;
        for feature in candidates.iter() {
            let column = &self.features[feature];
            let mut sorted = rows.to_vec();
            sorted.sort_by(|a, b| {
                column[*a]
                    .partial_cmp(&column[*b])
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            let total: f64 = sorted.iter().map(|&r| self.target[r]).sum();
            let total_sq: f64 = sorted.iter().map(|&r| self.target[r].powi(2)).sum();
            let n = sorted.len();

            let (mut left_sum, mut left_sq) = (0.0, 0.0);
            for i in 1..n {
                let y = self.target[sorted[i - 1]];
                left_sum += y;
                left_sq += y * y;

                if i < leaf || n - i < leaf {
                    continue;
                }
                let (lo, hi) = (column[sorted[i - 1]], column[sorted[i]]);
                if lo >= hi {
                    continue;
                }

                let left_n = i as f64;
                let right_n = (n - i) as f64;
                let right_sum = total - left_sum;
                let right_sq = total_sq - left_sq;
                let child_sse = (left_sq - left_sum * left_sum / left_n).max(0.0)
                    + (right_sq - right_sum * right_sum / right_n).max(0.0);
                let gain = parent_sse - child_sse;

                if gain > best.as_ref().map_or(f64::EPSILON, |b| b.gain) {
                    best = Some(Split {
                        feature,
                        threshold: (lo + hi) / 2.0,
                        gain,
                    });
                }
            }
        }
        best
    }

    fn grow(&mut self, rows: &[usize], depth: usize, rng: &mut ChaCha8Rng) {
        if depth >= self.params.max_depth || rows.len() < 2 * self.params.min_samples_leaf.max(1) {
            return;
        }
        let parent_sse = self.sse(rows);
        if parent_sse <= f64::EPSILON {
            return;
        }
        let Some(split) = self.best_split(rows, parent_sse, rng) else {
            return;
        };

        self.importance[split.feature] += split.gain;
        let column = &self.features[split.feature];
        let (left, right): (Vec<usize>, Vec<usize>) =
            rows.iter().partition(|&&r| column[r] <= split.threshold);
        self.grow(&left, depth + 1, rng);
        self.grow(&right, depth + 1, rng);
    }
}

/// Mean impurity decrease per feature.
///
/// `features` are column-major without missing values and share the
/// target's rows.
#[must_use]
pub fn forest_importance(features: &[Vec<f64>], target: &[f64], params: ForestParams) -> Vec<f64> {
    let p = features.len();
    let n = target.len();
    if p == 0 || n < 2 || params.trees == 0 {
        return vec![0.0; p];
    }

    let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
    let mut builder = TreeBuilder::new(features, target, params);
    let draws = ((n as f64 * params.sample_fraction).ceil() as usize).clamp(1, n);

    for _ in 0..params.trees {
        let rows: Vec<usize> = (0..draws).map(|_| rng.gen_range(0..n)).collect();
        builder.grow(&rows, 0, &mut rng);
    }

    let trees = params.trees as f64;
    builder.importance.into_iter().map(|v| v / trees).collect()
}
