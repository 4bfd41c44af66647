//! Random forest regression
//!
//! Each tree is a CART regressor grown on a bootstrap sample of the training
//! rows, splitting on the threshold (midpoint between adjacent distinct
//! values) that minimises the summed squared error of the two children.
//! Predictions average the trees. A fixed seed makes fitting reproducible.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::scaler::check_matrix;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub seed: u64,
    /// `None` grows trees until leaves are pure
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 120,
            seed: 42,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Flat node arena; node 0 is the root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    fn fit(x: &[Vec<f64>], y: &[f64], sample: Vec<usize>, params: &ForestParams) -> Self {
        let mut nodes = Vec::new();
        grow(&mut nodes, x, y, sample, 0, params);
        Self { nodes }
    }

    fn predict(&self, row: &[f64]) -> f64 {
        let mut id = 0;
        loop {
            match &self.nodes[id] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    id = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

struct SplitChoice {
    feature: usize,
    threshold: f64,
    sse: f64,
}

fn mean_of(y: &[f64], sample: &[usize]) -> f64 {
    sample.iter().map(|&i| y[i]).sum::<f64>() / sample.len() as f64
}

fn grow(
    nodes: &mut Vec<Node>,
    x: &[Vec<f64>],
    y: &[f64],
    sample: Vec<usize>,
    depth: usize,
    params: &ForestParams,
) -> usize {
    let id = nodes.len();
    nodes.push(Node::Leaf {
        value: mean_of(y, &sample),
    });

    let depth_reached = params.max_depth.is_some_and(|max| depth >= max);
    let first = y[sample[0]];
    let pure = sample.iter().all(|&i| y[i] == first);
    if depth_reached || pure || sample.len() < params.min_samples_split.max(2) {
        return id;
    }

    let Some(split) = best_split(x, y, &sample, params.min_samples_leaf.max(1)) else {
        return id;
    };

    let (left_sample, right_sample): (Vec<usize>, Vec<usize>) = sample
        .into_iter()
        .partition(|&i| x[i][split.feature] <= split.threshold);

    let left = grow(nodes, x, y, left_sample, depth + 1, params);
    let right = grow(nodes, x, y, right_sample, depth + 1, params);
    nodes[id] = Node::Split {
        feature: split.feature,
        threshold: split.threshold,
        left,
        right,
    };
    id
}

fn best_split(x: &[Vec<f64>], y: &[f64], sample: &[usize], min_leaf: usize) -> Option<SplitChoice> {
    let n = sample.len();
    let total_sum: f64 = sample.iter().map(|&i| y[i]).sum();
    let total_sq: f64 = sample.iter().map(|&i| y[i] * y[i]).sum();
    let parent_sse = total_sq - total_sum * total_sum / n as f64;

    let mut best: Option<SplitChoice> = None;
    let mut order = sample.to_vec();

    for feature in 0..x[sample[0]].len() {
        order.sort_by(|&a, &b| x[a][feature].total_cmp(&x[b][feature]));

        let mut left_sum = 0.0;
        let mut left_sq = 0.0;
        for k in 1..n {
            let prev = order[k - 1];
            left_sum += y[prev];
            left_sq += y[prev] * y[prev];

            let (lo, hi) = (x[prev][feature], x[order[k]][feature]);
            if lo == hi || k < min_leaf || n - k < min_leaf {
                continue;
            }

            let right_sum = total_sum - left_sum;
            let right_sq = total_sq - left_sq;
            let sse = (left_sq - left_sum * left_sum / k as f64)
                + (right_sq - right_sum * right_sum / (n - k) as f64);

            if best.as_ref().map_or(true, |b| sse < b.sse) {
                best = Some(SplitChoice {
                    feature,
                    threshold: (lo + hi) / 2.0,
                    sse,
                });
            }
        }
    }

    best.filter(|b| b.sse < parent_sse + f64::EPSILON * parent_sse.abs().max(1.0))
}

/// Bagging ensemble of regression trees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    params: ForestParams,
    n_features: usize,
    trees: Vec<RegressionTree>,
}

impl RandomForestRegressor {
    pub fn new(params: ForestParams) -> Self {
        Self {
            params,
            n_features: 0,
            trees: Vec::new(),
        }
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    /// Fit on rows `x` with targets `y`, replacing any previous fit
    pub fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()> {
        let width = check_matrix(x)?;
        if x.len() != y.len() {
            return Err(Error::InvalidArgument(format!(
                "{} feature rows but {} targets",
                x.len(),
                y.len()
            )));
        }
        if y.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidArgument("targets must be finite".into()));
        }

        let mut rng = StdRng::seed_from_u64(self.params.seed);
        let n = x.len();
        let n_trees = self.params.n_estimators.max(1);

        self.trees = (0..n_trees)
            .map(|_| {
                let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                RegressionTree::fit(x, y, sample, &self.params)
            })
            .collect();
        self.n_features = width;
        Ok(())
    }

    pub fn predict_row(&self, row: &[f64]) -> Result<f64> {
        if !self.is_fitted() {
            return Err(Error::ModelNotTrained("forest has not been fitted".into()));
        }
        if row.len() != self.n_features {
            return Err(Error::InvalidArgument(format!(
                "model expects {} features, got {}",
                self.n_features,
                row.len()
            )));
        }
        let sum: f64 = self.trees.iter().map(|t| t.predict(row)).sum();
        Ok(sum / self.trees.len() as f64)
    }

    pub fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        x.iter().map(|row| self.predict_row(row)).collect()
    }
}
