//! Regression tree on gradient/hessian statistics

use ndarray::{Array1, Array2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Split-search parameters, borrowed from the boosting configuration
#[derive(Debug, Clone, Copy)]
pub(crate) struct TreeParams {
    pub max_depth: usize,
    pub min_child_weight: f64,
    pub reg_lambda: f64,
    pub gamma: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum TreeNode {
    Leaf {
        weight: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

/// A single boosting-round tree fit to gradient/hessian statistics.
///
/// Leaf weights are the regularized optimum -G / (H + lambda); splits are
/// scored by the second-order gain and pruned below `gamma`. Nodes store
/// original feature indices, so prediction walks full-width rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionTree {
    root: TreeNode,
}

impl RegressionTree {
    /// Grow a tree over the given row subset, considering only the given
    /// feature subset for splits.
    pub(crate) fn grow(
        x: &Array2<f64>,
        grad: &Array1<f64>,
        hess: &Array1<f64>,
        rows: &[usize],
        features: &[usize],
        params: &TreeParams,
    ) -> Self {
        let root = build_node(x, grad, hess, rows, features, 0, params);
        Self { root }
    }

    /// Predict the leaf weight for one full-width row
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let mut node = &self.root;
        loop {
            match node {
                TreeNode::Leaf { weight } => return *weight,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }
}

fn build_node(
    x: &Array2<f64>,
    grad: &Array1<f64>,
    hess: &Array1<f64>,
    rows: &[usize],
    features: &[usize],
    depth: usize,
    params: &TreeParams,
) -> TreeNode {
    let g_sum: f64 = rows.iter().map(|&i| grad[i]).sum();
    let h_sum: f64 = rows.iter().map(|&i| hess[i]).sum();
    let leaf_weight = -g_sum / (h_sum + params.reg_lambda);

    if depth >= params.max_depth || rows.len() < 2 || h_sum < params.min_child_weight {
        return TreeNode::Leaf {
            weight: leaf_weight,
        };
    }

    // Each feature finds its own best split independently
    let best = features
        .par_iter()
        .filter_map(|&f| best_split_for_feature(x, grad, hess, rows, f, params))
        .max_by(|a, b| a.gain.partial_cmp(&b.gain).unwrap_or(std::cmp::Ordering::Equal));

    match best {
        Some(split) if split.gain > params.gamma => {
            let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
                .iter()
                .partition(|&&i| x[[i, split.feature]] <= split.threshold);

            if left_rows.is_empty() || right_rows.is_empty() {
                return TreeNode::Leaf {
                    weight: leaf_weight,
                };
            }

            let left = build_node(x, grad, hess, &left_rows, features, depth + 1, params);
            let right = build_node(x, grad, hess, &right_rows, features, depth + 1, params);

            TreeNode::Split {
                feature: split.feature,
                threshold: split.threshold,
                left: Box::new(left),
                right: Box::new(right),
            }
        }
        _ => TreeNode::Leaf {
            weight: leaf_weight,
        },
    }
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// Exact greedy split search over one feature: sort rows by value, sweep
/// the prefix sums of gradient/hessian, score each distinct boundary.
fn best_split_for_feature(
    x: &Array2<f64>,
    grad: &Array1<f64>,
    hess: &Array1<f64>,
    rows: &[usize],
    feature: usize,
    params: &TreeParams,
) -> Option<SplitCandidate> {
    let mut sorted: Vec<usize> = rows.to_vec();
    sorted.sort_by(|&a, &b| {
        x[[a, feature]]
            .partial_cmp(&x[[b, feature]])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let g_total: f64 = sorted.iter().map(|&i| grad[i]).sum();
    let h_total: f64 = sorted.iter().map(|&i| hess[i]).sum();
    let lambda = params.reg_lambda;
    let parent_score = g_total * g_total / (h_total + lambda);

    let mut g_left = 0.0;
    let mut h_left = 0.0;
    let mut best: Option<SplitCandidate> = None;

    for pos in 0..sorted.len() - 1 {
        let idx = sorted[pos];
        g_left += grad[idx];
        h_left += hess[idx];

        let value = x[[idx, feature]];
        let next_value = x[[sorted[pos + 1], feature]];
        if next_value <= value {
            continue; // no boundary between equal values
        }

        let g_right = g_total - g_left;
        let h_right = h_total - h_left;
        if h_left < params.min_child_weight || h_right < params.min_child_weight {
            continue;
        }

        let gain = 0.5
            * (g_left * g_left / (h_left + lambda) + g_right * g_right / (h_right + lambda)
                - parent_score);

        if best.as_ref().map_or(true, |b| gain > b.gain) {
            best = Some(SplitCandidate {
                feature,
                threshold: (value + next_value) / 2.0,
                gain,
            });
        }
    }

    best
}
