//! Gradient-boosted binary classifier

use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::tree::{RegressionTree, TreeParams};
use crate::error::{Result, ScoreError};

/// Boosting hyperparameters.
///
/// Supplied by the training driver; validated once at training start.
/// `random_state: None` makes runs intentionally non-reproducible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoostingConfig {
    /// Number of boosting rounds (trees)
    pub n_estimators: usize,
    /// Shrinkage applied to each tree's contribution
    pub learning_rate: f64,
    /// Maximum tree depth
    pub max_depth: usize,
    /// Minimum hessian sum in a child
    pub min_child_weight: f64,
    /// L2 regularization on leaf weights
    pub reg_lambda: f64,
    /// Minimum gain to keep a split
    pub gamma: f64,
    /// Row subsample ratio per tree
    pub subsample: f64,
    /// Column subsample ratio per tree
    pub colsample_bytree: f64,
    /// Random seed
    pub random_state: Option<u64>,
}

impl Default for BoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 4,
            min_child_weight: 1.0,
            reg_lambda: 1.0,
            gamma: 0.0,
            subsample: 0.8,
            colsample_bytree: 0.8,
            random_state: Some(42),
        }
    }
}

impl BoostingConfig {
    /// Range-check every field. Called once when training starts.
    pub fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(ScoreError::Config(
                "n_estimators must be at least 1".to_string(),
            ));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(ScoreError::Config(format!(
                "learning_rate must be in (0, 1], got {}",
                self.learning_rate
            )));
        }
        if self.max_depth == 0 || self.max_depth > 32 {
            return Err(ScoreError::Config(format!(
                "max_depth must be in [1, 32], got {}",
                self.max_depth
            )));
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return Err(ScoreError::Config(format!(
                "subsample must be in (0, 1], got {}",
                self.subsample
            )));
        }
        if !(self.colsample_bytree > 0.0 && self.colsample_bytree <= 1.0) {
            return Err(ScoreError::Config(format!(
                "colsample_bytree must be in (0, 1], got {}",
                self.colsample_bytree
            )));
        }
        if self.reg_lambda < 0.0 || self.gamma < 0.0 || self.min_child_weight < 0.0 {
            return Err(ScoreError::Config(
                "reg_lambda, gamma, and min_child_weight must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Gradient-boosted decision tree ensemble for binary classification.
///
/// Trains with the second-order log-loss objective: per round, gradient
/// `p - y` and hessian `p (1 - p)` drive a regression tree whose shrunken
/// output accumulates onto the margin. The margin starts at the prior
/// log-odds and maps to a probability through the logistic function.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoostedClassifier {
    config: BoostingConfig,
    trees: Vec<RegressionTree>,
    initial_log_odds: f64,
    n_features: usize,
    is_fitted: bool,
}

impl BoostedClassifier {
    pub fn new(config: BoostingConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            initial_log_odds: 0.0,
            n_features: 0,
            is_fitted: false,
        }
    }

    /// Fit on a transformed matrix and {0, 1} labels
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.config.validate()?;

        let n_samples = x.nrows();
        let n_features = x.ncols();
        if n_samples == 0 || n_features == 0 {
            return Err(ScoreError::DataLoad(
                "training matrix is empty".to_string(),
            ));
        }
        if y.len() != n_samples {
            return Err(ScoreError::ShapeMismatch {
                expected: n_samples,
                actual: y.len(),
            });
        }

        let p = y.mean().unwrap_or(0.5).clamp(1e-6, 1.0 - 1e-6);
        self.initial_log_odds = (p / (1.0 - p)).ln();

        let mut rng = match self.config.random_state {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        let tree_params = TreeParams {
            max_depth: self.config.max_depth,
            min_child_weight: self.config.min_child_weight,
            reg_lambda: self.config.reg_lambda,
            gamma: self.config.gamma,
        };

        let mut margins = Array1::from_elem(n_samples, self.initial_log_odds);
        self.trees = Vec::with_capacity(self.config.n_estimators);

        for _ in 0..self.config.n_estimators {
            let mut grad = Array1::zeros(n_samples);
            let mut hess = Array1::zeros(n_samples);
            for i in 0..n_samples {
                let p = sigmoid(margins[i]);
                grad[i] = p - y[i];
                hess[i] = (p * (1.0 - p)).max(1e-16);
            }

            let rows = sample_indices(n_samples, self.config.subsample, &mut rng);
            let cols = sample_indices(n_features, self.config.colsample_bytree, &mut rng);

            let tree = RegressionTree::grow(x, &grad, &hess, &rows, &cols, &tree_params);

            for i in 0..n_samples {
                let row: Vec<f64> = x.row(i).to_vec();
                margins[i] += self.config.learning_rate * tree.predict_row(&row);
            }
            self.trees.push(tree);
        }

        self.n_features = n_features;
        self.is_fitted = true;
        info!(
            rounds = self.trees.len(),
            features = n_features,
            samples = n_samples,
            "boosting finished"
        );
        Ok(())
    }

    /// Probability of the positive class per row.
    ///
    /// A matrix whose width differs from the trained width means the
    /// artifact and the schema have drifted apart; always fatal.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if !self.is_fitted {
            return Err(ScoreError::NotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(ScoreError::ShapeMismatch {
                expected: self.n_features,
                actual: x.ncols(),
            });
        }

        let lr = self.config.learning_rate;
        let probs: Vec<f64> = (0..x.nrows())
            .map(|i| {
                let row: Vec<f64> = x.row(i).to_vec();
                let margin = self.initial_log_odds
                    + self
                        .trees
                        .iter()
                        .map(|tree| lr * tree.predict_row(&row))
                        .sum::<f64>();
                sigmoid(margin)
            })
            .collect();

        Ok(Array1::from_vec(probs))
    }

    /// Trained matrix width
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn config(&self) -> &BoostingConfig {
        &self.config
    }
}

fn sigmoid(margin: f64) -> f64 {
    1.0 / (1.0 + (-margin).exp())
}

/// Shuffle-and-truncate subsampling; indices come back sorted so the tree
/// sweep stays cache-friendly.
fn sample_indices(n: usize, ratio: f64, rng: &mut Xoshiro256PlusPlus) -> Vec<usize> {
    let size = ((n as f64) * ratio).ceil() as usize;
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);
    indices.truncate(size.max(1));
    indices.sort_unstable();
    indices
}
