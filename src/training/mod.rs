//! Model training module
//!
//! Provides the gradient-boosted binary classifier consuming the
//! transformed feature matrix:
//! - Second-order boosting on the log-loss (gradient + hessian per round)
//! - Regression trees with regularized leaf weights and gain-based splits
//! - Validation metrics (accuracy, log-loss, ROC-AUC)

mod boosting;
mod metrics;
mod tree;

pub use boosting::{BoostedClassifier, BoostingConfig};
pub use metrics::ClassificationReport;
pub use tree::RegressionTree;
