//! Validation metrics for binary classification

use serde::{Deserialize, Serialize};

/// Held-out metrics computed after training, stored with the artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub accuracy: f64,
    pub log_loss: f64,
    pub roc_auc: f64,
    pub n_samples: usize,
}

impl ClassificationReport {
    /// Compute all metrics from true labels and predicted probabilities.
    /// The label threshold matches serving: probability >= 0.5.
    pub fn compute(y_true: &[f64], probs: &[f64]) -> Self {
        let n = y_true.len();

        let correct = y_true
            .iter()
            .zip(probs.iter())
            .filter(|(&y, &p)| (p >= 0.5) == (y == 1.0))
            .count();
        let accuracy = correct as f64 / n.max(1) as f64;

        let eps = 1e-15;
        let log_loss = y_true
            .iter()
            .zip(probs.iter())
            .map(|(&y, &p)| {
                let p = p.clamp(eps, 1.0 - eps);
                -(y * p.ln() + (1.0 - y) * (1.0 - p).ln())
            })
            .sum::<f64>()
            / n.max(1) as f64;

        Self {
            accuracy,
            log_loss,
            roc_auc: roc_auc(y_true, probs),
            n_samples: n,
        }
    }
}

/// ROC-AUC via the rank-sum formulation, with tied scores sharing their
/// average rank. Degenerates to 0.5 when only one class is present.
fn roc_auc(y_true: &[f64], probs: &[f64]) -> f64 {
    let n = y_true.len();
    let n_pos = y_true.iter().filter(|&&y| y == 1.0).count();
    let n_neg = n - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return 0.5;
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        probs[a]
            .partial_cmp(&probs[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    // Assign average ranks to ties
    let mut ranks = vec![0.0f64; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && probs[order[j + 1]] == probs[order[i]] {
            j += 1;
        }
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg_rank;
        }
        i = j + 1;
    }

    let rank_sum_pos: f64 = y_true
        .iter()
        .zip(ranks.iter())
        .filter(|(&y, _)| y == 1.0)
        .map(|(_, &r)| r)
        .sum();

    (rank_sum_pos - n_pos as f64 * (n_pos as f64 + 1.0) / 2.0) / (n_pos as f64 * n_neg as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_separation() {
        let y = vec![0.0, 0.0, 1.0, 1.0];
        let p = vec![0.1, 0.2, 0.8, 0.9];

        let report = ClassificationReport::compute(&y, &p);
        assert_eq!(report.accuracy, 1.0);
        assert_eq!(report.roc_auc, 1.0);
        assert!(report.log_loss < 0.3);
    }

    #[test]
    fn test_inverted_predictions() {
        let y = vec![0.0, 1.0];
        let p = vec![0.9, 0.1];

        let report = ClassificationReport::compute(&y, &p);
        assert_eq!(report.accuracy, 0.0);
        assert_eq!(report.roc_auc, 0.0);
    }

    #[test]
    fn test_single_class_auc_degenerates() {
        let y = vec![1.0, 1.0, 1.0];
        let p = vec![0.5, 0.6, 0.7];

        let report = ClassificationReport::compute(&y, &p);
        assert_eq!(report.roc_auc, 0.5);
    }

    #[test]
    fn test_tied_scores_average_rank() {
        let y = vec![0.0, 1.0, 0.0, 1.0];
        let p = vec![0.5, 0.5, 0.5, 0.5];

        let report = ClassificationReport::compute(&y, &p);
        assert_eq!(report.roc_auc, 0.5);
    }
}
