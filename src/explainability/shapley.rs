//! Sampled Shapley attribution of single predictions

use ndarray::{Array1, Array2, Axis};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScoreError};
use crate::inference::{record_to_frame, Record};
use crate::pipeline::PipelineArtifact;
use crate::preprocessing::FeatureGroup;

/// One feature's contribution to a prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attribution {
    pub feature: String,
    pub value: f64,
}

/// Additive decomposition of one prediction.
///
/// Local accuracy: `baseline + sum of attributions` reconstructs the
/// model's prediction up to the sampling tolerance; the leftover is
/// exposed through [`Explanation::residual`] for validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Explanation {
    /// Per-transformed-feature attributions, in the transformer's
    /// deterministic column order
    pub attributions: Vec<Attribution>,
    /// Expected model output over the background set
    pub baseline: f64,
    /// The model's actual prediction for the explained record
    pub prediction: f64,
    groups: Vec<FeatureGroup>,
}

impl Explanation {
    /// Sum of all attributions
    pub fn sum(&self) -> f64 {
        self.attributions.iter().map(|a| a.value).sum()
    }

    /// `baseline + sum`, the reconstructed prediction
    pub fn reconstructed(&self) -> f64 {
        self.baseline + self.sum()
    }

    /// Reconstruction error of the sampling approximation
    pub fn residual(&self) -> f64 {
        self.prediction - self.reconstructed()
    }

    /// Attributions re-aggregated to their source feature: one-hot
    /// indicator contributions sum over the group, so categorical
    /// features report one human-readable number.
    pub fn grouped(&self) -> Vec<Attribution> {
        self.groups
            .iter()
            .map(|group| {
                let value = self.attributions[group.start..group.start + group.len]
                    .iter()
                    .map(|a| a.value)
                    .sum();
                Attribution {
                    feature: group.source.clone(),
                    value,
                }
            })
            .collect()
    }

    /// The `k` largest attributions by magnitude, descending
    pub fn top_k(&self, k: usize) -> Vec<&Attribution> {
        let mut sorted: Vec<&Attribution> = self.attributions.iter().collect();
        sorted.sort_by(|a, b| {
            b.value
                .abs()
                .partial_cmp(&a.value.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        sorted.truncate(k);
        sorted
    }
}

/// Monte-Carlo permutation estimator of Shapley values.
///
/// For each sampled permutation the features of a random background row
/// are switched one by one to the record's values; the prediction deltas
/// are each feature's marginal contribution in that ordering, and the
/// average over permutations approximates its Shapley value. The
/// background represents the "no information" state — an all-zero matrix
/// is a common choice, but note that for standardized numerics zero means
/// "average", not "absent"; that semantic belongs to the caller.
pub struct ShapleyExplainer<'a> {
    artifact: &'a PipelineArtifact,
    background: Array2<f64>,
    n_samples: usize,
    seed: Option<u64>,
}

impl<'a> ShapleyExplainer<'a> {
    /// Create an explainer over a loaded artifact and a background matrix
    /// with the artifact's transformed width.
    pub fn new(artifact: &'a PipelineArtifact, background: Array2<f64>) -> Result<Self> {
        if background.nrows() == 0 {
            return Err(ScoreError::ExplanationSampling(
                "background set is empty".to_string(),
            ));
        }
        if background.ncols() != artifact.model.n_features() {
            return Err(ScoreError::ExplanationSampling(format!(
                "background width {} does not match the model's {} features",
                background.ncols(),
                artifact.model.n_features()
            )));
        }

        Ok(Self {
            artifact,
            background,
            n_samples: 100,
            seed: None,
        })
    }

    /// Number of sampled permutations. More samples reduce attribution
    /// variance linearly in cost; this is the accuracy/compute knob.
    pub fn with_sample_count(mut self, n: usize) -> Self {
        self.n_samples = n.max(10);
        self
    }

    /// Pin the RNG so repeated explanations are identical
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Explain one record
    pub fn explain(&self, record: &Record) -> Result<Explanation> {
        let frame = record_to_frame(record, &self.artifact.schema)?;
        let x = self.artifact.transformer.transform(&frame)?;
        let instance = x.row(0).to_owned();
        self.explain_vector(&instance)
    }

    /// Explain an already-transformed feature vector
    pub fn explain_vector(&self, instance: &Array1<f64>) -> Result<Explanation> {
        let n_features = instance.len();
        if n_features != self.artifact.model.n_features() {
            return Err(ScoreError::ShapeMismatch {
                expected: self.artifact.model.n_features(),
                actual: n_features,
            });
        }

        let baseline = self
            .artifact
            .model
            .predict_proba(&self.background)?
            .mean()
            .unwrap_or(0.0);

        let instance_2d = instance.clone().insert_axis(Axis(0));
        let prediction = self.artifact.model.predict_proba(&instance_2d)?[0];

        let base_seed = self.seed.unwrap_or_else(|| rand::thread_rng().gen());

        // One seeded walk per permutation; walks are independent, so they
        // run in parallel and reduce by index order afterwards, keeping
        // the result a function of the seed alone.
        let walks: Vec<Result<Vec<f64>>> = (0..self.n_samples)
            .into_par_iter()
            .map(|sample| {
                let mut rng =
                    Xoshiro256PlusPlus::seed_from_u64(base_seed.wrapping_add(sample as u64));
                self.permutation_walk(instance, &mut rng)
            })
            .collect();

        let mut totals = vec![0.0f64; n_features];
        for walk in walks {
            let deltas = walk?;
            for (total, delta) in totals.iter_mut().zip(deltas.iter()) {
                *total += delta;
            }
        }

        let names = self.artifact.transformer.feature_names();
        let attributions: Vec<Attribution> = totals
            .into_iter()
            .enumerate()
            .map(|(idx, total)| Attribution {
                feature: names[idx].clone(),
                value: total / self.n_samples as f64,
            })
            .collect();

        Ok(Explanation {
            attributions,
            baseline,
            prediction,
            groups: self.artifact.transformer.feature_groups(),
        })
    }

    /// Walk one random permutation from a background draw toward the
    /// instance, recording each feature's marginal prediction delta.
    fn permutation_walk(
        &self,
        instance: &Array1<f64>,
        rng: &mut Xoshiro256PlusPlus,
    ) -> Result<Vec<f64>> {
        let n_features = instance.len();

        let mut order: Vec<usize> = (0..n_features).collect();
        order.shuffle(rng);

        let bg_row = rng.gen_range(0..self.background.nrows());
        let mut current = self.background.row(bg_row).to_owned();
        let mut deltas = vec![0.0f64; n_features];

        let mut pred_before = self.predict_one(&current)?;
        for &feature in &order {
            current[feature] = instance[feature];
            let pred_after = self.predict_one(&current)?;
            deltas[feature] = pred_after - pred_before;
            pred_before = pred_after;
        }

        Ok(deltas)
    }

    fn predict_one(&self, row: &Array1<f64>) -> Result<f64> {
        let as_matrix = row.clone().insert_axis(Axis(0));
        Ok(self.artifact.model.predict_proba(&as_matrix)?[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DatasetConfig;
    use crate::pipeline::train_pipeline;
    use crate::training::BoostingConfig;
    use polars::prelude::*;

    fn toy_artifact() -> PipelineArtifact {
        let n = 60;
        let mut duration = Vec::with_capacity(n);
        let mut status = Vec::with_capacity(n);
        let mut label = Vec::with_capacity(n);
        for i in 0..n {
            duration.push(6.0 + (i % 40) as f64);
            status.push(if i % 2 == 0 { "A11" } else { "A14" });
            label.push(if i % 2 == 0 { 2i64 } else { 1 });
        }
        let df = df!(
            "status" => &status,
            "duration" => &duration,
            "label" => &label
        )
        .unwrap();

        let dataset = DatasetConfig {
            name: "toy".to_string(),
            separator: b',',
            has_header: true,
            column_names: None,
            drop_columns: Vec::new(),
            missing_sentinel: None,
            categorical_columns: vec!["status".to_string()],
            target_column: "label".to_string(),
            target_mapping: vec![("1".to_string(), 0), ("2".to_string(), 1)],
        };
        let boosting = BoostingConfig {
            n_estimators: 15,
            max_depth: 3,
            ..Default::default()
        };
        train_pipeline(&df, &dataset, &boosting).unwrap()
    }

    fn toy_record() -> Record {
        let mut record = Record::new();
        record.insert(
            "status".to_string(),
            crate::inference::FieldValue::Text("A11".to_string()),
        );
        record.insert("duration".to_string(), crate::inference::FieldValue::Int(24));
        record
    }

    #[test]
    fn test_local_accuracy_within_tolerance() {
        let artifact = toy_artifact();
        let width = artifact.model.n_features();
        let background = Array2::<f64>::zeros((1, width));

        let explainer = ShapleyExplainer::new(&artifact, background)
            .unwrap()
            .with_sample_count(200)
            .with_seed(42);

        let explanation = explainer.explain(&toy_record()).unwrap();
        assert!(
            explanation.residual().abs() < 0.05,
            "residual too large: {}",
            explanation.residual()
        );
    }

    #[test]
    fn test_seeded_explanations_identical() {
        let artifact = toy_artifact();
        let width = artifact.model.n_features();

        let explain = |seed: u64| {
            let background = Array2::<f64>::zeros((1, width));
            ShapleyExplainer::new(&artifact, background)
                .unwrap()
                .with_sample_count(50)
                .with_seed(seed)
                .explain(&toy_record())
                .unwrap()
        };

        let a = explain(7);
        let b = explain(7);
        for (attr_a, attr_b) in a.attributions.iter().zip(b.attributions.iter()) {
            assert_eq!(attr_a.value, attr_b.value);
        }
    }

    #[test]
    fn test_empty_background_rejected() {
        let artifact = toy_artifact();
        let width = artifact.model.n_features();
        let background = Array2::<f64>::zeros((0, width));

        assert!(matches!(
            ShapleyExplainer::new(&artifact, background),
            Err(ScoreError::ExplanationSampling(_))
        ));
    }

    #[test]
    fn test_background_width_mismatch_rejected() {
        let artifact = toy_artifact();
        let background = Array2::<f64>::zeros((1, 2));

        assert!(matches!(
            ShapleyExplainer::new(&artifact, background),
            Err(ScoreError::ExplanationSampling(_))
        ));
    }

    #[test]
    fn test_grouped_attributions_sum_matches() {
        let artifact = toy_artifact();
        let width = artifact.model.n_features();
        let background = Array2::<f64>::zeros((1, width));

        let explanation = ShapleyExplainer::new(&artifact, background)
            .unwrap()
            .with_sample_count(50)
            .with_seed(3)
            .explain(&toy_record())
            .unwrap();

        let grouped = explanation.grouped();
        // One entry per source feature, not per indicator column
        assert_eq!(grouped.len(), artifact.schema.feature_count());

        let grouped_sum: f64 = grouped.iter().map(|a| a.value).sum();
        assert!((grouped_sum - explanation.sum()).abs() < 1e-12);
    }

    #[test]
    fn test_feature_names_follow_transformer_layout() {
        let artifact = toy_artifact();
        let width = artifact.model.n_features();
        let background = Array2::<f64>::zeros((1, width));

        let explanation = ShapleyExplainer::new(&artifact, background)
            .unwrap()
            .with_sample_count(10)
            .with_seed(1)
            .explain(&toy_record())
            .unwrap();

        let names: Vec<&str> = explanation
            .attributions
            .iter()
            .map(|a| a.feature.as_str())
            .collect();
        let expected: Vec<&str> = artifact
            .transformer
            .feature_names()
            .iter()
            .map(|s| s.as_str())
            .collect();
        assert_eq!(names, expected);
    }
}
