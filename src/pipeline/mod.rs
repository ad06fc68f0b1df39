//! Trained pipeline artifact
//!
//! The artifact fuses schema, transformer state, and model into the unit
//! of persistence and deployment. It is created once per training run,
//! written as a single blob, and only ever read back by serving processes;
//! retraining replaces it wholesale.

use chrono::{DateTime, Utc};
use ndarray::s;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::data::{DataCleaner, DatasetConfig};
use crate::error::{Result, ScoreError};
use crate::preprocessing::{FeatureSchema, FeatureTransformer};
use crate::training::{BoostedClassifier, BoostingConfig, ClassificationReport};

/// Fraction of rows held out (from the tail, deterministically) for the
/// post-training metrics report
const VALIDATION_SPLIT: f64 = 0.2;

/// Training-run facts carried with the artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    /// Dataset variant name
    pub dataset: String,
    /// Rows the pipeline was fitted on (after cleaning)
    pub n_rows: usize,
    /// Width of the transformed feature matrix
    pub n_features: usize,
    /// Raw target value encoded as the positive class
    pub positive_class: String,
    pub trained_at: DateTime<Utc>,
    /// Held-out metrics; absent when the table was too small to split
    pub metrics: Option<ClassificationReport>,
}

/// The frozen {schema, transformer, model} bundle.
///
/// Read-only for the lifetime of a serving process. Saving and reloading
/// reproduces bit-identical predictions and explanations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineArtifact {
    pub schema: FeatureSchema,
    pub transformer: FeatureTransformer,
    pub model: BoostedClassifier,
    pub metadata: ArtifactMetadata,
}

impl PipelineArtifact {
    /// Write the artifact as one JSON blob
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string(self)
            .map_err(|e| ScoreError::ArtifactCorrupt(e.to_string()))?;
        std::fs::write(path, json)?;
        info!(path = %path.display(), "artifact saved");
        Ok(())
    }

    /// Load an artifact, distinguishing a missing file
    /// ([`ScoreError::ArtifactNotFound`]) from a structurally broken one
    /// ([`ScoreError::ArtifactCorrupt`]).
    pub fn load(path: &Path) -> Result<Self> {
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ScoreError::ArtifactNotFound(path.to_path_buf()));
            }
            Err(e) => return Err(ScoreError::Io(e)),
        };

        serde_json::from_str(&json).map_err(|e| ScoreError::ArtifactCorrupt(e.to_string()))
    }
}

/// Train the full pipeline on a raw table: clean, fit the transformer,
/// train the classifier, bundle the artifact.
///
/// Hyperparameters are validated up front; a deterministic tail split
/// provides the held-out metrics report.
pub fn train_pipeline(
    raw: &DataFrame,
    dataset: &DatasetConfig,
    boosting: &BoostingConfig,
) -> Result<PipelineArtifact> {
    boosting.validate()?;

    let cleaner = DataCleaner::new(dataset.clone());
    let (clean, schema) = cleaner.clean(raw)?;

    let y: Vec<f64> = clean
        .column(&dataset.target_column)?
        .cast(&DataType::Float64)?
        .f64()?
        .into_iter()
        .map(|v| v.unwrap_or(0.0))
        .collect();
    let y = ndarray::Array1::from_vec(y);

    let features = clean.drop(&dataset.target_column)?;

    let mut transformer = FeatureTransformer::new();
    transformer.fit(&features, &schema)?;
    let x = transformer.transform(&features)?;

    let n = x.nrows();
    let val_size = (n as f64 * VALIDATION_SPLIT) as usize;
    let train_size = n - val_size;

    let mut model = BoostedClassifier::new(boosting.clone());
    let metrics = if val_size > 0 {
        let x_train = x.slice(s![..train_size, ..]).to_owned();
        let y_train = y.slice(s![..train_size]).to_owned();
        model.fit(&x_train, &y_train)?;

        let x_val = x.slice(s![train_size.., ..]).to_owned();
        let y_val: Vec<f64> = y.slice(s![train_size..]).to_vec();
        let probs = model.predict_proba(&x_val)?.to_vec();
        Some(ClassificationReport::compute(&y_val, &probs))
    } else {
        model.fit(&x, &y)?;
        None
    };

    let positive_class = dataset
        .target_mapping
        .iter()
        .find(|(_, label)| *label == 1)
        .map(|(value, _)| value.clone())
        .unwrap_or_default();

    let metadata = ArtifactMetadata {
        dataset: dataset.name.clone(),
        n_rows: n,
        n_features: transformer.output_width(),
        positive_class,
        trained_at: Utc::now(),
        metrics,
    };

    info!(
        dataset = %metadata.dataset,
        rows = metadata.n_rows,
        features = metadata.n_features,
        "pipeline trained"
    );

    Ok(PipelineArtifact {
        schema,
        transformer,
        model,
        metadata,
    })
}
