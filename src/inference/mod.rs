//! Inference service contract
//!
//! Stateless prediction over one record with a loaded artifact, plus the
//! process-wide artifact store serving processes swap atomically on
//! reload. Aliasing between external field names and schema names is the
//! caller's job; the core sees schema names only.

use parking_lot::RwLock;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::error::{Result, ScoreError};
use crate::pipeline::PipelineArtifact;
use crate::preprocessing::FeatureSchema;

/// A scalar field value in a prediction request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Text(String),
}

/// One applicant record: schema feature name -> scalar value.
/// Extra keys are ignored; missing schema features are rejected.
pub type Record = BTreeMap<String, FieldValue>;

/// Prediction response. The label derives from the fixed, documented
/// threshold probability >= 0.5; the raw probability stays available so
/// external layers can apply their own cutoff without re-scoring.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Prediction {
    /// 1 = positive/adverse class, 0 = negative/favorable
    pub label: u8,
    /// Probability of the positive class
    pub probability: f64,
}

impl Prediction {
    /// Probability rounded to 4 decimal places for display
    pub fn display_probability(&self) -> f64 {
        (self.probability * 10_000.0).round() / 10_000.0
    }
}

/// Score one record with a loaded artifact.
///
/// The record is validated against the artifact's schema (missing
/// features are a [`ScoreError::SchemaViolation`]), transformed through
/// the exact single-record-equals-one-row-table path, and scored.
pub fn predict(artifact: &PipelineArtifact, record: &Record) -> Result<Prediction> {
    let frame = record_to_frame(record, &artifact.schema)?;
    let x = artifact.transformer.transform(&frame)?;
    let probs = artifact.model.predict_proba(&x)?;
    let probability = probs[0];

    Ok(Prediction {
        label: u8::from(probability >= 0.5),
        probability,
    })
}

/// Build a one-row DataFrame from a record, enforcing the schema.
pub(crate) fn record_to_frame(record: &Record, schema: &FeatureSchema) -> Result<DataFrame> {
    let missing: Vec<&str> = schema
        .feature_names()
        .filter(|name| !record.contains_key(name.as_str()))
        .map(|name| name.as_str())
        .collect();
    if !missing.is_empty() {
        return Err(ScoreError::SchemaViolation(format!(
            "missing required features: {}",
            missing.join(", ")
        )));
    }

    let mut columns: Vec<Column> = Vec::with_capacity(schema.feature_count());

    for name in &schema.numeric {
        let value = match &record[name.as_str()] {
            FieldValue::Int(v) => *v as f64,
            FieldValue::Float(v) => *v,
            FieldValue::Text(s) => s.trim().parse::<f64>().map_err(|_| {
                ScoreError::SchemaViolation(format!(
                    "feature `{}` expects a numeric value, got `{}`",
                    name, s
                ))
            })?,
        };
        columns.push(Column::new(name.as_str().into(), vec![value]));
    }

    for name in &schema.categorical {
        let value = match &record[name.as_str()] {
            FieldValue::Int(v) => v.to_string(),
            FieldValue::Float(v) => v.to_string(),
            FieldValue::Text(s) => s.clone(),
        };
        columns.push(Column::new(name.as_str().into(), vec![value]));
    }

    DataFrame::new(columns).map_err(|e| ScoreError::SchemaViolation(e.to_string()))
}

/// Process-wide artifact handle.
///
/// The artifact is loaded once and shared by reference across concurrent
/// requests; `publish` swaps the shared `Arc` atomically so no in-flight
/// request ever observes a half-updated artifact. Until something is
/// published the store reports [`ScoreError::ArtifactNotReady`].
pub struct ArtifactStore {
    slot: RwLock<Option<Arc<PipelineArtifact>>>,
}

impl ArtifactStore {
    /// Create an empty (not ready) store
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(None),
        }
    }

    /// Atomically replace the served artifact
    pub fn publish(&self, artifact: PipelineArtifact) {
        let rows = artifact.metadata.n_rows;
        *self.slot.write() = Some(Arc::new(artifact));
        info!(trained_on_rows = rows, "artifact published");
    }

    /// Snapshot the current artifact for one request
    pub fn get(&self) -> Result<Arc<PipelineArtifact>> {
        self.slot
            .read()
            .as_ref()
            .cloned()
            .ok_or(ScoreError::ArtifactNotReady)
    }

    pub fn is_ready(&self) -> bool {
        self.slot.read().is_some()
    }

    /// Load an artifact file and publish it. On failure the previously
    /// published artifact (if any) keeps serving.
    pub fn load_and_publish(&self, path: &Path) -> Result<()> {
        let artifact = PipelineArtifact::load(path)?;
        self.publish(artifact);
        Ok(())
    }
}

impl Default for ArtifactStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_schema() -> FeatureSchema {
        FeatureSchema::new(
            vec!["age".to_string()],
            vec!["housing".to_string()],
        )
    }

    fn toy_record() -> Record {
        let mut record = Record::new();
        record.insert("age".to_string(), FieldValue::Int(35));
        record.insert("housing".to_string(), FieldValue::Text("own".to_string()));
        record
    }

    #[test]
    fn test_record_to_frame() {
        let frame = record_to_frame(&toy_record(), &toy_schema()).unwrap();
        assert_eq!(frame.height(), 1);
        assert_eq!(
            frame.column("age").unwrap().f64().unwrap().get(0),
            Some(35.0)
        );
        assert_eq!(
            frame.column("housing").unwrap().str().unwrap().get(0),
            Some("own")
        );
    }

    #[test]
    fn test_missing_feature_rejected() {
        let mut record = toy_record();
        record.remove("age");

        let err = record_to_frame(&record, &toy_schema()).unwrap_err();
        assert!(matches!(err, ScoreError::SchemaViolation(_)));
        assert!(err.to_string().contains("age"));
    }

    #[test]
    fn test_extra_fields_ignored() {
        let mut record = toy_record();
        record.insert("unrelated".to_string(), FieldValue::Int(1));

        let frame = record_to_frame(&record, &toy_schema()).unwrap();
        assert_eq!(frame.width(), 2);
    }

    #[test]
    fn test_text_in_numeric_field() {
        let mut record = toy_record();
        record.insert("age".to_string(), FieldValue::Text("not-a-number".to_string()));

        assert!(matches!(
            record_to_frame(&record, &toy_schema()),
            Err(ScoreError::SchemaViolation(_))
        ));
    }

    #[test]
    fn test_numeric_coded_category_becomes_text() {
        let mut record = toy_record();
        record.insert("housing".to_string(), FieldValue::Int(3));

        let frame = record_to_frame(&record, &toy_schema()).unwrap();
        assert_eq!(
            frame.column("housing").unwrap().str().unwrap().get(0),
            Some("3")
        );
    }

    #[test]
    fn test_display_probability_rounding() {
        let prediction = Prediction {
            label: 1,
            probability: 0.654_349,
        };
        assert_eq!(prediction.display_probability(), 0.6543);
    }

    #[test]
    fn test_store_not_ready() {
        let store = ArtifactStore::new();
        assert!(!store.is_ready());
        assert!(matches!(store.get(), Err(ScoreError::ArtifactNotReady)));
    }

    #[test]
    fn test_field_value_deserializes_untagged() {
        let record: Record =
            serde_json::from_str(r#"{"age": 35, "amount": 2000.5, "housing": "own"}"#).unwrap();
        assert_eq!(record["age"], FieldValue::Int(35));
        assert_eq!(record["amount"], FieldValue::Float(2000.5));
        assert_eq!(record["housing"], FieldValue::Text("own".to_string()));
    }
}
