//! Error types for the credscore crate
//!
//! One condition from the serving taxonomy is deliberately absent: a
//! categorical value outside the fit-time vocabulary is recovered by the
//! encoder (all-zero indicators, logged at `warn`), never raised.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for credscore operations
pub type Result<T> = std::result::Result<T, ScoreError>;

/// Main error type for the scoring core
#[derive(Error, Debug)]
pub enum ScoreError {
    /// Training source is unreadable, missing, or empty
    #[error("Data load error: {0}")]
    DataLoad(String),

    /// Invalid configuration: bad target mapping, out-of-range hyperparameter
    #[error("Configuration error: {0}")]
    Config(String),

    /// A request is missing required features or carries a wrong value domain
    #[error("Schema violation: {0}")]
    SchemaViolation(String),

    /// Transformed vector width disagrees with the model's trained width.
    /// Always fatal: indicates artifact/schema drift.
    #[error("Shape mismatch: expected {expected} features, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("Artifact not found at {0}")]
    ArtifactNotFound(PathBuf),

    #[error("Artifact corrupt: {0}")]
    ArtifactCorrupt(String),

    /// Serving-side "not trained yet" condition, distinct from a missing or
    /// corrupt artifact file
    #[error("No artifact published; model not available")]
    ArtifactNotReady,

    /// Background set empty or malformed
    #[error("Explanation sampling error: {0}")]
    ExplanationSampling(String),

    /// Component used before `fit`
    #[error("Not fitted")]
    NotFitted,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<polars::error::PolarsError> for ScoreError {
    fn from(err: polars::error::PolarsError) -> Self {
        ScoreError::DataLoad(err.to_string())
    }
}

impl From<serde_json::Error> for ScoreError {
    fn from(err: serde_json::Error) -> Self {
        ScoreError::ArtifactCorrupt(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ScoreError::DataLoad("empty file".to_string());
        assert_eq!(err.to_string(), "Data load error: empty file");
    }

    #[test]
    fn test_shape_mismatch_display() {
        let err = ScoreError::ShapeMismatch {
            expected: 61,
            actual: 60,
        };
        assert!(err.to_string().contains("61"));
        assert!(err.to_string().contains("60"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ScoreError = io_err.into();
        assert!(matches!(err, ScoreError::Io(_)));
    }
}
