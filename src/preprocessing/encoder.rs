//! One-hot encoding against a closed fit-time vocabulary

use crate::error::{Result, ScoreError};
use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One-hot encoder.
///
/// The vocabulary of each column is closed at fit time, in first-seen
/// order. At transform time a category outside the vocabulary encodes to
/// an all-zero indicator row ("ignore unknown"), never an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneHotEncoder {
    // Column order follows the fit call, vocabulary order is first-seen;
    // together they pin the indicator column layout.
    vocabularies: Vec<(String, Vec<String>)>,
    is_fitted: bool,
}

impl OneHotEncoder {
    pub fn new() -> Self {
        Self {
            vocabularies: Vec::new(),
            is_fitted: false,
        }
    }

    /// Collect the vocabulary of each column, in first-seen order
    pub fn fit(&mut self, df: &DataFrame, columns: &[String]) -> Result<&mut Self> {
        self.vocabularies.clear();

        for col_name in columns {
            let column = df.column(col_name).map_err(|_| {
                ScoreError::SchemaViolation(format!("column `{}` not found", col_name))
            })?;
            let ca = column.as_materialized_series().str()?;

            let mut vocabulary: Vec<String> = Vec::new();
            for value in ca.into_iter().flatten() {
                if !vocabulary.iter().any(|v| v == value) {
                    vocabulary.push(value.to_string());
                }
            }
            self.vocabularies.push((col_name.clone(), vocabulary));
        }

        self.is_fitted = true;
        Ok(self)
    }

    /// Total width of the indicator block
    pub fn width(&self) -> usize {
        self.vocabularies.iter().map(|(_, v)| v.len()).sum()
    }

    /// Indicator column names, `<column>_<category>`, in layout order
    pub fn feature_names(&self) -> Vec<String> {
        self.vocabularies
            .iter()
            .flat_map(|(col, vocab)| {
                vocab.iter().map(move |value| format!("{}_{}", col, value))
            })
            .collect()
    }

    /// Vocabulary size per source column, in layout order
    pub fn group_sizes(&self) -> Vec<(String, usize)> {
        self.vocabularies
            .iter()
            .map(|(col, vocab)| (col.clone(), vocab.len()))
            .collect()
    }

    /// Encode the fitted columns into an indicator matrix.
    ///
    /// Values outside the fit-time vocabulary leave their group all-zero;
    /// the number of such cells is logged at `warn` once per call.
    pub fn encode(&self, df: &DataFrame) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(ScoreError::NotFitted);
        }

        let n_rows = df.height();
        let mut block = Array2::<f64>::zeros((n_rows, self.width()));
        let mut unknown_cells = 0usize;

        let mut offset = 0usize;
        for (col_name, vocabulary) in &self.vocabularies {
            let column = df.column(col_name).map_err(|_| {
                ScoreError::SchemaViolation(format!("column `{}` not found", col_name))
            })?;
            let ca = column.as_materialized_series().str()?;

            for (row, value) in ca.into_iter().enumerate() {
                if let Some(value) = value {
                    match vocabulary.iter().position(|v| v == value) {
                        Some(idx) => block[[row, offset + idx]] = 1.0,
                        None => unknown_cells += 1,
                    }
                }
            }
            offset += vocabulary.len();
        }

        if unknown_cells > 0 {
            warn!(
                cells = unknown_cells,
                "categories outside the fitted vocabulary encoded as all-zero"
            );
        }

        Ok(block)
    }
}

impl Default for OneHotEncoder {
    fn default() -> Self {
        Self::new()
    }
}
