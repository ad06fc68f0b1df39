//! Missing value imputation

use crate::error::{Result, ScoreError};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Strategy for imputing missing values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImputeStrategy {
    /// Replace with the column median (numeric)
    Median,
    /// Replace with the most frequent value (categorical)
    MostFrequent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum FillValue {
    Numeric(f64),
    Text(String),
}

/// Imputer with per-column fill values computed at fit time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Imputer {
    strategy: ImputeStrategy,
    fill_values: HashMap<String, FillValue>,
    is_fitted: bool,
}

impl Imputer {
    pub fn new(strategy: ImputeStrategy) -> Self {
        Self {
            strategy,
            fill_values: HashMap::new(),
            is_fitted: false,
        }
    }

    /// Compute fill values for the given columns
    pub fn fit(&mut self, df: &DataFrame, columns: &[String]) -> Result<&mut Self> {
        for col_name in columns {
            let column = df.column(col_name).map_err(|_| {
                ScoreError::SchemaViolation(format!("column `{}` not found", col_name))
            })?;
            let series = column.as_materialized_series();

            let fill = match self.strategy {
                ImputeStrategy::Median => {
                    let median = series.f64()?.median().unwrap_or(0.0);
                    FillValue::Numeric(median)
                }
                ImputeStrategy::MostFrequent => {
                    FillValue::Text(Self::mode_text(series)?)
                }
            };
            self.fill_values.insert(col_name.clone(), fill);
        }

        self.is_fitted = true;
        Ok(self)
    }

    /// Fill nulls in every fitted column
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(ScoreError::NotFitted);
        }

        let mut result = df.clone();
        for (col_name, fill) in &self.fill_values {
            let Ok(column) = df.column(col_name) else {
                continue;
            };
            let series = column.as_materialized_series();
            let filled = match fill {
                FillValue::Numeric(value) => {
                    let ca = series.f64()?;
                    let filled: Float64Chunked = ca
                        .into_iter()
                        .map(|opt| Some(opt.unwrap_or(*value)))
                        .collect();
                    filled.with_name(series.name().clone()).into_series()
                }
                FillValue::Text(value) => {
                    let ca = series.str()?;
                    let filled: StringChunked = ca
                        .into_iter()
                        .map(|opt| Some(opt.unwrap_or(value.as_str())))
                        .collect();
                    filled.with_name(series.name().clone()).into_series()
                }
            };
            result = result.with_column(filled)?.clone();
        }

        Ok(result)
    }

    /// Most frequent value of a text series. Ties break toward the
    /// lexicographically smaller value so fitting stays reproducible.
    fn mode_text(series: &Series) -> Result<String> {
        let ca = series.str()?;
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for value in ca.into_iter().flatten() {
            *counts.entry(value).or_insert(0) += 1;
        }

        let mode = counts
            .into_iter()
            .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(value, _)| value.to_string())
            .unwrap_or_default();
        Ok(mode)
    }
}
