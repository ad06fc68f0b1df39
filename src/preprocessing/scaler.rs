//! Numeric feature standardization

use crate::error::{Result, ScoreError};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Parameters for one fitted column
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScalerParams {
    mean: f64,
    std: f64,
}

/// Z-score standardization: (x - mean) / std, with a zero-std guard so a
/// constant column scales to zero instead of dividing by zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    params: HashMap<String, ScalerParams>,
    is_fitted: bool,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self {
            params: HashMap::new(),
            is_fitted: false,
        }
    }

    /// Compute per-column mean and standard deviation
    pub fn fit(&mut self, df: &DataFrame, columns: &[String]) -> Result<&mut Self> {
        for col_name in columns {
            let column = df.column(col_name).map_err(|_| {
                ScoreError::SchemaViolation(format!("column `{}` not found", col_name))
            })?;
            let ca = column.as_materialized_series().f64()?;

            let mean = ca.mean().unwrap_or(0.0);
            let std = ca.std(1).unwrap_or(1.0);
            self.params.insert(
                col_name.clone(),
                ScalerParams {
                    mean,
                    std: if std == 0.0 { 1.0 } else { std },
                },
            );
        }

        self.is_fitted = true;
        Ok(self)
    }

    /// Standardize every fitted column
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(ScoreError::NotFitted);
        }

        let mut result = df.clone();
        for (col_name, params) in &self.params {
            let Ok(column) = df.column(col_name) else {
                continue;
            };
            let series = column.as_materialized_series();
            let ca = series.f64()?;

            let scaled: Float64Chunked = ca
                .into_iter()
                .map(|opt| opt.map(|v| (v - params.mean) / params.std))
                .collect();
            result = result
                .with_column(scaled.with_name(series.name().clone()).into_series())?
                .clone();
        }

        Ok(result)
    }
}

impl Default for StandardScaler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standardization() {
        let df = df!("a" => &[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();

        let mut scaler = StandardScaler::new();
        scaler.fit(&df, &["a".to_string()]).unwrap();
        let result = scaler.transform(&df).unwrap();

        let ca = result.column("a").unwrap().f64().unwrap();
        let mean: f64 = ca.into_no_null_iter().sum::<f64>() / 5.0;
        assert!(mean.abs() < 1e-12);
        // Middle value sits on the mean
        assert!(ca.get(2).unwrap().abs() < 1e-12);
    }

    #[test]
    fn test_constant_column_guard() {
        let df = df!("a" => &[7.0, 7.0, 7.0]).unwrap();

        let mut scaler = StandardScaler::new();
        scaler.fit(&df, &["a".to_string()]).unwrap();
        let result = scaler.transform(&df).unwrap();

        let ca = result.column("a").unwrap().f64().unwrap();
        for v in ca.into_no_null_iter() {
            assert_eq!(v, 0.0);
        }
    }

    #[test]
    fn test_transform_is_deterministic() {
        let df = df!("a" => &[1.0, 5.0, 9.0]).unwrap();

        let mut scaler = StandardScaler::new();
        scaler.fit(&df, &["a".to_string()]).unwrap();

        let first = scaler.transform(&df).unwrap();
        let second = scaler.transform(&df).unwrap();
        assert_eq!(
            first.column("a").unwrap().f64().unwrap().get(0),
            second.column("a").unwrap().f64().unwrap().get(0)
        );
    }
}
