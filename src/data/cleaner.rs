//! Cleaning pass over raw applicant tables

use crate::error::{Result, ScoreError};
use crate::preprocessing::FeatureSchema;
use polars::prelude::*;
use tracing::{info, warn};

use super::DatasetConfig;

/// Cleans a raw table according to a fixed dataset configuration and infers
/// the feature schema from the cleaned column dtypes.
///
/// The schema is inferred exactly once here; inference-time requests are
/// validated against the stored schema, never re-inspected.
pub struct DataCleaner {
    config: DatasetConfig,
}

impl DataCleaner {
    /// Create a cleaner for a dataset variant
    pub fn new(config: DatasetConfig) -> Self {
        Self { config }
    }

    /// Clean the raw table and infer the feature schema.
    ///
    /// Steps, in order: drop configured columns, remove duplicate rows,
    /// cast categorical columns to text, null out the missing sentinel,
    /// coerce malformed numeric literals to null, normalize the target.
    pub fn clean(&self, df: &DataFrame) -> Result<(DataFrame, FeatureSchema)> {
        if df.height() == 0 {
            return Err(ScoreError::DataLoad("empty table".to_string()));
        }

        let mut df = df.clone();

        for col_name in &self.config.drop_columns {
            if df.column(col_name).is_ok() {
                df = df.drop(col_name)?;
            }
        }

        let before = df.height();
        df = df.unique_stable(None, UniqueKeepStrategy::First, None)?;
        if df.height() < before {
            info!(
                dataset = %self.config.name,
                removed = before - df.height(),
                "removed duplicate rows"
            );
        }

        df = self.cast_categoricals(df)?;

        if let Some(sentinel) = &self.config.missing_sentinel {
            df = Self::null_out_sentinel(df, sentinel)?;
        }

        df = self.coerce_numeric(df)?;
        df = self.normalize_target(df)?;

        let schema = self.infer_schema(&df);
        Ok((df, schema))
    }

    /// Cast every configured categorical column to its textual form so that
    /// numeric-looking category codes never pass as ordinal numbers.
    fn cast_categoricals(&self, df: DataFrame) -> Result<DataFrame> {
        let mut result = df;
        for col_name in &self.config.categorical_columns {
            if let Ok(column) = result.column(col_name) {
                if column.dtype() != &DataType::String {
                    let casted = column.cast(&DataType::String)?;
                    result = result.with_column(casted)?.clone();
                }
            }
        }
        Ok(result)
    }

    /// Replace the literal missing-value sentinel with null in text columns
    fn null_out_sentinel(df: DataFrame, sentinel: &str) -> Result<DataFrame> {
        let mut result = df.clone();
        for column in df.get_columns() {
            if column.dtype() != &DataType::String {
                continue;
            }
            let series = column.as_materialized_series();
            let ca = series.str()?;
            let cleaned: StringChunked = ca
                .into_iter()
                .map(|opt| opt.filter(|s| s.trim() != sentinel))
                .collect();
            result = result
                .with_column(cleaned.with_name(series.name().clone()).into_series())?
                .clone();
        }
        Ok(result)
    }

    /// Columns declared numeric (not categorical, not the target) that
    /// arrive as text get a non-strict numeric cast: malformed literals
    /// become null instead of failing the row.
    fn coerce_numeric(&self, df: DataFrame) -> Result<DataFrame> {
        let mut result = df.clone();
        for column in df.get_columns() {
            let name = column.name().to_string();
            if name == self.config.target_column || self.config.is_categorical(&name) {
                continue;
            }
            if column.dtype() != &DataType::String {
                continue;
            }
            let nulls_before = column.null_count();
            let casted = column.cast(&DataType::Float64)?;
            let malformed = casted.null_count() - nulls_before;
            if malformed > 0 {
                warn!(
                    column = %name,
                    cells = malformed,
                    "coerced malformed numeric literals to missing"
                );
            }
            result = result.with_column(casted)?.clone();
        }
        Ok(result)
    }

    /// Map raw target values onto {0, 1}. Rows whose raw label is outside
    /// the mapping domain are dropped with a logged count; an absent target
    /// column or a mapping that leaves no rows is a configuration error.
    fn normalize_target(&self, df: DataFrame) -> Result<DataFrame> {
        let target = &self.config.target_column;
        let column = df.column(target).map_err(|_| {
            ScoreError::Config(format!("target column `{}` not found", target))
        })?;

        let as_text = column.cast(&DataType::String)?;
        let ca = as_text.str()?;

        let keep: Vec<bool> = ca
            .into_iter()
            .map(|opt| {
                opt.map_or(false, |raw| {
                    self.config
                        .target_mapping
                        .iter()
                        .any(|(value, _)| value == raw.trim())
                })
            })
            .collect();

        let dropped = keep.iter().filter(|&&k| !k).count();
        if dropped > 0 {
            warn!(
                dataset = %self.config.name,
                rows = dropped,
                "dropped rows with unmapped target labels"
            );
        }

        let mask = BooleanChunked::from_slice("keep".into(), &keep);
        let filtered = df.filter(&mask)?;
        if filtered.height() == 0 {
            return Err(ScoreError::Config(format!(
                "target mapping for `{}` matches no rows; unexpected target encoding",
                target
            )));
        }

        let ca = filtered.column(target)?.cast(&DataType::String)?;
        let labels: Vec<u32> = ca
            .str()?
            .into_iter()
            .map(|opt| {
                let raw = opt.unwrap_or_default().trim();
                self.config
                    .target_mapping
                    .iter()
                    .find(|(value, _)| value == raw)
                    .map(|(_, label)| *label as u32)
                    .unwrap_or(0)
            })
            .collect();

        let mut result = filtered;
        result.with_column(Series::new(target.as_str().into(), labels))?;
        Ok(result)
    }

    /// Partition the cleaned feature columns by dtype, in table order
    fn infer_schema(&self, df: &DataFrame) -> FeatureSchema {
        let mut numeric = Vec::new();
        let mut categorical = Vec::new();

        for column in df.get_columns() {
            let name = column.name().to_string();
            if name == self.config.target_column {
                continue;
            }
            match column.dtype() {
                DataType::Int8
                | DataType::Int16
                | DataType::Int32
                | DataType::Int64
                | DataType::UInt8
                | DataType::UInt16
                | DataType::UInt32
                | DataType::UInt64
                | DataType::Float32
                | DataType::Float64 => numeric.push(name),
                _ => categorical.push(name),
            }
        }

        FeatureSchema::new(numeric, categorical)
    }
}
