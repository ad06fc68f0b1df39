//! Fitted preprocessing transformer

use crate::error::{Result, ScoreError};
use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::{FeatureSchema, ImputeStrategy, Imputer, OneHotEncoder, StandardScaler};

/// One contiguous range of transformed columns traced back to a source
/// feature. Numeric features are width-1 groups; categorical features span
/// their vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureGroup {
    pub source: String,
    pub start: usize,
    pub len: usize,
}

/// Per-column-type preprocessing producing a fixed-width numeric matrix.
///
/// Numeric columns: median imputation, then standardization. Categorical
/// columns: mode imputation, then one-hot encoding against the closed
/// fit-time vocabulary. The output layout is deterministic: numeric
/// columns in schema order, then indicator groups in schema order with
/// vocabulary order inside each group. Transforming a single record and a
/// one-row table go through the same code path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureTransformer {
    schema: FeatureSchema,
    numeric_imputer: Imputer,
    categorical_imputer: Imputer,
    scaler: StandardScaler,
    encoder: OneHotEncoder,
    feature_names: Vec<String>,
    is_fitted: bool,
}

impl FeatureTransformer {
    pub fn new() -> Self {
        Self {
            schema: FeatureSchema::new(Vec::new(), Vec::new()),
            numeric_imputer: Imputer::new(ImputeStrategy::Median),
            categorical_imputer: Imputer::new(ImputeStrategy::MostFrequent),
            scaler: StandardScaler::new(),
            encoder: OneHotEncoder::new(),
            feature_names: Vec::new(),
            is_fitted: false,
        }
    }

    /// Fit imputers, scaler, and encoder on the cleaned training table
    pub fn fit(&mut self, df: &DataFrame, schema: &FeatureSchema) -> Result<&mut Self> {
        self.schema = schema.clone();

        let df = self.align_dtypes(df)?;

        if !self.schema.numeric.is_empty() {
            self.numeric_imputer.fit(&df, &self.schema.numeric)?;
            let imputed = self.numeric_imputer.transform(&df)?;
            self.scaler.fit(&imputed, &self.schema.numeric)?;
        }

        if !self.schema.categorical.is_empty() {
            self.categorical_imputer.fit(&df, &self.schema.categorical)?;
            let imputed = self.categorical_imputer.transform(&df)?;
            self.encoder.fit(&imputed, &self.schema.categorical)?;
        }

        self.feature_names = self
            .schema
            .numeric
            .iter()
            .cloned()
            .chain(self.encoder.feature_names())
            .collect();

        self.is_fitted = true;
        Ok(self)
    }

    /// Transform a table into the fixed-width matrix
    pub fn transform(&self, df: &DataFrame) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(ScoreError::NotFitted);
        }
        self.check_required_columns(df)?;

        let df = self.align_dtypes(df)?;
        let n_rows = df.height();
        let n_numeric = self.schema.numeric.len();
        let mut matrix = Array2::<f64>::zeros((n_rows, self.output_width()));

        if n_numeric > 0 {
            let scaled = self
                .scaler
                .transform(&self.numeric_imputer.transform(&df)?)?;
            for (j, col_name) in self.schema.numeric.iter().enumerate() {
                let ca = scaled.column(col_name)?.f64()?;
                for (i, value) in ca.into_iter().enumerate() {
                    matrix[[i, j]] = value.unwrap_or(0.0);
                }
            }
        }

        if !self.schema.categorical.is_empty() {
            let imputed = self.categorical_imputer.transform(&df)?;
            let block = self.encoder.encode(&imputed)?;
            for i in 0..n_rows {
                for k in 0..block.ncols() {
                    matrix[[i, n_numeric + k]] = block[[i, k]];
                }
            }
        }

        Ok(matrix)
    }

    /// Transformed feature names in matrix column order
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Width of the transformed matrix
    pub fn output_width(&self) -> usize {
        self.schema.numeric.len() + self.encoder.width()
    }

    /// The schema this transformer was fitted with
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Source-feature groups over the matrix columns, for re-aggregating
    /// one-hot attributions back to their categorical column
    pub fn feature_groups(&self) -> Vec<FeatureGroup> {
        let mut groups = Vec::with_capacity(self.schema.feature_count());
        for (j, name) in self.schema.numeric.iter().enumerate() {
            groups.push(FeatureGroup {
                source: name.clone(),
                start: j,
                len: 1,
            });
        }
        let mut offset = self.schema.numeric.len();
        for (source, len) in self.encoder.group_sizes() {
            groups.push(FeatureGroup {
                source,
                start: offset,
                len,
            });
            offset += len;
        }
        groups
    }

    /// Every schema feature must be present; absences are schema violations
    fn check_required_columns(&self, df: &DataFrame) -> Result<()> {
        let missing: Vec<String> = self
            .schema
            .feature_names()
            .filter(|name| df.column(name).is_err())
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(ScoreError::SchemaViolation(format!(
                "missing required features: {}",
                missing.join(", ")
            )));
        }
        Ok(())
    }

    /// Bring incoming columns onto the schema dtypes: numerics to Float64,
    /// categoricals to text
    fn align_dtypes(&self, df: &DataFrame) -> Result<DataFrame> {
        let mut result = df.clone();
        for col_name in &self.schema.numeric {
            if let Ok(column) = result.column(col_name) {
                if column.dtype() != &DataType::Float64 {
                    let casted = column.cast(&DataType::Float64)?;
                    result = result.with_column(casted)?.clone();
                }
            }
        }
        for col_name in &self.schema.categorical {
            if let Ok(column) = result.column(col_name) {
                if column.dtype() != &DataType::String {
                    let casted = column.cast(&DataType::String)?;
                    result = result.with_column(casted)?.clone();
                }
            }
        }
        Ok(result)
    }
}

impl Default for FeatureTransformer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_schema() -> FeatureSchema {
        FeatureSchema::new(
            vec!["age".to_string(), "amount".to_string()],
            vec!["housing".to_string()],
        )
    }

    fn toy_frame() -> DataFrame {
        df!(
            "age" => &[25.0, 35.0, 45.0, 55.0],
            "amount" => &[1000.0, 2000.0, 3000.0, 4000.0],
            "housing" => &["own", "rent", "own", "free"]
        )
        .unwrap()
    }

    #[test]
    fn test_layout_numeric_then_groups() {
        let mut transformer = FeatureTransformer::new();
        transformer.fit(&toy_frame(), &toy_schema()).unwrap();

        assert_eq!(transformer.output_width(), 5);
        assert_eq!(
            transformer.feature_names(),
            &[
                "age".to_string(),
                "amount".to_string(),
                "housing_own".to_string(),
                "housing_rent".to_string(),
                "housing_free".to_string(),
            ]
        );
    }

    #[test]
    fn test_transform_shape_and_indicators() {
        let mut transformer = FeatureTransformer::new();
        transformer.fit(&toy_frame(), &toy_schema()).unwrap();
        let matrix = transformer.transform(&toy_frame()).unwrap();

        assert_eq!(matrix.shape(), &[4, 5]);
        // Row 1 rents: indicator group is (0, 1, 0)
        assert_eq!(matrix[[1, 2]], 0.0);
        assert_eq!(matrix[[1, 3]], 1.0);
        assert_eq!(matrix[[1, 4]], 0.0);
    }

    #[test]
    fn test_transform_deterministic() {
        let mut transformer = FeatureTransformer::new();
        transformer.fit(&toy_frame(), &toy_schema()).unwrap();

        let a = transformer.transform(&toy_frame()).unwrap();
        let b = transformer.transform(&toy_frame()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_single_row_matches_table_row() {
        let mut transformer = FeatureTransformer::new();
        transformer.fit(&toy_frame(), &toy_schema()).unwrap();

        let table = transformer.transform(&toy_frame()).unwrap();
        let one_row = df!(
            "age" => &[35.0],
            "amount" => &[2000.0],
            "housing" => &["rent"]
        )
        .unwrap();
        let single = transformer.transform(&one_row).unwrap();

        for j in 0..table.ncols() {
            assert_eq!(single[[0, j]], table[[1, j]]);
        }
    }

    #[test]
    fn test_unknown_category_all_zero_group() {
        let mut transformer = FeatureTransformer::new();
        transformer.fit(&toy_frame(), &toy_schema()).unwrap();

        let unseen = df!(
            "age" => &[30.0],
            "amount" => &[1500.0],
            "housing" => &["hotel"]
        )
        .unwrap();
        let matrix = transformer.transform(&unseen).unwrap();

        assert_eq!(matrix[[0, 2]], 0.0);
        assert_eq!(matrix[[0, 3]], 0.0);
        assert_eq!(matrix[[0, 4]], 0.0);
    }

    #[test]
    fn test_missing_feature_is_schema_violation() {
        let mut transformer = FeatureTransformer::new();
        transformer.fit(&toy_frame(), &toy_schema()).unwrap();

        let incomplete = df!("age" => &[30.0]).unwrap();
        assert!(matches!(
            transformer.transform(&incomplete),
            Err(ScoreError::SchemaViolation(_))
        ));
    }

    #[test]
    fn test_missing_numeric_imputed_with_median() {
        let mut transformer = FeatureTransformer::new();
        transformer.fit(&toy_frame(), &toy_schema()).unwrap();

        let with_null = df!(
            "age" => &[Option::<f64>::None],
            "amount" => &[2000.0],
            "housing" => &["own"]
        )
        .unwrap();
        let matrix = transformer.transform(&with_null).unwrap();

        // Median age is 40; standardized it sits on a finite value
        assert!(matrix[[0, 0]].is_finite());
    }

    #[test]
    fn test_feature_groups_cover_all_columns() {
        let mut transformer = FeatureTransformer::new();
        transformer.fit(&toy_frame(), &toy_schema()).unwrap();

        let groups = transformer.feature_groups();
        let total: usize = groups.iter().map(|g| g.len).sum();
        assert_eq!(total, transformer.output_width());
        assert_eq!(groups[0].source, "age");
        assert_eq!(groups[2].source, "housing");
        assert_eq!(groups[2].len, 3);
    }
}
