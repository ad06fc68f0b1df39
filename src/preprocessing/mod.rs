//! Preprocessing module
//!
//! Provides the fit-once feature schema and the fitted transformer that
//! turns cleaned tables into fixed-width numeric matrices:
//! - Missing value imputation (median / most frequent)
//! - Standard scaling of numeric columns
//! - One-hot encoding against a closed fit-time vocabulary

mod encoder;
mod imputer;
mod scaler;
mod transformer;

pub use encoder::OneHotEncoder;
pub use imputer::{ImputeStrategy, Imputer};
pub use scaler::StandardScaler;
pub use transformer::{FeatureGroup, FeatureTransformer};

use serde::{Deserialize, Serialize};

/// Column data type in the fitted schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Numeric,
    Categorical,
}

/// Ordered partition of feature columns into numeric and categorical sets.
///
/// Inferred exactly once from training data and frozen into the artifact,
/// so inference always uses the training-time partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub numeric: Vec<String>,
    pub categorical: Vec<String>,
}

impl FeatureSchema {
    pub fn new(numeric: Vec<String>, categorical: Vec<String>) -> Self {
        Self {
            numeric,
            categorical,
        }
    }

    /// Total number of raw feature columns
    pub fn feature_count(&self) -> usize {
        self.numeric.len() + self.categorical.len()
    }

    /// All feature names, numeric first, both in schema order
    pub fn feature_names(&self) -> impl Iterator<Item = &String> {
        self.numeric.iter().chain(self.categorical.iter())
    }

    /// Look up the declared type of a feature
    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        if self.numeric.iter().any(|c| c == name) {
            Some(ColumnType::Numeric)
        } else if self.categorical.iter().any(|c| c == name) {
            Some(ColumnType::Categorical)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_lookup() {
        let schema = FeatureSchema::new(
            vec!["age".to_string()],
            vec!["housing".to_string()],
        );
        assert_eq!(schema.feature_count(), 2);
        assert_eq!(schema.column_type("age"), Some(ColumnType::Numeric));
        assert_eq!(schema.column_type("housing"), Some(ColumnType::Categorical));
        assert_eq!(schema.column_type("unknown"), None);
    }

    #[test]
    fn test_schema_serializes() {
        let schema = FeatureSchema::new(vec!["a".to_string()], vec!["b".to_string()]);
        let json = serde_json::to_string(&schema).unwrap();
        let back: FeatureSchema = serde_json::from_str(&json).unwrap();
        assert_eq!(schema, back);
    }
}
