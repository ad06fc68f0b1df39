//! Fixed per-dataset cleaning configuration

use serde::{Deserialize, Serialize};

/// Configuration describing one dataset variant.
///
/// Everything here is a fixed design decision for the variant (drop list,
/// sentinel token, target mapping), never inferred from data. The cleaner
/// consumes this to produce a clean table and a [`crate::preprocessing::FeatureSchema`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Variant name, for logs and artifact metadata
    pub name: String,

    /// Field separator in the raw file
    pub separator: u8,

    /// Whether the raw file carries a header row
    pub has_header: bool,

    /// Column names for headerless files, in file order
    pub column_names: Option<Vec<String>>,

    /// Columns dropped by design convention (identifiers, redundant columns)
    pub drop_columns: Vec<String>,

    /// Literal token that stands for "missing" in the raw file
    pub missing_sentinel: Option<String>,

    /// Columns treated as categories even when their values look numeric
    pub categorical_columns: Vec<String>,

    /// Name of the binary target column
    pub target_column: String,

    /// Raw target value (textual form) -> normalized label.
    /// 0 = negative/favorable, 1 = positive/adverse.
    pub target_mapping: Vec<(String, u8)>,
}

impl DatasetConfig {
    /// UCI German credit dataset: whitespace-delimited, no header,
    /// 20 attributes plus the `Risk` target (1 = good -> 0, 2 = bad -> 1).
    pub fn german_credit() -> Self {
        let column_names = [
            "Status_of_checking_account",
            "Duration_in_month",
            "Credit_history",
            "Purpose",
            "Credit_amount",
            "Savings_account_bonds",
            "Present_employment_since",
            "Installment_rate_in_percentage_of_disposable_income",
            "Personal_status_and_sex",
            "Other_debtors_guarantors",
            "Present_residence_since",
            "Property",
            "Age_in_years",
            "Other_installment_plans",
            "Housing",
            "Number_of_existing_credits_at_this_bank",
            "Job",
            "Number_of_people_being_liable_to_provide_maintenance_for",
            "Telephone",
            "foreign_worker",
            "Risk",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let categorical_columns = [
            "Status_of_checking_account",
            "Credit_history",
            "Purpose",
            "Savings_account_bonds",
            "Present_employment_since",
            "Personal_status_and_sex",
            "Other_debtors_guarantors",
            "Property",
            "Other_installment_plans",
            "Housing",
            "Job",
            "Telephone",
            "foreign_worker",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        Self {
            name: "german_credit".to_string(),
            separator: b' ',
            has_header: false,
            column_names: Some(column_names),
            drop_columns: Vec::new(),
            missing_sentinel: None,
            categorical_columns,
            target_column: "Risk".to_string(),
            target_mapping: vec![("1".to_string(), 0), ("2".to_string(), 1)],
        }
    }

    /// UCI Adult income dataset: comma-delimited with header, `?` as the
    /// missing sentinel. `fnlwgt` (survey weight) and `education`
    /// (redundant with `education_num`) are dropped by convention.
    pub fn adult_income() -> Self {
        let categorical_columns = [
            "workclass",
            "marital_status",
            "occupation",
            "relationship",
            "race",
            "sex",
            "native_country",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        Self {
            name: "adult_income".to_string(),
            separator: b',',
            has_header: true,
            column_names: None,
            drop_columns: vec!["fnlwgt".to_string(), "education".to_string()],
            missing_sentinel: Some("?".to_string()),
            categorical_columns,
            target_column: "income".to_string(),
            // The test partition suffixes labels with a period.
            target_mapping: vec![
                ("<=50K".to_string(), 0),
                (">50K".to_string(), 1),
                ("<=50K.".to_string(), 0),
                (">50K.".to_string(), 1),
            ],
        }
    }

    /// Whether a column is forced categorical by this configuration
    pub fn is_categorical(&self, column: &str) -> bool {
        self.categorical_columns.iter().any(|c| c == column)
    }
}
