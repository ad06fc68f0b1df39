//! Delimited table loading

use crate::error::{Result, ScoreError};
use polars::prelude::*;
use std::fs::File;

use super::DatasetConfig;

/// Loader for delimited tabular files.
///
/// Handles both header-carrying files and headerless layouts where the
/// column names come from the dataset configuration (the German credit
/// file has no header row).
pub struct TableLoader {
    separator: u8,
    has_header: bool,
    column_names: Option<Vec<String>>,
    infer_schema_length: usize,
}

impl TableLoader {
    /// Create a loader from a dataset configuration
    pub fn from_config(config: &DatasetConfig) -> Self {
        Self {
            separator: config.separator,
            has_header: config.has_header,
            column_names: config.column_names.clone(),
            infer_schema_length: 100,
        }
    }

    /// Set the number of rows used for dtype inference
    pub fn with_infer_schema_length(mut self, n: usize) -> Self {
        self.infer_schema_length = n;
        self
    }

    /// Load a delimited file into a DataFrame.
    ///
    /// An unreadable or empty file is a [`ScoreError::DataLoad`].
    pub fn load(&self, path: &str) -> Result<DataFrame> {
        let file =
            File::open(path).map_err(|e| ScoreError::DataLoad(format!("{}: {}", path, e)))?;

        let parse_opts = CsvParseOptions::default().with_separator(self.separator);

        let reader = CsvReadOptions::default()
            .with_has_header(self.has_header)
            .with_infer_schema_length(Some(self.infer_schema_length))
            .with_parse_options(parse_opts)
            .into_reader_with_file_handle(file);

        let mut df = reader
            .finish()
            .map_err(|e| ScoreError::DataLoad(format!("{}: {}", path, e)))?;

        if df.height() == 0 {
            return Err(ScoreError::DataLoad(format!("{}: empty table", path)));
        }

        if let Some(names) = &self.column_names {
            if names.len() != df.width() {
                return Err(ScoreError::DataLoad(format!(
                    "{}: expected {} columns, found {}",
                    path,
                    names.len(),
                    df.width()
                )));
            }
            df.set_column_names(names.iter().map(|s| s.as_str()))
                .map_err(|e| ScoreError::DataLoad(e.to_string()))?;
        }

        Ok(df)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_with_header() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "age,income").unwrap();
        writeln!(file, "34,50000").unwrap();
        writeln!(file, "45,62000").unwrap();

        let cfg = DatasetConfig::adult_income();
        let loader = TableLoader::from_config(&cfg);
        let df = loader.load(file.path().to_str().unwrap()).unwrap();

        assert_eq!(df.height(), 2);
        assert_eq!(df.width(), 2);
    }

    #[test]
    fn test_load_headerless_with_names() {
        let mut file = NamedTempFile::new().unwrap();
        // Two whitespace-delimited columns, names supplied by config
        writeln!(file, "A11 6").unwrap();
        writeln!(file, "A14 24").unwrap();

        let loader = TableLoader {
            separator: b' ',
            has_header: false,
            column_names: Some(vec!["status".to_string(), "duration".to_string()]),
            infer_schema_length: 100,
        };
        let df = loader.load(file.path().to_str().unwrap()).unwrap();

        assert_eq!(df.height(), 2);
        assert!(df.column("status").is_ok());
        assert!(df.column("duration").is_ok());
    }

    #[test]
    fn test_load_missing_file() {
        let cfg = DatasetConfig::german_credit();
        let loader = TableLoader::from_config(&cfg);
        let result = loader.load("/nonexistent/german.data");
        assert!(matches!(result, Err(ScoreError::DataLoad(_))));
    }

    #[test]
    fn test_load_empty_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "a,b").unwrap();

        let cfg = DatasetConfig::adult_income();
        let loader = TableLoader::from_config(&cfg);
        let result = loader.load(file.path().to_str().unwrap());
        assert!(matches!(result, Err(ScoreError::DataLoad(_))));
    }
}
