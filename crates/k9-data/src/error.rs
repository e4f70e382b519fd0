//! Error types for dataset access
//!
//! Two families of failures:
//! - Loading failures (missing file, I/O, malformed JSON)
//! - Contract failures (a dataset lacks a column the consumer requires)
//!
//! Both are fatal for the consumer that raised them. Optional enrichment
//! columns are checked with [`crate::Table::has_column`] instead and never
//! produce an error.

use crate::dataset::Dataset;
use std::path::PathBuf;

/// Dataset access error
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    /// Backing file does not exist
    #[error("dataset {dataset} not found at {}", path.display())]
    NotFound {
        /// Logical dataset
        dataset: Dataset,
        /// Expected location
        path: PathBuf,
    },

    /// Dataset is not registered in an in-memory source
    #[error("dataset {0} not registered")]
    NotRegistered(Dataset),

    /// I/O failure while reading a dataset
    #[error("failed to read dataset {dataset}: {source}")]
    Io {
        /// Logical dataset
        dataset: Dataset,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The file is not a valid table document
    #[error("failed to parse dataset {dataset}: {source}")]
    Parse {
        /// Logical dataset
        dataset: Dataset,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },

    /// A split-layout row does not match the declared column count
    #[error("dataset {dataset}: row {row} has {found} cells, expected {expected}")]
    RowShape {
        /// Logical dataset
        dataset: Dataset,
        /// Zero-based row index
        row: usize,
        /// Declared column count
        expected: usize,
        /// Actual cell count
        found: usize,
    },

    /// Required columns are absent
    #[error("dataset {dataset} missing columns: {missing:?}")]
    MissingColumns {
        /// Logical dataset
        dataset: Dataset,
        /// Sorted list of missing column names
        missing: Vec<String>,
    },
}

impl DataError {
    /// Whether the error is a violation of the column contract rather than a
    /// loading failure
    #[inline]
    #[must_use]
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::MissingColumns { .. } | Self::RowShape { .. })
    }

    /// Dataset the error refers to
    #[must_use]
    pub fn dataset(&self) -> Dataset {
        match self {
            Self::NotFound { dataset, .. }
            | Self::Io { dataset, .. }
            | Self::Parse { dataset, .. }
            | Self::RowShape { dataset, .. }
            | Self::MissingColumns { dataset, .. } => *dataset,
            Self::NotRegistered(dataset) => *dataset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_columns_display() {
        let err = DataError::MissingColumns {
            dataset: Dataset::ProactiveWeekly,
            missing: vec!["rank_proactivo".to_string()],
        };
        let text = err.to_string();
        assert!(text.contains("stde_proactivo_semanal_v4_4"));
        assert!(text.contains("rank_proactivo"));
        assert!(err.is_contract_violation());
    }

    #[test]
    fn not_found_is_not_contract_violation() {
        let err = DataError::NotFound {
            dataset: Dataset::Trajectories,
            path: PathBuf::from("/tmp/x.json"),
        };
        assert!(!err.is_contract_violation());
        assert_eq!(err.dataset(), Dataset::Trajectories);
    }
}
