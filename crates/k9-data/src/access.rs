//! Typed accessors over a [`DataSource`]

use crate::dataset::{columns, Dataset};
use crate::error::DataError;
use crate::source::DataSource;
use crate::table::Table;
use std::sync::Arc;

/// Read-only accessors used by the pipeline nodes
#[derive(Debug, Clone)]
pub struct DataAccess {
    source: Arc<dyn DataSource>,
}

impl DataAccess {
    /// Wrap a source
    #[inline]
    #[must_use]
    pub fn new(source: Arc<dyn DataSource>) -> Self {
        Self { source }
    }

    /// Weekly risk trajectories
    ///
    /// # Errors
    /// Propagates load failures.
    pub fn trajectories(&self) -> Result<Arc<Table>, DataError> {
        self.source.load(Dataset::Trajectories)
    }

    /// Weekly internal signals
    ///
    /// # Errors
    /// Propagates load failures.
    pub fn weekly_signals(&self) -> Result<Arc<Table>, DataError> {
        self.source.load(Dataset::WeeklySignals)
    }

    /// Baseline and high-frequency observations in one table
    ///
    /// # Errors
    /// Propagates load failures of either part.
    pub fn observations_all(&self) -> Result<Table, DataError> {
        let baseline = self.source.load(Dataset::ObservationsBaseline)?;
        let stde = self.source.load(Dataset::ObservationsHighFrequency)?;
        Ok(Table::concat(Dataset::ObservationsBaseline, &[&baseline, &stde]))
    }

    /// Independent proactive model output, with its column contract enforced
    ///
    /// # Errors
    /// Returns [`DataError::MissingColumns`] if any of the four required
    /// columns is absent.
    pub fn proactive_weekly(&self) -> Result<Arc<Table>, DataError> {
        let table = self.source.load(Dataset::ProactiveWeekly)?;
        table.require_columns(&columns::PROACTIVE_REQUIRED)?;
        Ok(table)
    }

    /// Load every dataset and report its shape
    #[must_use]
    pub fn check_all(&self) -> Vec<DatasetCheck> {
        Dataset::ALL
            .iter()
            .map(|&dataset| {
                let loaded = match dataset {
                    Dataset::ProactiveWeekly => self.proactive_weekly(),
                    other => self.source.load(other),
                };
                match loaded {
                    Ok(table) => DatasetCheck {
                        dataset,
                        rows: table.len(),
                        columns: table.columns().count(),
                        error: None,
                    },
                    Err(e) => DatasetCheck {
                        dataset,
                        rows: 0,
                        columns: 0,
                        error: Some(e.to_string()),
                    },
                }
            })
            .collect()
    }
}

/// Outcome of loading one dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetCheck {
    /// Dataset checked
    pub dataset: Dataset,
    /// Row count
    pub rows: usize,
    /// Column count
    pub columns: usize,
    /// Error text, if loading failed
    pub error: Option<String>,
}

impl DatasetCheck {
    /// Whether the dataset loaded cleanly
    #[inline]
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::InMemorySource;

    fn access(source: InMemorySource) -> DataAccess {
        DataAccess::new(Arc::new(source))
    }

    #[test]
    fn proactive_contract_enforced() {
        let source = InMemorySource::new().with_table(Table::new(
            Dataset::ProactiveWeekly,
            ["semana_id", "riesgo_id", "score_proactivo"],
        ));
        let err = access(source).proactive_weekly().unwrap_err();
        assert!(err.is_contract_violation());
    }

    #[test]
    fn observations_are_unified() {
        let source = InMemorySource::new()
            .with_table(Table::new(
                Dataset::ObservationsBaseline,
                ["semana", "tipo_observacion", "riesgo_id"],
            ))
            .with_table(Table::new(
                Dataset::ObservationsHighFrequency,
                ["semana", "tipo_observacion"],
            ));
        let all = access(source).observations_all().unwrap();
        assert!(all.has_column("riesgo_id"));
        assert!(all.is_empty());
    }

    #[test]
    fn check_all_reports_each_dataset() {
        let source = InMemorySource::new().with_table(Table::new(Dataset::Trajectories, ["semana"]));
        let report = access(source).check_all();
        assert_eq!(report.len(), Dataset::ALL.len());
        assert!(report[0].is_ok());
        assert!(report.iter().skip(1).all(|c| !c.is_ok()));
    }
}
