//! Data sources
//!
//! [`DataSource`] is the seam between the pipeline and storage. Implementations:
//! - [`JsonDirSource`]: one JSON document per dataset in a directory
//! - [`InMemorySource`]: tables registered in memory (fixtures, embedding)
//! - [`CachedSource`]: wraps another source with a process-lifetime cache

use crate::dataset::Dataset;
use crate::error::DataError;
use crate::table::Table;
use moka::sync::Cache;
use std::collections::HashMap;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Read-only access to datasets by logical name
///
/// Loads must be idempotent: the same dataset yields the same table for the
/// lifetime of the source.
pub trait DataSource: Debug + Send + Sync {
    /// Load one dataset
    ///
    /// # Errors
    /// Returns a [`DataError`] if the dataset cannot be read or parsed.
    fn load(&self, dataset: Dataset) -> Result<Arc<Table>, DataError>;
}

impl<S: DataSource + ?Sized> DataSource for Arc<S> {
    fn load(&self, dataset: Dataset) -> Result<Arc<Table>, DataError> {
        (**self).load(dataset)
    }
}

/// Directory of `<dataset>.json` documents
#[derive(Debug, Clone)]
pub struct JsonDirSource {
    root: PathBuf,
}

impl JsonDirSource {
    /// Create a source rooted at `root`
    #[inline]
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of a dataset
    #[must_use]
    pub fn path_of(&self, dataset: Dataset) -> PathBuf {
        self.root.join(dataset.file_name())
    }
}

impl DataSource for JsonDirSource {
    fn load(&self, dataset: Dataset) -> Result<Arc<Table>, DataError> {
        let path = self.path_of(dataset);
        if !path.exists() {
            return Err(DataError::NotFound { dataset, path });
        }

        tracing::debug!("Loading dataset {} from {}", dataset, path.display());
        let text =
            std::fs::read_to_string(&path).map_err(|source| DataError::Io { dataset, source })?;
        let table = Table::from_json_str(dataset, &text)?;
        tracing::debug!("Loaded {} rows from {}", table.len(), dataset);

        Ok(Arc::new(table))
    }
}

/// Tables held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    tables: HashMap<Dataset, Arc<Table>>,
}

impl InMemorySource {
    /// Create an empty source
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table under its own dataset label
    #[must_use]
    pub fn with_table(mut self, table: Table) -> Self {
        self.insert(table);
        self
    }

    /// Register or replace a table
    pub fn insert(&mut self, table: Table) {
        self.tables.insert(table.dataset(), Arc::new(table));
    }

    /// Remove a table
    pub fn remove(&mut self, dataset: Dataset) -> Option<Arc<Table>> {
        self.tables.remove(&dataset)
    }
}

impl DataSource for InMemorySource {
    fn load(&self, dataset: Dataset) -> Result<Arc<Table>, DataError> {
        self.tables
            .get(&dataset)
            .cloned()
            .ok_or(DataError::NotRegistered(dataset))
    }
}

/// Caching wrapper
///
/// Successful loads are kept for the lifetime of the cache; failures are not
/// cached so a corrected file is picked up on the next load.
#[derive(Debug, Clone)]
pub struct CachedSource<S> {
    inner: S,
    cache: Cache<Dataset, Arc<Table>>,
}

impl<S: DataSource> CachedSource<S> {
    /// Wrap `inner` with room for every dataset
    #[must_use]
    pub fn new(inner: S) -> Self {
        Self::with_capacity(inner, Dataset::ALL.len() as u64)
    }

    /// Wrap `inner` with a custom capacity
    #[must_use]
    pub fn with_capacity(inner: S, max_capacity: u64) -> Self {
        Self {
            inner,
            cache: Cache::new(max_capacity),
        }
    }

    /// Wrapped source
    #[inline]
    #[must_use]
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Drop every cached table
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }
}

impl<S: DataSource> DataSource for CachedSource<S> {
    fn load(&self, dataset: Dataset) -> Result<Arc<Table>, DataError> {
        if let Some(table) = self.cache.get(&dataset) {
            return Ok(table);
        }
        let table = self.inner.load(dataset)?;
        self.cache.insert(dataset, Arc::clone(&table));
        Ok(table)
    }
}
