//! K9 Data - read-only datasets for the safety pipeline
//!
//! Exposes the five logical datasets the pipeline consumes (risk
//! trajectories, weekly signals, two observation tables and the independent
//! proactive model output) as column-addressed [`Table`]s behind the
//! [`DataSource`] trait.
//!
//! # Example
//!
//! ```rust,ignore
//! use k9_data::{CachedSource, DataAccess, JsonDirSource};
//! use std::sync::Arc;
//!
//! let source = CachedSource::new(JsonDirSource::new("data/synthetic"));
//! let data = DataAccess::new(Arc::new(source));
//! let proactive = data.proactive_weekly()?;
//! ```

pub mod access;
pub mod dataset;
pub mod error;
pub mod source;
pub mod table;

pub use access::{DataAccess, DatasetCheck};
pub use dataset::{columns, Dataset};
pub use error::DataError;
pub use source::{CachedSource, DataSource, InMemorySource, JsonDirSource};
pub use table::{Row, Table};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
