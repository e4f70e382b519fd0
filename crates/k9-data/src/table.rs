//! Column-addressed tables of JSON cells
//!
//! A [`Table`] keeps an ordered column set and rows aligned with it. Two
//! on-disk layouts are accepted:
//! - an array of records: `[{"semana": 1, "riesgo_id": "R01"}, ...]`
//! - the pandas split layout: `{"columns": [...], "data": [[...], ...]}`
//!
//! Cells are read leniently through [`Row`] accessors. A `null` cell and a
//! missing cell are the same thing.

use crate::dataset::Dataset;
use crate::error::DataError;
use indexmap::IndexSet;
use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Deserialize)]
#[serde(untagged)]
enum TableDocument {
    Split {
        columns: Vec<String>,
        data: Vec<Vec<Value>>,
    },
    Records(Vec<Map<String, Value>>),
}

/// Read-only table
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    dataset: Dataset,
    columns: IndexSet<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Create an empty table with a declared column set
    #[must_use]
    pub fn new<I, S>(dataset: Dataset, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            dataset,
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Build from records; the column set is the union of record keys in
    /// order of first appearance
    #[must_use]
    pub fn from_records(dataset: Dataset, records: Vec<Map<String, Value>>) -> Self {
        let mut columns = IndexSet::new();
        for record in &records {
            for key in record.keys() {
                if !columns.contains(key.as_str()) {
                    columns.insert(key.clone());
                }
            }
        }

        let rows = records
            .into_iter()
            .map(|mut record| {
                columns
                    .iter()
                    .map(|c| record.remove(c).unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        Self {
            dataset,
            columns,
            rows,
        }
    }

    /// Build from the split layout
    ///
    /// # Errors
    /// Returns [`DataError::RowShape`] if a row does not match the column count.
    pub fn from_split(
        dataset: Dataset,
        columns: Vec<String>,
        data: Vec<Vec<Value>>,
    ) -> Result<Self, DataError> {
        let mut table = Self::new(dataset, columns);
        for (idx, row) in data.into_iter().enumerate() {
            if row.len() != table.columns.len() {
                return Err(DataError::RowShape {
                    dataset,
                    row: idx,
                    expected: table.columns.len(),
                    found: row.len(),
                });
            }
            table.rows.push(row);
        }
        Ok(table)
    }

    /// Parse a JSON document in either layout
    ///
    /// # Errors
    /// Returns [`DataError::Parse`] for malformed JSON and
    /// [`DataError::RowShape`] for ragged split rows.
    pub fn from_json_str(dataset: Dataset, text: &str) -> Result<Self, DataError> {
        let doc: TableDocument =
            serde_json::from_str(text).map_err(|source| DataError::Parse { dataset, source })?;
        match doc {
            TableDocument::Split { columns, data } => Self::from_split(dataset, columns, data),
            TableDocument::Records(records) => Ok(Self::from_records(dataset, records)),
        }
    }

    /// Append a record, adding unseen columns
    pub fn push_record(&mut self, mut record: Map<String, Value>) {
        for key in record.keys() {
            if !self.columns.contains(key.as_str()) {
                self.columns.insert(key.clone());
                for row in &mut self.rows {
                    row.push(Value::Null);
                }
            }
        }
        let row = self
            .columns
            .iter()
            .map(|c| record.remove(c).unwrap_or(Value::Null))
            .collect();
        self.rows.push(row);
    }

    /// Concatenate tables under a new dataset label; the column set is the
    /// union and cells absent in a part are null
    #[must_use]
    pub fn concat(dataset: Dataset, parts: &[&Table]) -> Self {
        let mut columns: IndexSet<String> = IndexSet::new();
        for part in parts {
            for c in &part.columns {
                if !columns.contains(c.as_str()) {
                    columns.insert(c.clone());
                }
            }
        }

        let mut rows = Vec::with_capacity(parts.iter().map(|p| p.len()).sum());
        for part in parts {
            for row in part.rows() {
                rows.push(
                    columns
                        .iter()
                        .map(|c| row.get(c).cloned().unwrap_or(Value::Null))
                        .collect(),
                );
            }
        }

        Self {
            dataset,
            columns,
            rows,
        }
    }

    /// Logical dataset
    #[inline]
    #[must_use]
    pub fn dataset(&self) -> Dataset {
        self.dataset
    }

    /// Column names in order
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }

    /// Whether a column is present
    #[inline]
    #[must_use]
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains(column)
    }

    /// Columns from `required` that are absent, in the given order
    #[must_use]
    pub fn missing_columns(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|c| !self.has_column(c))
            .map(|c| (*c).to_string())
            .collect()
    }

    /// Fail unless every column in `required` is present
    ///
    /// # Errors
    /// Returns [`DataError::MissingColumns`] listing the absent columns, sorted.
    pub fn require_columns(&self, required: &[&str]) -> Result<(), DataError> {
        let mut missing = self.missing_columns(required);
        if missing.is_empty() {
            return Ok(());
        }
        missing.sort();
        Err(DataError::MissingColumns {
            dataset: self.dataset,
            missing,
        })
    }

    /// Number of rows
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate rows
    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(move |cells| Row {
            columns: &self.columns,
            cells,
        })
    }
}

/// Borrowed view of one row
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    columns: &'a IndexSet<String>,
    cells: &'a [Value],
}

impl<'a> Row<'a> {
    /// Raw cell; `None` for missing or null cells
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&'a Value> {
        let idx = self.columns.get_index_of(column)?;
        self.cells.get(idx).filter(|v| !v.is_null())
    }

    /// Cell as text; numbers are rendered, empty strings are absent
    #[must_use]
    pub fn str(&self, column: &str) -> Option<String> {
        match self.get(column)? {
            Value::String(s) if s.trim().is_empty() => None,
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Cell as a float; accepts numbers and numeric strings
    #[must_use]
    pub fn f64(&self, column: &str) -> Option<f64> {
        match self.get(column)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
        .filter(|v| v.is_finite())
    }

    /// Cell as an integer; floats are accepted only when whole and within
    /// `i64` range, anything else reads as absent
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn i64(&self, column: &str) -> Option<i64> {
        match self.get(column)? {
            Value::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite() && f.fract() == 0.0)
                    .filter(|f| *f >= i64::MIN as f64 && *f < i64::MAX as f64)
                    .map(|f| f as i64)
            }),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Cell as a boolean; accepts `true/false`, `0/1` and common spellings
    #[must_use]
    pub fn bool(&self, column: &str) -> Option<bool> {
        match self.get(column)? {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_f64().map(|f| f != 0.0),
            Value::String(s) => match s.trim().to_lowercase().as_str() {
                "true" | "1" | "si" | "sí" | "yes" => Some(true),
                "false" | "0" | "no" | "" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}
