//! Time-indexed tables with named columns.
//!
//! `TimeTable` is the exchange format between the reshaper, the covariate
//! aligner, and the ensemble runner: a shared UTC timestamp index with
//! columns in insertion order. Float columns use NaN for absent values
//! (exact-timestamp joins leave gaps, they never zero-fill).

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from table construction and column access.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("column '{0}' not found")]
    ColumnNotFound(String),

    #[error("column '{0}' is not a float column")]
    NotFloat(String),

    #[error("column '{name}' has {got} values, table has {expected} rows")]
    LengthMismatch {
        name: String,
        got: usize,
        expected: usize,
    },

    #[error("column '{0}' already exists")]
    DuplicateColumn(String),
}

/// Values held by one column. Forecast and covariate columns are floats;
/// run-identity tags from the backtest engine are text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnData {
    Float(Vec<f64>),
    Text(Vec<String>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Float(v) => v.len(),
            ColumnData::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A named column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

/// A table of named columns over a shared UTC timestamp index.
///
/// Column order is insertion order and is preserved by every operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimeTable {
    index: Vec<DateTime<Utc>>,
    columns: Vec<Column>,
}

impl TimeTable {
    /// Create an empty table over the given timestamp index.
    pub fn new(index: Vec<DateTime<Utc>>) -> Self {
        Self {
            index,
            columns: Vec::new(),
        }
    }

    pub fn index(&self) -> &[DateTime<Utc>] {
        &self.index
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Column names in insertion order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Append a float column. The length must match the index.
    pub fn push_float_column(
        &mut self,
        name: impl Into<String>,
        values: Vec<f64>,
    ) -> Result<(), TableError> {
        let name = name.into();
        self.check_new_column(&name, values.len())?;
        self.columns.push(Column {
            name,
            data: ColumnData::Float(values),
        });
        Ok(())
    }

    /// Append a text column. The length must match the index.
    pub fn push_text_column(
        &mut self,
        name: impl Into<String>,
        values: Vec<String>,
    ) -> Result<(), TableError> {
        let name = name.into();
        self.check_new_column(&name, values.len())?;
        self.columns.push(Column {
            name,
            data: ColumnData::Text(values),
        });
        Ok(())
    }

    fn check_new_column(&self, name: &str, len: usize) -> Result<(), TableError> {
        if self.has_column(name) {
            return Err(TableError::DuplicateColumn(name.to_string()));
        }
        if len != self.index.len() {
            return Err(TableError::LengthMismatch {
                name: name.to_string(),
                got: len,
                expected: self.index.len(),
            });
        }
        Ok(())
    }

    /// Borrow a float column's values.
    pub fn float_column(&self, name: &str) -> Result<&[f64], TableError> {
        match self.column(name) {
            None => Err(TableError::ColumnNotFound(name.to_string())),
            Some(col) => match &col.data {
                ColumnData::Float(v) => Ok(v),
                ColumnData::Text(_) => Err(TableError::NotFloat(name.to_string())),
            },
        }
    }

    /// Remove the named columns. Names not present are ignored.
    pub fn drop_columns(&mut self, names: &[&str]) {
        self.columns.retain(|c| !names.contains(&c.name.as_str()));
    }

    /// Relabel every timestamp by adding `offset`.
    pub fn shift_index(&mut self, offset: Duration) {
        for ts in &mut self.index {
            *ts += offset;
        }
    }

    /// Rename every column through `f`.
    pub fn rename_columns(&mut self, f: impl Fn(&str) -> String) {
        for col in &mut self.columns {
            col.name = f(&col.name);
        }
    }

    /// Exact-match position of a timestamp in the index.
    pub fn position(&self, ts: DateTime<Utc>) -> Option<usize> {
        self.index.iter().position(|t| *t == ts)
    }

    /// Timestamp → row lookup map for exact-match joins.
    pub fn index_map(&self) -> HashMap<DateTime<Utc>, usize> {
        self.index
            .iter()
            .enumerate()
            .map(|(i, ts)| (*ts, i))
            .collect()
    }

    /// New table containing only the rows where `keep(row)` is true.
    /// Column order is preserved.
    pub fn filter_rows(&self, keep: impl Fn(usize) -> bool) -> TimeTable {
        let rows: Vec<usize> = (0..self.len()).filter(|i| keep(*i)).collect();
        let index = rows.iter().map(|&i| self.index[i]).collect();
        let columns = self
            .columns
            .iter()
            .map(|c| Column {
                name: c.name.clone(),
                data: match &c.data {
                    ColumnData::Float(v) => {
                        ColumnData::Float(rows.iter().map(|&i| v[i]).collect())
                    }
                    ColumnData::Text(v) => {
                        ColumnData::Text(rows.iter().map(|&i| v[i].clone()).collect())
                    }
                },
            })
            .collect();
        TimeTable { index, columns }
    }
}
