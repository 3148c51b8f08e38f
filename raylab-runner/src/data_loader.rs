//! Station and observation loading for the runner.
//!
//! Two CSV inputs, both loaded once per run:
//! - the station reference table (station, lat, lon);
//! - one observation table per location — first column RFC 3339 timestamps,
//!   remaining columns float covariates, empty cells → NaN.
//!
//! A BLAKE3 hash over the loaded observation table is recorded in the run
//! manifest so results can be traced back to their exact input.

use std::path::Path;

use chrono::{DateTime, Utc};
use thiserror::Error;

use raylab_core::domain::{Station, TimeTable};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid timestamp '{value}' at row {row}")]
    Timestamp { value: String, row: usize },

    #[error("invalid number '{value}' in column '{column}' at row {row}")]
    Number {
        value: String,
        column: String,
        row: usize,
    },

    #[error("observation table {path} is empty")]
    Empty { path: String },

    #[error("observation table {path} has no header")]
    NoHeader { path: String },
}

/// Load the station reference table.
pub fn load_stations(path: &Path) -> Result<Vec<Station>, LoadError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| LoadError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let mut stations = Vec::new();
    for record in reader.deserialize() {
        let station: Station = record?;
        stations.push(station);
    }
    Ok(stations)
}

/// Load a per-location observation table.
///
/// The first column holds the timestamp of each row; every other column is
/// parsed as `f64`, with empty cells becoming NaN gaps.
pub fn load_observations(path: &Path) -> Result<TimeTable, LoadError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| LoadError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.to_string())
        .collect();
    if headers.len() < 2 {
        return Err(LoadError::NoHeader {
            path: path.display().to_string(),
        });
    }
    let column_names = &headers[1..];

    let mut index: Vec<DateTime<Utc>> = Vec::new();
    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); column_names.len()];

    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let raw_ts = record.get(0).unwrap_or_default();
        let ts = raw_ts
            .parse::<DateTime<Utc>>()
            .map_err(|_| LoadError::Timestamp {
                value: raw_ts.to_string(),
                row,
            })?;
        index.push(ts);

        for (ci, values) in columns.iter_mut().enumerate() {
            let cell = record.get(ci + 1).unwrap_or_default().trim();
            if cell.is_empty() {
                values.push(f64::NAN);
                continue;
            }
            let parsed = cell.parse::<f64>().map_err(|_| LoadError::Number {
                value: cell.to_string(),
                column: column_names[ci].clone(),
                row,
            })?;
            values.push(parsed);
        }
    }

    if index.is_empty() {
        return Err(LoadError::Empty {
            path: path.display().to_string(),
        });
    }

    let mut table = TimeTable::new(index);
    for (name, values) in column_names.iter().zip(columns) {
        table
            .push_float_column(name.clone(), values)
            .map_err(|e| LoadError::Io {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
    }
    Ok(table)
}

/// Deterministic BLAKE3 hash over a table's index and float columns.
///
/// Columns are hashed in their (deterministic) insertion order, so two
/// identical tables always hash the same.
pub fn dataset_hash(table: &TimeTable) -> String {
    let mut hasher = blake3::Hasher::new();
    for ts in table.index() {
        hasher.update(&ts.timestamp_millis().to_le_bytes());
    }
    for name in table.column_names() {
        hasher.update(name.as_bytes());
        if let Ok(values) = table.float_column(name) {
            for v in values {
                hasher.update(&v.to_le_bytes());
            }
        }
    }
    hasher.finalize().to_hex().to_string()
}
