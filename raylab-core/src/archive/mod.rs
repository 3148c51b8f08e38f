//! The probabilistic irradiance forecast archive.
//!
//! A dense 4-dimensional array with explicit dimension metadata:
//! station × issue-time × lead-step × quantile. The archive is loaded once,
//! shared read-only, and queried through typed selectors — a missing station
//! or lead-step is an error, never an empty slice.

pub mod reshape;
pub mod store;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

pub use reshape::{reshape_all_leads, reshape_at_lead, ExpandedTable};
pub use store::{ArchiveMeta, ArchiveStore};

/// Errors from archive construction, selection, and storage.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("station '{0}' not present in archive")]
    StationNotFound(String),

    #[error("lead step {0} not present in archive")]
    LeadStepNotFound(u32),

    #[error("dimension/value shape mismatch: expected {expected} values, got {got}")]
    ShapeMismatch { expected: usize, got: usize },

    #[error("archive validation failed: {0}")]
    Validation(String),

    #[error("parquet I/O error: {0}")]
    Parquet(String),

    #[error("store error: {0}")]
    Store(String),
}

/// Dense 4-key forecast archive.
///
/// Values are stored station-major, then issue-time, lead-step, quantile.
/// Cells with no archived forecast hold NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastArchive {
    stations: Vec<String>,
    issue_times: Vec<DateTime<Utc>>,
    lead_steps: Vec<u32>,
    quantiles: Vec<f64>,
    step_minutes: i64,
    values: Vec<f64>,
}

impl ForecastArchive {
    /// Build an archive from dimension labels and a dense value buffer.
    ///
    /// `values.len()` must equal the product of the four dimension sizes.
    pub fn new(
        stations: Vec<String>,
        issue_times: Vec<DateTime<Utc>>,
        lead_steps: Vec<u32>,
        quantiles: Vec<f64>,
        step_minutes: i64,
        values: Vec<f64>,
    ) -> Result<Self, ArchiveError> {
        let expected = stations.len() * issue_times.len() * lead_steps.len() * quantiles.len();
        if values.len() != expected {
            return Err(ArchiveError::ShapeMismatch {
                expected,
                got: values.len(),
            });
        }
        Ok(Self {
            stations,
            issue_times,
            lead_steps,
            quantiles,
            step_minutes,
            values,
        })
    }

    pub fn stations(&self) -> &[String] {
        &self.stations
    }

    pub fn issue_times(&self) -> &[DateTime<Utc>] {
        &self.issue_times
    }

    pub fn lead_steps(&self) -> &[u32] {
        &self.lead_steps
    }

    pub fn quantiles(&self) -> &[f64] {
        &self.quantiles
    }

    /// Length of one lead interval in minutes.
    pub fn step_minutes(&self) -> i64 {
        self.step_minutes
    }

    /// Position of a station along the station dimension.
    pub fn station_index(&self, station: &str) -> Result<usize, ArchiveError> {
        self.stations
            .iter()
            .position(|s| s == station)
            .ok_or_else(|| ArchiveError::StationNotFound(station.to_string()))
    }

    /// Position of a lead step along the lead dimension.
    pub fn lead_index(&self, lead_step: u32) -> Result<usize, ArchiveError> {
        self.lead_steps
            .iter()
            .position(|l| *l == lead_step)
            .ok_or(ArchiveError::LeadStepNotFound(lead_step))
    }

    /// The time offset of a lead step: `lead_step × step_minutes`.
    pub fn lead_offset(&self, lead_step: u32) -> Duration {
        Duration::minutes(self.step_minutes * lead_step as i64)
    }

    /// Cell value by dimension positions.
    pub fn value(&self, si: usize, ti: usize, li: usize, qi: usize) -> f64 {
        debug_assert!(si < self.stations.len());
        debug_assert!(ti < self.issue_times.len());
        debug_assert!(li < self.lead_steps.len());
        debug_assert!(qi < self.quantiles.len());
        let idx = ((si * self.issue_times.len() + ti) * self.lead_steps.len() + li)
            * self.quantiles.len()
            + qi;
        self.values[idx]
    }

    /// Column label for a quantile level, e.g. `0.05` → `"0.05"`.
    pub fn quantile_label(q: f64) -> String {
        format!("{q}")
    }
}
