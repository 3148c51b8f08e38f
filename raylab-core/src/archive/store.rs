//! Parquet-backed archive store.
//!
//! The archive is persisted in long format — one row per
//! (station, issue-time, lead-step, quantile) cell — and densified on load.
//! Layout: `{path}.parquet` plus a `{path}.meta.json` sidecar carrying the
//! interval length and dimension summary.
//!
//! Writes are atomic: write to .tmp, rename into place. Loads validate the
//! schema (expected columns, non-empty) before densifying.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::{ArchiveError, ForecastArchive};

const EXPECTED_COLUMNS: [&str; 5] =
    ["station", "issue_time", "lead_step", "quantile", "irradiance"];

/// Metadata sidecar for a persisted archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveMeta {
    pub stations: Vec<String>,
    pub issue_time_count: usize,
    pub lead_steps: Vec<u32>,
    pub quantile_count: usize,
    pub step_minutes: i64,
    pub cell_count: usize,
}

/// A long-format Parquet archive on disk.
pub struct ArchiveStore {
    path: PathBuf,
}

impl ArchiveStore {
    /// `path` is the Parquet file itself; the sidecar lives next to it.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn meta_path(&self) -> PathBuf {
        self.path.with_extension("meta.json")
    }

    /// Persist an archive, replacing any previous contents atomically.
    pub fn write(&self, archive: &ForecastArchive) -> Result<(), ArchiveError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ArchiveError::Store(format!("failed to create dir: {e}")))?;
        }

        let df = archive_to_dataframe(archive)?;
        let tmp_path = self.path.with_extension("parquet.tmp");
        write_parquet(&df, &tmp_path)?;
        fs::rename(&tmp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            ArchiveError::Store(format!("atomic rename failed: {e}"))
        })?;

        let meta = ArchiveMeta {
            stations: archive.stations().to_vec(),
            issue_time_count: archive.issue_times().len(),
            lead_steps: archive.lead_steps().to_vec(),
            quantile_count: archive.quantiles().len(),
            step_minutes: archive.step_minutes(),
            cell_count: df.height(),
        };
        let meta_json = serde_json::to_string_pretty(&meta)
            .map_err(|e| ArchiveError::Store(format!("meta serialization: {e}")))?;
        fs::write(self.meta_path(), meta_json)
            .map_err(|e| ArchiveError::Store(format!("meta write: {e}")))?;

        Ok(())
    }

    /// Load and densify the archive.
    pub fn load(&self) -> Result<ForecastArchive, ArchiveError> {
        let meta = self.load_meta()?;

        let file = fs::File::open(&self.path)
            .map_err(|e| ArchiveError::Parquet(format!("open {}: {e}", self.path.display())))?;
        let df = ParquetReader::new(file)
            .finish()
            .map_err(|e| ArchiveError::Parquet(format!("read: {e}")))?;

        if df.height() == 0 {
            return Err(ArchiveError::Validation("empty archive file".into()));
        }
        for col_name in &EXPECTED_COLUMNS {
            if df.column(col_name).is_err() {
                return Err(ArchiveError::Validation(format!(
                    "missing column '{col_name}'"
                )));
            }
        }

        dataframe_to_archive(&df, meta.step_minutes)
    }

    /// Read the metadata sidecar without touching the Parquet file.
    pub fn load_meta(&self) -> Result<ArchiveMeta, ArchiveError> {
        let content = fs::read_to_string(self.meta_path())
            .map_err(|e| ArchiveError::Store(format!("meta read: {e}")))?;
        serde_json::from_str(&content)
            .map_err(|e| ArchiveError::Store(format!("meta parse: {e}")))
    }
}

// ── Parquet I/O helpers ─────────────────────────────────────────────

/// Flatten a dense archive into a long-format DataFrame.
fn archive_to_dataframe(archive: &ForecastArchive) -> Result<DataFrame, ArchiveError> {
    let n = archive.stations().len()
        * archive.issue_times().len()
        * archive.lead_steps().len()
        * archive.quantiles().len();

    let mut stations: Vec<String> = Vec::with_capacity(n);
    let mut issue_ms: Vec<i64> = Vec::with_capacity(n);
    let mut leads: Vec<u32> = Vec::with_capacity(n);
    let mut quantiles: Vec<f64> = Vec::with_capacity(n);
    let mut irradiance: Vec<f64> = Vec::with_capacity(n);

    for (si, station) in archive.stations().iter().enumerate() {
        for (ti, issue) in archive.issue_times().iter().enumerate() {
            for (li, lead) in archive.lead_steps().iter().enumerate() {
                for (qi, q) in archive.quantiles().iter().enumerate() {
                    stations.push(station.clone());
                    issue_ms.push(issue.timestamp_millis());
                    leads.push(*lead);
                    quantiles.push(*q);
                    irradiance.push(archive.value(si, ti, li, qi));
                }
            }
        }
    }

    DataFrame::new(vec![
        Column::new("station".into(), stations),
        Column::new("issue_time".into(), issue_ms)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
            .map_err(|e| ArchiveError::Parquet(format!("issue_time cast: {e}")))?,
        Column::new("lead_step".into(), leads),
        Column::new("quantile".into(), quantiles),
        Column::new("irradiance".into(), irradiance),
    ])
    .map_err(|e| ArchiveError::Parquet(format!("dataframe creation: {e}")))
}

fn write_parquet(df: &DataFrame, path: &Path) -> Result<(), ArchiveError> {
    let file = fs::File::create(path)
        .map_err(|e| ArchiveError::Parquet(format!("create file: {e}")))?;
    ParquetWriter::new(file)
        .finish(&mut df.clone())
        .map_err(|e| ArchiveError::Parquet(format!("write parquet: {e}")))?;
    Ok(())
}

/// Densify a long-format DataFrame back into a `ForecastArchive`.
///
/// Dimension labels are the sorted distinct values of each key column;
/// cells absent from the file stay NaN.
fn dataframe_to_archive(df: &DataFrame, step_minutes: i64) -> Result<ForecastArchive, ArchiveError> {
    let col_err = |e: PolarsError| ArchiveError::Parquet(format!("column read: {e}"));

    let station_ca = df
        .column("station")
        .map_err(col_err)?
        .str()
        .map_err(|e| ArchiveError::Parquet(format!("station column type: {e}")))?;
    let issue_ca = df
        .column("issue_time")
        .map_err(col_err)?
        .datetime()
        .map_err(|e| ArchiveError::Parquet(format!("issue_time column type: {e}")))?;
    let lead_ca = df
        .column("lead_step")
        .map_err(col_err)?
        .u32()
        .map_err(|e| ArchiveError::Parquet(format!("lead_step column type: {e}")))?;
    let quantile_ca = df
        .column("quantile")
        .map_err(col_err)?
        .f64()
        .map_err(|e| ArchiveError::Parquet(format!("quantile column type: {e}")))?;
    let irradiance_ca = df
        .column("irradiance")
        .map_err(col_err)?
        .f64()
        .map_err(|e| ArchiveError::Parquet(format!("irradiance column type: {e}")))?;

    let n = df.height();

    // First pass: distinct dimension labels, sorted.
    let mut stations = BTreeSet::new();
    let mut issue_times = BTreeSet::new();
    let mut lead_steps = BTreeSet::new();
    let mut quantiles = BTreeSet::new();
    for i in 0..n {
        let station = station_ca
            .get(i)
            .ok_or_else(|| ArchiveError::Validation(format!("null station at row {i}")))?;
        let issue = issue_ms_to_utc(issue_ca.get(i), i)?;
        let lead = lead_ca
            .get(i)
            .ok_or_else(|| ArchiveError::Validation(format!("null lead_step at row {i}")))?;
        let q = quantile_ca
            .get(i)
            .ok_or_else(|| ArchiveError::Validation(format!("null quantile at row {i}")))?;
        stations.insert(station.to_string());
        issue_times.insert(issue);
        lead_steps.insert(lead);
        // f64 is not Ord; quantile levels are finite fractions, so order by bits.
        quantiles.insert(q.to_bits());
    }

    let stations: Vec<String> = stations.into_iter().collect();
    let issue_times: Vec<DateTime<Utc>> = issue_times.into_iter().collect();
    let lead_steps: Vec<u32> = lead_steps.into_iter().collect();
    let quantiles: Vec<f64> = quantiles.into_iter().map(f64::from_bits).collect();

    // Second pass: fill the dense buffer. Every key was collected in the
    // first pass, so the lookups cannot miss.
    let station_pos: HashMap<&str, usize> = stations
        .iter()
        .enumerate()
        .map(|(i, s)| (s.as_str(), i))
        .collect();
    let issue_pos: HashMap<DateTime<Utc>, usize> = issue_times
        .iter()
        .enumerate()
        .map(|(i, t)| (*t, i))
        .collect();
    let lead_pos: HashMap<u32, usize> = lead_steps
        .iter()
        .enumerate()
        .map(|(i, l)| (*l, i))
        .collect();
    let quantile_pos: HashMap<u64, usize> = quantiles
        .iter()
        .enumerate()
        .map(|(i, q)| (q.to_bits(), i))
        .collect();

    let cell_count = stations.len() * issue_times.len() * lead_steps.len() * quantiles.len();
    let mut values = vec![f64::NAN; cell_count];
    for i in 0..n {
        let bad_row = || ArchiveError::Validation(format!("inconsistent key at row {i}"));
        let station = station_ca.get(i).ok_or_else(bad_row)?;
        let issue = issue_ms_to_utc(issue_ca.get(i), i)?;
        let lead = lead_ca.get(i).ok_or_else(bad_row)?;
        let q = quantile_ca.get(i).ok_or_else(bad_row)?;

        let si = *station_pos.get(station).ok_or_else(bad_row)?;
        let ti = *issue_pos.get(&issue).ok_or_else(bad_row)?;
        let li = *lead_pos.get(&lead).ok_or_else(bad_row)?;
        let qi = *quantile_pos.get(&q.to_bits()).ok_or_else(bad_row)?;

        let idx = ((si * issue_times.len() + ti) * lead_steps.len() + li) * quantiles.len() + qi;
        values[idx] = irradiance_ca.get(i).unwrap_or(f64::NAN);
    }

    ForecastArchive::new(
        stations,
        issue_times,
        lead_steps,
        quantiles,
        step_minutes,
        values,
    )
}

fn issue_ms_to_utc(ms: Option<i64>, row: usize) -> Result<DateTime<Utc>, ArchiveError> {
    let ms =
        ms.ok_or_else(|| ArchiveError::Validation(format!("null issue_time at row {row}")))?;
    DateTime::<Utc>::from_timestamp_millis(ms)
        .ok_or_else(|| ArchiveError::Validation(format!("out-of-range issue_time at row {row}")))
}
