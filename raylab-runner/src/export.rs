//! Ensemble artifact export — CSV forecast table plus JSON manifest.
//!
//! One artifact pair per (location, lead):
//! - `backtest_{location}_{lead}.csv` — the median forecast, timestamp
//!   first, one column per retained forecast column, NaN cells left empty
//! - `backtest_{location}_{lead}.json` — run manifest with schema version,
//!   ensemble parameters, dataset hash, and engine name
//!
//! All persisted manifests carry a `schema_version` field; unknown versions
//! are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use raylab_core::domain::TimeTable;

/// Current schema version for persisted manifests.
pub const SCHEMA_VERSION: u32 = 1;

/// Provenance sidecar for one exported ensemble result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub location: String,
    pub nearest_station: String,
    pub lead_step: u32,
    pub horizon: u32,
    pub folds: u32,
    pub iterations: u32,
    pub engine: String,
    pub dataset_hash: String,
    pub rows: usize,
    pub columns: Vec<String>,
    pub created_at: String,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Serialize an ensemble result as CSV.
///
/// NaN gaps become empty fields so downstream tools read them as missing.
pub fn ensemble_to_csv(table: &TimeTable) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    let names = table.column_names();
    let mut header = vec!["timestamp"];
    header.extend(names.iter().copied());
    wtr.write_record(&header)?;

    let columns: Vec<&[f64]> = names
        .iter()
        .map(|n| table.float_column(n))
        .collect::<Result<_, _>>()
        .context("ensemble result contains a non-float column")?;

    for (row, ts) in table.index().iter().enumerate() {
        let mut record = vec![ts.to_rfc3339()];
        for col in &columns {
            let v = col[row];
            record.push(if v.is_nan() {
                String::new()
            } else {
                format!("{v:.6}")
            });
        }
        wtr.write_record(&record)?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// File stem for one artifact pair: `backtest_{location}_{lead}`.
pub fn artifact_stem(location: &str, lead_step: u32) -> String {
    format!("backtest_{location}_{lead_step}")
}

/// Save the CSV and manifest for one ensemble result.
///
/// Returns the path of the written CSV.
pub fn save_artifacts(
    table: &TimeTable,
    manifest: &RunManifest,
    output_dir: &Path,
) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output dir: {}", output_dir.display()))?;

    let stem = artifact_stem(&manifest.location, manifest.lead_step);

    let csv_path = output_dir.join(format!("{stem}.csv"));
    let csv = ensemble_to_csv(table)?;
    std::fs::write(&csv_path, &csv)
        .with_context(|| format!("failed to write {}", csv_path.display()))?;

    let manifest_path = output_dir.join(format!("{stem}.json"));
    let json = serde_json::to_string_pretty(manifest).context("manifest serialization")?;
    std::fs::write(&manifest_path, &json)
        .with_context(|| format!("failed to write {}", manifest_path.display()))?;

    Ok(csv_path)
}

/// Load a manifest, rejecting unknown schema versions.
pub fn load_manifest(path: &Path) -> Result<RunManifest> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let manifest: RunManifest =
        serde_json::from_str(&json).context("failed to deserialize RunManifest")?;
    if manifest.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            manifest.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(manifest)
}
