//! Backtest runner — wires together locator, reshaper, aligner, and ensemble.
//!
//! For every configured lead step and location:
//! 1. find the nearest reference station to the location,
//! 2. slice the forecast archive at that station and lead,
//! 3. shift, rename, and merge the forecast covariates into the location's
//!    observation table, deriving the irradiance features,
//! 4. run the backtest ensemble and collect its median result.
//!
//! No error is caught or retried here: any failure aborts the whole run
//! rather than skipping the (location, lead) pair.

use chrono::Utc;
use thiserror::Error;

use raylab_core::archive::{reshape_at_lead, ArchiveError, ArchiveStore, ForecastArchive};
use raylab_core::domain::TimeTable;
use raylab_core::engine::BacktestEngine;
use raylab_core::features::{
    merge_forecast_covariates, AlignError, IrradianceTransform, ScaledIrradiance,
};
use raylab_core::locator::{self, LocateError};

use crate::config::{BacktestConfig, ConfigError};
use crate::data_loader::{dataset_hash, load_observations, load_stations, LoadError};
use crate::ensemble::{run_ensemble, EnsembleError};
use crate::export::{RunManifest, SCHEMA_VERSION};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("data error: {0}")]
    Load(#[from] LoadError),

    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("station lookup error: {0}")]
    Locate(#[from] LocateError),

    #[error("alignment error: {0}")]
    Align(#[from] AlignError),

    #[error("ensemble error: {0}")]
    Ensemble(#[from] EnsembleError),
}

/// One (location, lead) ensemble result with its provenance manifest.
#[derive(Debug)]
pub struct EnsembleArtifact {
    pub result: TimeTable,
    pub manifest: RunManifest,
}

/// Run the full backtest grid: every configured lead × location.
///
/// Results come back in iteration order (lead-major); writing them out is
/// the caller's concern.
pub fn run_all(
    config: &BacktestConfig,
    engine: &dyn BacktestEngine,
) -> Result<Vec<EnsembleArtifact>, RunError> {
    config.validate()?;

    let archive = ArchiveStore::new(&config.data.archive).load()?;
    let stations = load_stations(&config.data.stations)?;
    let spec = config.model_spec();

    let dni = ScaledIrradiance::dni();
    let gti = ScaledIrradiance::gti();
    let transforms: [&dyn IrradianceTransform; 2] = [&dni, &gti];

    let mut artifacts = Vec::new();
    for lead in &config.backtest.leads {
        for location in &config.locations {
            let artifact = run_one(
                config, engine, &archive, &stations, &spec, *lead, location, &transforms,
            )?;
            artifacts.push(artifact);
        }
    }
    Ok(artifacts)
}

#[allow(clippy::too_many_arguments)]
fn run_one(
    config: &BacktestConfig,
    engine: &dyn BacktestEngine,
    archive: &ForecastArchive,
    stations: &[raylab_core::domain::Station],
    spec: &raylab_core::job::ModelSpec,
    lead: u32,
    location: &crate::config::LocationSection,
    transforms: &[&dyn IrradianceTransform],
) -> Result<EnsembleArtifact, RunError> {
    let station = locator::nearest(location.lat, location.lon, stations)?;
    let forecast = reshape_at_lead(archive, &station.station, lead)?;

    let obs_path = config
        .data
        .observations_dir
        .join(format!("{}.csv", location.name));
    let mut input = load_observations(&obs_path)?;
    let input_hash = dataset_hash(&input);

    let job = config.prediction_job(location);
    merge_forecast_covariates(
        &mut input,
        forecast,
        lead,
        archive.step_minutes(),
        &config.data.covariate_prefix,
        &job,
        transforms,
    )?;

    let result = run_ensemble(
        engine,
        &job,
        spec,
        &input,
        config.backtest.horizon,
        config.backtest.folds,
        config.backtest.iterations,
    )?;

    let manifest = RunManifest {
        schema_version: SCHEMA_VERSION,
        location: location.name.clone(),
        nearest_station: station.station.clone(),
        lead_step: lead,
        horizon: config.backtest.horizon,
        folds: config.backtest.folds,
        iterations: config.backtest.iterations,
        engine: engine.name().to_string(),
        dataset_hash: input_hash,
        rows: result.len(),
        columns: result.column_names().iter().map(|s| s.to_string()).collect(),
        created_at: Utc::now().to_rfc3339(),
    };

    Ok(EnsembleArtifact { result, manifest })
}
