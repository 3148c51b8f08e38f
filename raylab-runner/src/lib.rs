//! RayLab Runner — configuration, data loading, ensemble orchestration,
//! and artifact export.
//!
//! This crate builds on `raylab-core` to provide:
//! - TOML-backed run configuration with the job/model-spec views
//! - Station and observation CSV loading with dataset hashing
//! - The backtest-ensemble runner (repeat, filter, strip, median)
//! - The built-in persistence baseline engine
//! - CSV + manifest artifact export

pub mod baseline;
pub mod config;
pub mod data_loader;
pub mod ensemble;
pub mod export;
pub mod runner;

pub use baseline::BaselineEngine;
pub use config::{BacktestConfig, ConfigError};
pub use data_loader::{dataset_hash, load_observations, load_stations, LoadError};
pub use ensemble::{run_ensemble, EnsembleError};
pub use export::{
    ensemble_to_csv, load_manifest, save_artifacts, RunManifest, SCHEMA_VERSION,
};
pub use runner::{run_all, EnsembleArtifact, RunError};
