//! Serializable backtest configuration.
//!
//! One TOML file drives a whole run: the job template, the ensemble
//! parameters, data locations, and the target locations. The job template
//! is consumed as two typed views — [`PredictionJob`] per location and one
//! shared [`ModelSpec`] — built from the same fields, with the duplicated
//! quantile set kept explicit.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use raylab_core::job::{ModelSpec, PredictionJob};

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration for a backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub job: JobSection,
    pub backtest: BacktestSection,
    pub data: DataSection,
    pub locations: Vec<LocationSection>,
}

/// Job template shared by every location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSection {
    pub id: u32,
    pub name: String,
    #[serde(default = "default_forecast_type")]
    pub forecast_type: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_horizon_minutes")]
    pub horizon_minutes: u32,
    #[serde(default = "default_resolution_minutes")]
    pub resolution_minutes: u32,
    #[serde(default = "default_quantiles")]
    pub quantiles: Vec<f64>,
    #[serde(default)]
    pub hyper_params: BTreeMap<String, f64>,
}

/// Ensemble parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestSection {
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    #[serde(default = "default_horizon")]
    pub horizon: u32,
    #[serde(default = "default_folds")]
    pub folds: u32,
    /// Lead steps to backtest, in archive intervals.
    pub leads: Vec<u32>,
}

/// Where the input data lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSection {
    /// Parquet forecast archive.
    pub archive: PathBuf,
    /// Station reference CSV (station, lat, lon).
    pub stations: PathBuf,
    /// Directory of per-location observation CSVs, `{name}.csv`.
    pub observations_dir: PathBuf,
    /// Prefix for forecast covariate columns.
    #[serde(default = "default_covariate_prefix")]
    pub covariate_prefix: String,
}

/// One target location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationSection {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

fn default_forecast_type() -> String {
    "demand".into()
}

fn default_model() -> String {
    "xgb".into()
}

fn default_horizon_minutes() -> u32 {
    2880
}

fn default_resolution_minutes() -> u32 {
    15
}

fn default_quantiles() -> Vec<f64> {
    vec![0.05, 0.10, 0.20, 0.30, 0.40, 0.50, 0.60, 0.70, 0.80, 0.90, 0.95]
}

fn default_iterations() -> u32 {
    10
}

fn default_horizon() -> u32 {
    24
}

fn default_folds() -> u32 {
    4
}

fn default_covariate_prefix() -> String {
    "raycast".into()
}

impl BacktestConfig {
    /// Parse a TOML string and validate it.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: BacktestConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backtest.iterations < 1 {
            return Err(ConfigError::Invalid(
                "backtest.iterations must be at least 1".into(),
            ));
        }
        if self.backtest.folds < 1 {
            return Err(ConfigError::Invalid(
                "backtest.folds must be at least 1".into(),
            ));
        }
        if self.backtest.leads.is_empty() {
            return Err(ConfigError::Invalid("backtest.leads must not be empty".into()));
        }
        if self.locations.is_empty() {
            return Err(ConfigError::Invalid("at least one location is required".into()));
        }
        if self.job.quantiles.is_empty() {
            return Err(ConfigError::Invalid("job.quantiles must not be empty".into()));
        }
        for q in &self.job.quantiles {
            if *q <= 0.0 || *q >= 1.0 {
                return Err(ConfigError::Invalid(format!(
                    "quantile {q} outside the open interval (0, 1)"
                )));
            }
        }
        if self.job.resolution_minutes == 0 {
            return Err(ConfigError::Invalid(
                "job.resolution_minutes must be positive".into(),
            ));
        }
        Ok(())
    }

    /// The prediction-job view of the template, pinned to one location.
    pub fn prediction_job(&self, location: &LocationSection) -> PredictionJob {
        PredictionJob {
            id: self.job.id,
            name: self.job.name.clone(),
            lat: location.lat,
            lon: location.lon,
            forecast_type: self.job.forecast_type.clone(),
            horizon_minutes: self.job.horizon_minutes,
            resolution_minutes: self.job.resolution_minutes,
            quantiles: self.job.quantiles.clone(),
        }
    }

    /// The model-spec view of the template.
    pub fn model_spec(&self) -> ModelSpec {
        ModelSpec {
            model: self.job.model.clone(),
            quantiles: self.job.quantiles.clone(),
            hyper_params: self.job.hyper_params.clone(),
            feature_names: None,
        }
    }
}
