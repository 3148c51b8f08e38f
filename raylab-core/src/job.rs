//! Job and model specifications.
//!
//! The external backtest routine takes two typed views of the same run
//! parameters: the prediction job (what to forecast, where, at which
//! quantiles) and the model specification (which model, with which
//! hyper-parameters). Both are built from shared configuration fields; the
//! overlap in the quantile set is deliberate and kept explicit.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Parameters of one forecasting job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionJob {
    pub id: u32,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    /// Forecast target kind, e.g. "demand".
    pub forecast_type: String,
    /// How far into the future the model forecasts, in minutes.
    pub horizon_minutes: u32,
    /// Forecast timestep in minutes.
    pub resolution_minutes: u32,
    /// Quantile levels the model must produce, each in (0, 1).
    pub quantiles: Vec<f64>,
}

/// Parameters of the model behind a prediction job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Model identifier understood by the engine, e.g. "xgb".
    pub model: String,
    pub quantiles: Vec<f64>,
    pub hyper_params: BTreeMap<String, f64>,
    /// Restrict training to these input columns; None trains on all.
    pub feature_names: Option<Vec<String>>,
}
