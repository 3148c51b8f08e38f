//! The train-and-backtest engine seam.
//!
//! The model-training and cross-validation pipeline is an external
//! collaborator. This trait abstracts it so the ensemble runner can repeat
//! it, and tests can mock it. Engines return per-horizon forecast tables
//! whose columns mix quantile forecasts with run-identity metadata; the
//! metadata column names are fixed here so downstream aggregation can strip
//! them.

use thiserror::Error;

use crate::domain::TimeTable;
use crate::job::{ModelSpec, PredictionJob};

/// Columns that carry run identity rather than forecast signal.
///
/// These must be dropped before runs are aggregated; they never appear in
/// an ensemble result.
pub const METADATA_COLUMNS: [&str; 7] = [
    "pid",
    "customer",
    "description",
    "type",
    "algtype",
    "tahead",
    "horizon",
];

/// Errors from the external engine. No local recovery: one failed call
/// aborts the whole ensemble.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("backtest engine '{engine}' failed: {reason}")]
    Failed { engine: String, reason: String },
}

/// An external train-and-backtest routine.
///
/// One call trains the model on `input` (internally cross-validated over
/// `folds` folds) and returns one forecast table per requested training
/// horizon. Each table is indexed by forecast timestamp and carries one
/// column per quantile in the model spec plus the [`METADATA_COLUMNS`].
/// Calls are independent: repeated invocations over the same input may
/// differ through training randomness, which is exactly what the ensemble
/// runner exploits.
pub trait BacktestEngine {
    /// Human-readable engine name, recorded in run manifests.
    fn name(&self) -> &str;

    fn train_and_forecast(
        &self,
        job: &PredictionJob,
        spec: &ModelSpec,
        input: &TimeTable,
        training_horizons: &[u32],
        folds: u32,
    ) -> Result<Vec<TimeTable>, EngineError>;
}
