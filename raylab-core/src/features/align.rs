//! Forecast-covariate alignment.
//!
//! Takes a reshaped forecast table at a fixed lead and folds it into a
//! per-location observation table:
//! 1. shift the forecast index forward by the lead duration, so each value
//!    is keyed by the time it would actually have been available;
//! 2. rename columns with a lead-and-source-qualified prefix;
//! 3. join onto the observation index by exact timestamp — gaps stay NaN,
//!    they are never zero-filled;
//! 4. apply the derived irradiance transforms to the median-quantile column.
//!
//! The observation table's original columns and row count are untouched;
//! only new columns are appended.

use chrono::Duration;
use thiserror::Error;

use crate::domain::{TableError, TimeTable};
use crate::features::transforms::IrradianceTransform;
use crate::job::PredictionJob;

/// Column label of the median quantile, the base of derived features.
pub const BASE_QUANTILE_LABEL: &str = "0.5";

/// Errors from covariate alignment.
#[derive(Debug, Error)]
pub enum AlignError {
    #[error(transparent)]
    Table(#[from] TableError),
}

/// Qualified name for a forecast covariate column:
/// `{prefix}_{lead}h_{source label}`.
pub fn covariate_name(prefix: &str, lead_step: u32, label: &str) -> String {
    format!("{prefix}_{lead_step}h_{label}")
}

/// Merge a scalar-mode forecast table into `input` and derive features.
///
/// `forecast` is indexed by issue-time and is consumed: its index is shifted
/// forward by `lead_step × step_minutes` before the join. Transforms run on
/// the shifted-and-renamed median-quantile column; a missing base column
/// (e.g. 0.5 absent from the archive's quantile set) is an error that
/// propagates to the caller.
pub fn merge_forecast_covariates(
    input: &mut TimeTable,
    mut forecast: TimeTable,
    lead_step: u32,
    step_minutes: i64,
    prefix: &str,
    job: &PredictionJob,
    transforms: &[&dyn IrradianceTransform],
) -> Result<(), AlignError> {
    forecast.shift_index(Duration::minutes(step_minutes * lead_step as i64));
    forecast.rename_columns(|name| covariate_name(prefix, lead_step, name));

    // Exact-timestamp join onto the observation index.
    let positions: Vec<Option<usize>> = {
        let forecast_rows = forecast.index_map();
        input
            .index()
            .iter()
            .map(|ts| forecast_rows.get(ts).copied())
            .collect()
    };
    let names: Vec<String> = forecast
        .column_names()
        .into_iter()
        .map(|n| n.to_string())
        .collect();
    for name in names {
        let source = forecast.float_column(&name)?;
        let mapped: Vec<f64> = positions
            .iter()
            .map(|pos| pos.map(|i| source[i]).unwrap_or(f64::NAN))
            .collect();
        input.push_float_column(name, mapped)?;
    }

    // Derived features from the median-quantile covariate.
    let base_name = covariate_name(prefix, lead_step, BASE_QUANTILE_LABEL);
    for transform in transforms {
        let base = input.float_column(&base_name)?;
        let derived = transform.apply(base, input.index(), job);
        input.push_float_column(format!("{}_{base_name}", transform.name()), derived)?;
    }

    Ok(())
}
