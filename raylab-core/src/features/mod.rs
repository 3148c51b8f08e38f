//! Covariate alignment and derived irradiance features.

pub mod align;
pub mod transforms;

pub use align::{covariate_name, merge_forecast_covariates, AlignError, BASE_QUANTILE_LABEL};
pub use transforms::{IrradianceTransform, ScaledIrradiance};
