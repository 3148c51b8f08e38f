//! Irradiance transform seam.
//!
//! The solar-geometry computations (DNI, GTI) live in the external feature
//! engineering library; this trait abstracts them so the aligner can apply
//! any transform to a forecast series. The built-in implementation is a
//! fixed-ratio placeholder used by the CLI and tests until the physical
//! transforms are wired in.

use chrono::{DateTime, Utc};

use crate::job::PredictionJob;

/// A derived-feature computation over one irradiance series.
///
/// `apply` must return one value per input sample; the aligner appends the
/// result as a new column named `{name}_{source column}`.
pub trait IrradianceTransform {
    /// Short tag used as the derived column prefix, e.g. "dni" or "gti".
    fn name(&self) -> &str;

    fn apply(&self, series: &[f64], index: &[DateTime<Utc>], job: &PredictionJob) -> Vec<f64>;
}

/// Fixed-ratio placeholder transform.
#[derive(Debug, Clone)]
pub struct ScaledIrradiance {
    name: String,
    ratio: f64,
}

impl ScaledIrradiance {
    pub fn new(name: impl Into<String>, ratio: f64) -> Self {
        Self {
            name: name.into(),
            ratio,
        }
    }

    /// Direct-normal placeholder.
    pub fn dni() -> Self {
        Self::new("dni", 0.85)
    }

    /// Global-tilted placeholder.
    pub fn gti() -> Self {
        Self::new("gti", 1.1)
    }
}

impl IrradianceTransform for ScaledIrradiance {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, series: &[f64], _index: &[DateTime<Utc>], _job: &PredictionJob) -> Vec<f64> {
        series.iter().map(|v| v * self.ratio).collect()
    }
}
