//! Built-in persistence baseline engine.
//!
//! The production train-and-backtest pipeline is an external collaborator.
//! This engine is a tagged stand-in so the runner and CLI work end-to-end
//! without it: a persistence forecast of the first input column with a
//! quantile spread, plus seeded per-call jitter so repeated iterations
//! actually differ and the ensemble median has something to suppress.
//!
//! Results from this engine are baseline diagnostics, not model forecasts.

use std::sync::atomic::{AtomicU64, Ordering};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use raylab_core::domain::{TableError, TimeTable};
use raylab_core::engine::{BacktestEngine, EngineError};
use raylab_core::job::{ModelSpec, PredictionJob};

/// Persistence forecaster with quantile spread and per-call jitter.
#[derive(Debug)]
pub struct BaselineEngine {
    seed: u64,
    calls: AtomicU64,
}

impl BaselineEngine {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            calls: AtomicU64::new(0),
        }
    }

    /// Deterministic per-call RNG: same seed and call order → same runs.
    fn call_rng(&self) -> StdRng {
        let call = self.calls.fetch_add(1, Ordering::Relaxed);
        let digest = blake3::hash(format!("baseline-{}-{call}", self.seed).as_bytes());
        StdRng::from_seed(*digest.as_bytes())
    }

    /// Column name for a quantile level, e.g. 0.05 → `quantile_P05`.
    fn quantile_column(q: f64) -> String {
        format!("quantile_P{:02.0}", q * 100.0)
    }
}

impl BacktestEngine for BaselineEngine {
    fn name(&self) -> &str {
        "persistence-baseline"
    }

    fn train_and_forecast(
        &self,
        job: &PredictionJob,
        spec: &ModelSpec,
        input: &TimeTable,
        training_horizons: &[u32],
        _folds: u32,
    ) -> Result<Vec<TimeTable>, EngineError> {
        let to_engine_err = |e: TableError| EngineError::Failed {
            engine: "persistence-baseline".into(),
            reason: e.to_string(),
        };

        let target_name = input
            .column_names()
            .first()
            .map(|n| n.to_string())
            .ok_or_else(|| EngineError::Failed {
                engine: "persistence-baseline".into(),
                reason: "input table has no columns".into(),
            })?;
        let target = input.float_column(&target_name).map_err(to_engine_err)?;

        let mut rng = self.call_rng();
        let mut tables = Vec::with_capacity(training_horizons.len());

        for horizon in training_horizons {
            let n = input.len();
            let mut table = TimeTable::new(input.index().to_vec());

            // Persistence base with jitter, one column per quantile.
            let jitter: Vec<f64> = (0..n).map(|_| rng.gen_range(-0.05..0.05)).collect();
            for q in &spec.quantiles {
                let values: Vec<f64> = target
                    .iter()
                    .zip(&jitter)
                    .map(|(base, j)| {
                        if base.is_nan() {
                            f64::NAN
                        } else {
                            let spread = 0.2 * base.abs() + 1.0;
                            base + (q - 0.5) * spread + j * spread
                        }
                    })
                    .collect();
                table
                    .push_float_column(Self::quantile_column(*q), values)
                    .map_err(to_engine_err)?;
            }

            // Run-identity metadata, stripped again downstream.
            table
                .push_float_column("pid", vec![job.id as f64; n])
                .map_err(to_engine_err)?;
            table
                .push_text_column("customer", vec![job.name.clone(); n])
                .map_err(to_engine_err)?;
            table
                .push_text_column("description", vec![String::new(); n])
                .map_err(to_engine_err)?;
            table
                .push_text_column("type", vec![job.forecast_type.clone(); n])
                .map_err(to_engine_err)?;
            table
                .push_text_column("algtype", vec![self.name().to_string(); n])
                .map_err(to_engine_err)?;
            table
                .push_float_column("tahead", vec![*horizon as f64; n])
                .map_err(to_engine_err)?;
            table
                .push_float_column("horizon", vec![*horizon as f64; n])
                .map_err(to_engine_err)?;

            tables.push(table);
        }

        Ok(tables)
    }
}
