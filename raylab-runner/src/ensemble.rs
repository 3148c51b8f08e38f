//! Backtest-ensemble orchestration.
//!
//! A single run of the external train-and-backtest routine is subject to
//! randomness in training and fold assignment. The ensemble runner repeats
//! the call N times over the same input, restricts each run to the
//! evaluation horizon, strips run-identity columns, and medians the runs
//! cell-wise. The median suppresses run-to-run variance while preserving
//! the quantile structure, at the cost of N× compute.
//!
//! Runs are aggregated permissively: the result index is the union of the
//! run indexes, and a cell's median is taken over the runs that have a
//! value there. Runs that disagree on index or columns therefore produce
//! NaN gaps rather than a hard error.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use thiserror::Error;

use raylab_core::domain::{TableError, TimeTable};
use raylab_core::engine::{BacktestEngine, EngineError, METADATA_COLUMNS};
use raylab_core::job::{ModelSpec, PredictionJob};

/// Errors from ensemble orchestration. One failed iteration aborts the
/// whole ensemble; there is no partial-failure recovery.
#[derive(Debug, Error)]
pub enum EnsembleError {
    #[error("ensemble requires at least one iteration")]
    NoIterations,

    #[error("engine returned no horizon tables")]
    EmptyRun,

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Table(#[from] TableError),
}

/// Run the engine `iterations` times and median the filtered outputs.
///
/// Each run is restricted to rows whose `horizon` column equals `horizon`,
/// stripped of [`METADATA_COLUMNS`], and aggregated per (timestamp, column)
/// into the cross-run median. The result's column set equals any single
/// filtered run's column set.
pub fn run_ensemble(
    engine: &dyn BacktestEngine,
    job: &PredictionJob,
    spec: &ModelSpec,
    input: &TimeTable,
    horizon: u32,
    folds: u32,
    iterations: u32,
) -> Result<TimeTable, EnsembleError> {
    if iterations < 1 {
        return Err(EnsembleError::NoIterations);
    }

    let mut runs: Vec<TimeTable> = Vec::with_capacity(iterations as usize);
    for _ in 0..iterations {
        let tables = engine.train_and_forecast(job, spec, input, &[horizon], folds)?;
        let run = tables.into_iter().next().ok_or(EnsembleError::EmptyRun)?;
        runs.push(filter_run(run, horizon)?);
    }

    Ok(median_of_runs(&runs))
}

/// Restrict a run to one horizon and strip its identity columns.
fn filter_run(run: TimeTable, horizon: u32) -> Result<TimeTable, EnsembleError> {
    let horizons = run.float_column("horizon")?.to_vec();
    let mut filtered = run.filter_rows(|i| horizons[i] == horizon as f64);
    filtered.drop_columns(&METADATA_COLUMNS);
    Ok(filtered)
}

/// Cell-wise median across runs, aligned on the union of run indexes.
fn median_of_runs(runs: &[TimeTable]) -> TimeTable {
    let index: Vec<DateTime<Utc>> = runs
        .iter()
        .flat_map(|r| r.index().iter().copied())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let run_maps: Vec<_> = runs.iter().map(|r| r.index_map()).collect();

    let mut result = TimeTable::new(index.clone());
    for name in runs[0].column_names() {
        let values: Vec<f64> = index
            .iter()
            .map(|ts| {
                let mut cell: Vec<f64> = runs
                    .iter()
                    .zip(&run_maps)
                    .filter_map(|(run, map)| {
                        let row = *map.get(ts)?;
                        run.float_column(name).ok().map(|col| col[row])
                    })
                    .filter(|v| !v.is_nan())
                    .collect();
                median(&mut cell)
            })
            .collect();
        // Run column names are unique and lengths match the union index.
        let _ = result.push_float_column(name, values);
    }
    result
}

/// Median of a slice; NaN when empty, mean of the middle two when even.
fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        values[mid]
    } else {
        (values[mid - 1] + values[mid]) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Mutex;

    fn ts(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 6, 1, h, 0, 0).unwrap()
    }

    fn job() -> PredictionJob {
        PredictionJob {
            id: 307,
            name: "backtest".into(),
            lat: 53.445448,
            lon: 5.7226894,
            forecast_type: "demand".into(),
            horizon_minutes: 2880,
            resolution_minutes: 15,
            quantiles: vec![0.5, 0.9],
        }
    }

    fn model_spec() -> ModelSpec {
        ModelSpec {
            model: "xgb".into(),
            quantiles: vec![0.5, 0.9],
            hyper_params: Default::default(),
            feature_names: None,
        }
    }

    fn input() -> TimeTable {
        let mut t = TimeTable::new(vec![ts(0), ts(1)]);
        t.push_float_column("load", vec![1.0, 2.0]).unwrap();
        t
    }

    /// A raw engine output: two horizons interleaved, full metadata.
    fn raw_run(q50: [f64; 2], q90: [f64; 2]) -> TimeTable {
        let mut t = TimeTable::new(vec![ts(0), ts(1), ts(0), ts(1)]);
        t.push_float_column("quantile_P50", vec![q50[0], q50[1], -1.0, -1.0])
            .unwrap();
        t.push_float_column("quantile_P90", vec![q90[0], q90[1], -2.0, -2.0])
            .unwrap();
        t.push_float_column("pid", vec![307.0; 4]).unwrap();
        t.push_text_column("customer", vec!["nl".into(); 4]).unwrap();
        t.push_text_column("description", vec!["".into(); 4]).unwrap();
        t.push_text_column("type", vec!["demand".into(); 4]).unwrap();
        t.push_text_column("algtype", vec!["xgb".into(); 4]).unwrap();
        t.push_float_column("tahead", vec![24.0, 24.0, 48.0, 48.0])
            .unwrap();
        t.push_float_column("horizon", vec![24.0, 24.0, 48.0, 48.0])
            .unwrap();
        t
    }

    /// Engine that replays canned runs, one per call.
    struct CannedEngine {
        runs: Mutex<Vec<TimeTable>>,
    }

    impl CannedEngine {
        fn new(runs: Vec<TimeTable>) -> Self {
            Self {
                runs: Mutex::new(runs),
            }
        }
    }

    impl BacktestEngine for CannedEngine {
        fn name(&self) -> &str {
            "canned"
        }

        fn train_and_forecast(
            &self,
            _job: &PredictionJob,
            _spec: &ModelSpec,
            _input: &TimeTable,
            _training_horizons: &[u32],
            _folds: u32,
        ) -> Result<Vec<TimeTable>, EngineError> {
            let mut runs = self.runs.lock().unwrap();
            if runs.is_empty() {
                return Err(EngineError::Failed {
                    engine: "canned".into(),
                    reason: "out of canned runs".into(),
                });
            }
            Ok(vec![runs.remove(0)])
        }
    }

    #[test]
    fn zero_iterations_is_an_error() {
        let engine = CannedEngine::new(vec![]);
        let err =
            run_ensemble(&engine, &job(), &model_spec(), &input(), 24, 4, 0).unwrap_err();
        assert!(matches!(err, EnsembleError::NoIterations));
    }

    #[test]
    fn single_run_is_returned_verbatim() {
        let engine = CannedEngine::new(vec![raw_run([10.0, 20.0], [15.0, 25.0])]);
        let result =
            run_ensemble(&engine, &job(), &model_spec(), &input(), 24, 4, 1).unwrap();

        // Only the horizon-24 rows survive, metadata is gone.
        assert_eq!(result.len(), 2);
        assert_eq!(result.column_names(), vec!["quantile_P50", "quantile_P90"]);
        assert_eq!(result.float_column("quantile_P50").unwrap(), &[10.0, 20.0]);
        assert_eq!(result.float_column("quantile_P90").unwrap(), &[15.0, 25.0]);
    }

    #[test]
    fn median_of_three_runs() {
        let engine = CannedEngine::new(vec![
            raw_run([1.0, 9.0], [1.0, 1.0]),
            raw_run([2.0, 2.0], [2.0, 2.0]),
            raw_run([3.0, 0.0], [9.0, 3.0]),
        ]);
        let result =
            run_ensemble(&engine, &job(), &model_spec(), &input(), 24, 4, 3).unwrap();

        assert_eq!(result.float_column("quantile_P50").unwrap(), &[2.0, 2.0]);
        assert_eq!(result.float_column("quantile_P90").unwrap(), &[2.0, 2.0]);
    }

    #[test]
    fn metadata_columns_never_reach_the_result() {
        let engine = CannedEngine::new(vec![raw_run([1.0, 2.0], [3.0, 4.0])]);
        let result =
            run_ensemble(&engine, &job(), &model_spec(), &input(), 24, 4, 1).unwrap();
        for dropped in METADATA_COLUMNS {
            assert!(!result.has_column(dropped), "{dropped} leaked into result");
        }
    }

    #[test]
    fn engine_failure_aborts_the_ensemble() {
        // Two canned runs, three iterations requested: the third call fails.
        let engine = CannedEngine::new(vec![
            raw_run([1.0, 1.0], [1.0, 1.0]),
            raw_run([2.0, 2.0], [2.0, 2.0]),
        ]);
        let err =
            run_ensemble(&engine, &job(), &model_spec(), &input(), 24, 4, 3).unwrap_err();
        assert!(matches!(err, EnsembleError::Engine(_)));
    }

    #[test]
    fn index_disagreement_yields_gaps_not_errors() {
        // Second run has an extra timestamp; the first run has no value
        // there, so the median at that cell comes from one run only.
        let run_a = raw_run([10.0, 10.0], [10.0, 10.0]);
        let mut run_b = TimeTable::new(vec![ts(0), ts(1), ts(2)]);
        run_b
            .push_float_column("quantile_P50", vec![20.0, 20.0, 30.0])
            .unwrap();
        run_b
            .push_float_column("quantile_P90", vec![20.0, 20.0, 40.0])
            .unwrap();
        run_b
            .push_float_column("horizon", vec![24.0, 24.0, 24.0])
            .unwrap();

        let engine = CannedEngine::new(vec![run_a, run_b]);
        let result =
            run_ensemble(&engine, &job(), &model_spec(), &input(), 24, 4, 2).unwrap();

        assert_eq!(result.len(), 3);
        let q50 = result.float_column("quantile_P50").unwrap();
        assert_eq!(q50[0], 15.0); // median of {10, 20}
        assert_eq!(q50[2], 30.0); // only run B covers ts(2)
    }

    proptest::proptest! {
        /// The median of any non-empty cell lies within the cell's range,
        /// and for an odd count it is one of the observed values.
        #[test]
        fn median_lies_within_value_range(
            mut values in proptest::collection::vec(-1e6f64..1e6, 1..20)
        ) {
            let odd = values.len() % 2 == 1;
            let m = median(&mut values);
            let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
            let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            proptest::prop_assert!(m >= lo && m <= hi);
            if odd {
                proptest::prop_assert!(values.contains(&m));
            }
        }
    }

    #[test]
    fn missing_horizon_column_propagates() {
        let mut run = TimeTable::new(vec![ts(0)]);
        run.push_float_column("quantile_P50", vec![1.0]).unwrap();
        let engine = CannedEngine::new(vec![run]);
        let err =
            run_ensemble(&engine, &job(), &model_spec(), &input(), 24, 4, 1).unwrap_err();
        assert!(matches!(err, EnsembleError::Table(_)));
    }
}
