//! End-to-end runner test: archive store → locator → reshape → align →
//! ensemble → artifacts, using the built-in baseline engine.

use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Duration, TimeZone, Utc};

use raylab_core::archive::{ArchiveStore, ForecastArchive};
use raylab_core::engine::METADATA_COLUMNS;
use raylab_runner::{
    load_manifest, run_all, save_artifacts, BacktestConfig, BaselineEngine, RunError,
};

fn ts(min: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 6, 1, 0, 0, 0).unwrap() + Duration::minutes(min)
}

/// One station, forecasts every 15 minutes for two hours, three quantiles,
/// two lead steps.
fn write_archive(path: &Path) {
    let issue_times: Vec<DateTime<Utc>> = (0..8).map(|i| ts(i * 15)).collect();
    let lead_steps = vec![1u32, 3];
    let quantiles = vec![0.1, 0.5, 0.9];
    let cells = issue_times.len() * lead_steps.len() * quantiles.len();
    let values: Vec<f64> = (0..cells).map(|i| 200.0 + i as f64).collect();

    let archive = ForecastArchive::new(
        vec!["06235".into()],
        issue_times,
        lead_steps,
        quantiles,
        15,
        values,
    )
    .unwrap();
    ArchiveStore::new(path).write(&archive).unwrap();
}

fn write_file(path: &Path, content: &str) {
    let mut f = std::fs::File::create(path).unwrap();
    f.write_all(content.as_bytes()).unwrap();
}

fn observations_csv() -> String {
    let mut csv = String::from("timestamp,load\n");
    for i in 0..12 {
        csv.push_str(&format!("{},{:.1}\n", ts(i * 15).to_rfc3339(), 5.0 + i as f64));
    }
    csv
}

fn setup_config(dir: &Path) -> BacktestConfig {
    write_archive(&dir.join("raycast.parquet"));
    write_file(
        &dir.join("knmi_stations.csv"),
        "station,lat,lon\n06235,52.928,4.781\n06260,52.1,5.18\n",
    );
    let obs_dir = dir.join("observations");
    std::fs::create_dir_all(&obs_dir).unwrap();
    write_file(&obs_dir.join("sun_heavy.csv"), &observations_csv());

    let toml = format!(
        r#"
        [job]
        id = 307
        name = "integration"
        quantiles = [0.1, 0.5, 0.9]

        [backtest]
        iterations = 3
        horizon = 24
        folds = 2
        leads = [1, 3]

        [data]
        archive = "{}"
        stations = "{}"
        observations_dir = "{}"

        [[locations]]
        name = "sun_heavy"
        lat = 53.0
        lon = 4.9
        "#,
        dir.join("raycast.parquet").display(),
        dir.join("knmi_stations.csv").display(),
        obs_dir.display(),
    );
    BacktestConfig::from_toml_str(&toml).unwrap()
}

#[test]
fn full_grid_produces_one_artifact_per_lead_and_location() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup_config(dir.path());
    let engine = BaselineEngine::new(42);

    let artifacts = run_all(&config, &engine).unwrap();
    assert_eq!(artifacts.len(), 2); // 2 leads × 1 location

    for artifact in &artifacts {
        let result = &artifact.result;
        assert_eq!(result.len(), 12);
        assert_eq!(
            result.column_names(),
            vec!["quantile_P10", "quantile_P50", "quantile_P90"]
        );
        for dropped in METADATA_COLUMNS {
            assert!(!result.has_column(dropped));
        }

        let manifest = &artifact.manifest;
        assert_eq!(manifest.location, "sun_heavy");
        assert_eq!(manifest.nearest_station, "06235");
        assert_eq!(manifest.horizon, 24);
        assert_eq!(manifest.iterations, 3);
        assert_eq!(manifest.engine, "persistence-baseline");
        assert!(!manifest.dataset_hash.is_empty());
    }

    assert_eq!(artifacts[0].manifest.lead_step, 1);
    assert_eq!(artifacts[1].manifest.lead_step, 3);
}

#[test]
fn artifacts_round_trip_through_export() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup_config(dir.path());
    let engine = BaselineEngine::new(7);

    let artifacts = run_all(&config, &engine).unwrap();
    let out_dir = dir.path().join("results");
    for artifact in &artifacts {
        let csv_path = save_artifacts(&artifact.result, &artifact.manifest, &out_dir).unwrap();
        assert!(csv_path.exists());
    }

    assert!(out_dir.join("backtest_sun_heavy_1.csv").exists());
    assert!(out_dir.join("backtest_sun_heavy_3.csv").exists());

    let manifest = load_manifest(&out_dir.join("backtest_sun_heavy_1.json")).unwrap();
    assert_eq!(manifest.lead_step, 1);
    assert_eq!(manifest.columns.len(), 3);
}

#[test]
fn missing_observation_file_aborts_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = setup_config(dir.path());
    config.locations[0].name = "unknown_site".into();
    let engine = BaselineEngine::new(42);

    let err = run_all(&config, &engine).unwrap_err();
    assert!(matches!(err, RunError::Load(_)));
}

#[test]
fn unknown_lead_step_aborts_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = setup_config(dir.path());
    config.backtest.leads = vec![9];
    let engine = BaselineEngine::new(42);

    let err = run_all(&config, &engine).unwrap_err();
    assert!(matches!(err, RunError::Archive(_)));
}
