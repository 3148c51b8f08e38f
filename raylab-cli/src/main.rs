//! RayLab CLI — archive inspection and backtest run commands.
//!
//! Commands:
//! - `run` — execute the full backtest grid from a TOML config file and
//!   write one CSV + manifest pair per (location, lead)
//! - `archive info` — report a persisted archive's dimensions

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use raylab_core::archive::ArchiveStore;
use raylab_runner::{run_all, save_artifacts, BacktestConfig, BaselineEngine};

#[derive(Parser)]
#[command(
    name = "raylab",
    about = "RayLab CLI — irradiance-covariate backtesting lab"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute the backtest grid from a TOML config file.
    ///
    /// Runs the built-in persistence baseline engine; results are baseline
    /// diagnostics until an external model engine is wired in.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Output directory for CSV + manifest artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Seed for the baseline engine.
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    /// Archive inspection commands.
    Archive {
        #[command(subcommand)]
        action: ArchiveAction,
    },
}

#[derive(Subcommand)]
enum ArchiveAction {
    /// Print a persisted archive's dimension summary.
    Info {
        /// Path to the archive Parquet file.
        #[arg(long)]
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            output_dir,
            seed,
        } => cmd_run(&config, &output_dir, seed),
        Commands::Archive {
            action: ArchiveAction::Info { path },
        } => cmd_archive_info(&path),
    }
}

fn cmd_run(config_path: &PathBuf, output_dir: &PathBuf, seed: u64) -> Result<()> {
    let config = BacktestConfig::load(config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    eprintln!(
        "WARNING: using the persistence baseline engine — results are baseline diagnostics"
    );

    let engine = BaselineEngine::new(seed);
    let artifacts = run_all(&config, &engine).context("backtest run failed")?;

    for artifact in &artifacts {
        let path = save_artifacts(&artifact.result, &artifact.manifest, output_dir)?;
        println!(
            "{} (lead {}, {} rows, {} iterations)",
            path.display(),
            artifact.manifest.lead_step,
            artifact.manifest.rows,
            artifact.manifest.iterations,
        );
    }

    println!("{} artifacts written to {}", artifacts.len(), output_dir.display());
    Ok(())
}

fn cmd_archive_info(path: &PathBuf) -> Result<()> {
    let meta = ArchiveStore::new(path)
        .load_meta()
        .with_context(|| format!("reading metadata for {}", path.display()))?;

    println!("archive: {}", path.display());
    println!("stations: {}", meta.stations.join(", "));
    println!("issue times: {}", meta.issue_time_count);
    println!("lead steps: {:?}", meta.lead_steps);
    println!("quantiles: {}", meta.quantile_count);
    println!("interval: {} min", meta.step_minutes);
    println!("cells: {}", meta.cell_count);
    Ok(())
}
