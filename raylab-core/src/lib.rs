//! RayLab Core — forecast-archive model, reshaping, station lookup, and
//! covariate alignment.
//!
//! This crate contains the data plumbing of the backtesting lab:
//! - Domain types (stations, time-indexed tables)
//! - The dense 4-key forecast archive with its Parquet store
//! - Archive reshaping (scalar-lead slice and full lead expansion)
//! - Nearest-station lookup
//! - Forecast-covariate alignment with the derived-feature seam
//! - The external train-and-backtest engine trait

pub mod archive;
pub mod domain;
pub mod engine;
pub mod features;
pub mod job;
pub mod locator;
