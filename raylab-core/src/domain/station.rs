//! Reference weather stations.

use serde::{Deserialize, Serialize};

/// A reference station with a fixed location.
///
/// The station set is loaded once and shared read-only across all
/// location/lead iterations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub station: String,
    pub lat: f64,
    pub lon: f64,
}

impl Station {
    pub fn new(station: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            station: station.into(),
            lat,
            lon,
        }
    }
}
