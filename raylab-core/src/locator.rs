//! Nearest-station lookup.
//!
//! Maps a target coordinate to the closest reference station by Euclidean
//! distance in (latitude, longitude) space. At the scale of a national
//! station network a planar approximation is sufficient; no geodesic
//! correction is applied.

use thiserror::Error;

use crate::domain::Station;

/// Errors from station lookup.
#[derive(Debug, Error)]
pub enum LocateError {
    #[error("no candidate stations to search")]
    NoStations,
}

/// Return the station closest to (`lat`, `lon`).
///
/// Exact ties resolve to the first minimum in iteration order; with
/// real-valued coordinates ties do not occur in practice.
pub fn nearest<'a>(lat: f64, lon: f64, stations: &'a [Station]) -> Result<&'a Station, LocateError> {
    stations
        .iter()
        .min_by(|a, b| {
            sq_dist(lat, lon, a)
                .partial_cmp(&sq_dist(lat, lon, b))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .ok_or(LocateError::NoStations)
}

fn sq_dist(lat: f64, lon: f64, s: &Station) -> f64 {
    (s.lat - lat).powi(2) + (s.lon - lon).powi(2)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates() -> Vec<Station> {
        vec![
            Station::new("north", 53.0, 5.0),
            Station::new("middle", 52.0, 5.0),
            Station::new("south", 51.0, 5.0),
        ]
    }

    #[test]
    fn picks_the_closest_station() {
        let stations = candidates();
        let found = nearest(52.9, 5.1, &stations).unwrap();
        assert_eq!(found.station, "north");

        let found = nearest(51.2, 4.8, &stations).unwrap();
        assert_eq!(found.station, "south");
    }

    #[test]
    fn empty_set_is_an_error() {
        let err = nearest(52.0, 5.0, &[]).unwrap_err();
        assert!(matches!(err, LocateError::NoStations));
    }

    #[test]
    fn exact_tie_returns_one_of_the_tied() {
        let stations = candidates();
        // Equidistant from north (53.0) and south (51.0).
        let found = nearest(52.0, 5.0, &stations).unwrap();
        assert_eq!(found.station, "middle");

        // Remove the exact match; either remaining answer is acceptable.
        let two = vec![stations[0].clone(), stations[2].clone()];
        let found = nearest(52.0, 5.0, &two).unwrap();
        assert!(found.station == "north" || found.station == "south");
    }
}
