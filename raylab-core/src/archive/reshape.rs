//! Archive reshaping: 4-D forecast archive → 2-D time-indexed tables.
//!
//! Two modes:
//! - scalar: fix (station, lead-step), index by issue-time, one column per
//!   quantile. No time shift is applied here; relabeling a forecast onto its
//!   use time is the caller's concern.
//! - full: fix the station only, expand every (issue-time, lead-step) pair
//!   into a composite (issue-time, valid-time) index and carry the lead
//!   duration in hours as an extra column.

use chrono::{DateTime, Utc};

use crate::domain::TimeTable;

use super::{ArchiveError, ForecastArchive};

/// Full-expansion reshape output.
///
/// One row per (issue-time, lead-step) present in the archive, keyed by the
/// composite (issue-time, valid-time) pair. Rows are ordered issue-time
/// major, lead-step minor, so all pairs are unique by construction.
#[derive(Debug, Clone)]
pub struct ExpandedTable {
    index: Vec<(DateTime<Utc>, DateTime<Utc>)>,
    lead_hours: Vec<f64>,
    columns: Vec<(String, Vec<f64>)>,
}

impl ExpandedTable {
    /// The composite (issue-time, valid-time) index.
    pub fn index(&self) -> &[(DateTime<Utc>, DateTime<Utc>)] {
        &self.index
    }

    /// Lead duration in hours for each row.
    pub fn lead_hours(&self) -> &[f64] {
        &self.lead_hours
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Quantile column names in archive order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }
}

/// Scalar mode: the (issue-time × quantile) slice at one lead step.
///
/// Returns a table indexed by issue-time with one float column per quantile,
/// named by the quantile level (`"0.05"`, `"0.5"`, …).
pub fn reshape_at_lead(
    archive: &ForecastArchive,
    station: &str,
    lead_step: u32,
) -> Result<TimeTable, ArchiveError> {
    let si = archive.station_index(station)?;
    let li = archive.lead_index(lead_step)?;

    let mut table = TimeTable::new(archive.issue_times().to_vec());
    for (qi, q) in archive.quantiles().iter().enumerate() {
        let values: Vec<f64> = (0..archive.issue_times().len())
            .map(|ti| archive.value(si, ti, li, qi))
            .collect();
        table
            .push_float_column(ForecastArchive::quantile_label(*q), values)
            .map_err(|e| ArchiveError::Validation(e.to_string()))?;
    }
    Ok(table)
}

/// Full mode: expand every lead step present for the station.
///
/// Row count is |issue-times| × |lead-steps|; each row's valid-time is
/// issue-time + lead-step × interval length.
pub fn reshape_all_leads(
    archive: &ForecastArchive,
    station: &str,
) -> Result<ExpandedTable, ArchiveError> {
    let si = archive.station_index(station)?;
    let n_rows = archive.issue_times().len() * archive.lead_steps().len();

    let mut index = Vec::with_capacity(n_rows);
    let mut lead_hours = Vec::with_capacity(n_rows);
    for issue in archive.issue_times() {
        for lead in archive.lead_steps() {
            index.push((*issue, *issue + archive.lead_offset(*lead)));
            lead_hours.push(*lead as f64 * archive.step_minutes() as f64 / 60.0);
        }
    }

    let columns = archive
        .quantiles()
        .iter()
        .enumerate()
        .map(|(qi, q)| {
            let mut values = Vec::with_capacity(n_rows);
            for ti in 0..archive.issue_times().len() {
                for li in 0..archive.lead_steps().len() {
                    values.push(archive.value(si, ti, li, qi));
                }
            }
            (ForecastArchive::quantile_label(*q), values)
        })
        .collect();

    Ok(ExpandedTable {
        index,
        lead_hours,
        columns,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn issue(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 6, 1, h, 0, 0).unwrap()
    }

    /// 2 stations × 3 issue times × 2 lead steps × 2 quantiles.
    /// Cell value encodes its coordinates: s*1000 + t*100 + l*10 + q.
    fn archive() -> ForecastArchive {
        let stations = vec!["alpha".to_string(), "beta".to_string()];
        let times = vec![issue(0), issue(1), issue(2)];
        let leads = vec![1u32, 4];
        let quantiles = vec![0.5, 0.9];
        let mut values = Vec::new();
        for s in 0..stations.len() {
            for t in 0..times.len() {
                for l in 0..leads.len() {
                    for q in 0..quantiles.len() {
                        values.push((s * 1000 + t * 100 + l * 10 + q) as f64);
                    }
                }
            }
        }
        ForecastArchive::new(stations, times, leads, quantiles, 15, values).unwrap()
    }

    #[test]
    fn scalar_mode_is_indexed_by_issue_time() {
        let table = reshape_at_lead(&archive(), "beta", 4).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.index(), &[issue(0), issue(1), issue(2)]);
        assert_eq!(table.column_names(), vec!["0.5", "0.9"]);
        // station=beta (1), lead=4 (position 1), quantile 0.9 (1)
        assert_eq!(table.float_column("0.9").unwrap(), &[1011.0, 1111.0, 1211.0]);
    }

    #[test]
    fn full_mode_expands_every_lead_step() {
        let a = archive();
        let expanded = reshape_all_leads(&a, "alpha").unwrap();
        assert_eq!(expanded.len(), 3 * 2);
        assert_eq!(expanded.column_names(), vec!["0.5", "0.9"]);

        // Row order: issue-time major, lead minor.
        let (i0, v0) = expanded.index()[0];
        assert_eq!(i0, issue(0));
        assert_eq!(v0, issue(0) + Duration::minutes(15));
        let (i1, v1) = expanded.index()[1];
        assert_eq!(i1, issue(0));
        assert_eq!(v1, issue(0) + Duration::minutes(60));

        assert_eq!(expanded.lead_hours()[0], 0.25);
        assert_eq!(expanded.lead_hours()[1], 1.0);
    }

    #[test]
    fn full_mode_pairs_are_unique_and_non_negative() {
        let expanded = reshape_all_leads(&archive(), "alpha").unwrap();
        let mut seen = std::collections::BTreeSet::new();
        for (issue, valid) in expanded.index() {
            assert!(*valid >= *issue);
            assert!(seen.insert((*issue, *valid)), "duplicate composite key");
        }
    }

    #[test]
    fn scalar_mode_matches_full_mode_restriction() {
        let a = archive();
        let scalar = reshape_at_lead(&a, "alpha", 1).unwrap();
        let full = reshape_all_leads(&a, "alpha").unwrap();

        let lead_hours = 1.0 * 15.0 / 60.0;
        for name in scalar.column_names() {
            let scalar_vals = scalar.float_column(name).unwrap();
            let full_vals = full.column(name).unwrap();
            let restricted: Vec<f64> = full
                .lead_hours()
                .iter()
                .zip(full_vals)
                .filter(|(lh, _)| **lh == lead_hours)
                .map(|(_, v)| *v)
                .collect();
            assert_eq!(scalar_vals, restricted.as_slice());
        }
    }

    #[test]
    fn absent_station_or_lead_propagates() {
        let a = archive();
        assert!(matches!(
            reshape_at_lead(&a, "gamma", 1).unwrap_err(),
            ArchiveError::StationNotFound(_)
        ));
        assert!(matches!(
            reshape_at_lead(&a, "alpha", 7).unwrap_err(),
            ArchiveError::LeadStepNotFound(7)
        ));
        assert!(matches!(
            reshape_all_leads(&a, "gamma").unwrap_err(),
            ArchiveError::StationNotFound(_)
        ));
    }
}
