//! Raw rows to per-region series, plus the national sum.

use super::align::align_cumulative;
use super::records::CaseRow;
use crate::domain::{CasePoint, CaseSeries, RegionKey, RegionKind};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Group county rows by `(county, state)` and sort each group by date.
pub fn normalize_counties(rows: Vec<CaseRow>) -> BTreeMap<RegionKey, CaseSeries> {
    debug_assert!(rows.iter().all(|r| r.key.kind() == RegionKind::County));
    group_by_region(rows)
}

/// Group state rows by state and sort each group by date.
pub fn normalize_states(rows: Vec<CaseRow>) -> BTreeMap<RegionKey, CaseSeries> {
    debug_assert!(rows.iter().all(|r| r.key.kind() == RegionKind::State));
    group_by_region(rows)
}

/// One output series per distinct key; rows in any order; no dates invented.
fn group_by_region(rows: Vec<CaseRow>) -> BTreeMap<RegionKey, CaseSeries> {
    let mut groups: HashMap<RegionKey, Vec<CasePoint>> = HashMap::new();
    for row in rows {
        groups.entry(row.key).or_default().push(CasePoint {
            date: row.date,
            cases: row.cases,
            deaths: row.deaths,
        });
    }

    groups
        .into_par_iter()
        .map(|(key, mut points)| {
            points.sort_by_key(|p| p.date);
            (key, CaseSeries::from_points(points))
        })
        .collect()
}

/// National totals: every state reconciled onto the union of dates, then
/// summed per date.
///
/// When all state axes already match this is the plain index-wise sum.
pub fn summarize(states: &BTreeMap<RegionKey, CaseSeries>) -> CaseSeries {
    let aligned = align_cumulative(states);
    if aligned.filled_points > 0 {
        debug!(
            filled = aligned.filled_points,
            "forward-filled missing state reports before summing"
        );
    }

    let mut national = CaseSeries::with_capacity(aligned.dates.len());
    for (i, &date) in aligned.dates.iter().enumerate() {
        let (cases, deaths) = aligned
            .series
            .values()
            .fold((0u64, 0u64), |(c, d), s| (c + s.cases()[i], d + s.deaths()[i]));
        national.push(CasePoint { date, cases, deaths });
    }
    national
}
