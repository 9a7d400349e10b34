//! Multi-region date-axis reconciliation.
//!
//! Given cumulative series for several regions, place them all on the union
//! of their dates. Cumulative counts carry forward across a missing day; a
//! region contributes zero before its first report.

use crate::domain::{CasePoint, CaseSeries, RegionKey};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

/// Cumulative counts for multiple regions on a common timeline.
#[derive(Debug)]
pub struct AlignedCounts {
    /// The common date axis (sorted ascending).
    pub dates: Vec<NaiveDate>,
    /// Series per region, each with exactly `dates.len()` points.
    pub series: BTreeMap<RegionKey, CaseSeries>,
    /// Number of points that were filled rather than reported.
    pub filled_points: usize,
}

/// Align every region onto the union of all dates.
pub fn align_cumulative(input: &BTreeMap<RegionKey, CaseSeries>) -> AlignedCounts {
    let dates: Vec<NaiveDate> = input
        .values()
        .flat_map(|s| s.dates().iter().copied())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut filled_points = 0;
    let mut series = BTreeMap::new();

    for (key, source) in input {
        let mut aligned = CaseSeries::with_capacity(dates.len());
        let mut cursor = 0;
        let mut carried = (0u64, 0u64);

        for &date in &dates {
            // Duplicate dates in the source collapse to the last row for that day.
            let mut reported = false;
            while cursor < source.len() && source.dates()[cursor] <= date {
                if source.dates()[cursor] == date {
                    reported = true;
                }
                carried = (source.cases()[cursor], source.deaths()[cursor]);
                cursor += 1;
            }
            if !reported {
                filled_points += 1;
            }
            aligned.push(CasePoint {
                date,
                cases: carried.0,
                deaths: carried.1,
            });
        }

        series.insert(key.clone(), aligned);
    }

    AlignedCounts {
        dates,
        series,
        filled_points,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(points: &[(&str, u64)]) -> CaseSeries {
        CaseSeries::from_points(points.iter().map(|(date, cases)| CasePoint {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            cases: *cases,
            deaths: cases / 10,
        }))
    }

    #[test]
    fn align_forward_fills_missing_days() {
        let mut input = BTreeMap::new();
        input.insert(
            RegionKey::state("Ohio"),
            series(&[("2020-04-01", 100), ("2020-04-02", 110), ("2020-04-03", 130)]),
        );
        input.insert(
            RegionKey::state("Utah"),
            // Utah missing 2020-04-02
            series(&[("2020-04-01", 20), ("2020-04-03", 40)]),
        );

        let aligned = align_cumulative(&input);

        assert_eq!(aligned.dates.len(), 3);
        assert_eq!(aligned.series[&RegionKey::state("Ohio")].cases(), &[100, 110, 130]);
        assert_eq!(aligned.series[&RegionKey::state("Utah")].cases(), &[20, 20, 40]);
        assert_eq!(aligned.filled_points, 1);
    }

    #[test]
    fn late_starter_is_zero_before_first_report() {
        let mut input = BTreeMap::new();
        input.insert(RegionKey::state("Ohio"), series(&[("2020-04-01", 5), ("2020-04-02", 6)]));
        input.insert(RegionKey::state("Maine"), series(&[("2020-04-02", 1)]));

        let aligned = align_cumulative(&input);
        let maine = &aligned.series[&RegionKey::state("Maine")];
        assert_eq!(maine.cases(), &[0, 1]);
        assert_eq!(maine.deaths(), &[0, 0]);
        assert!(maine.is_aligned());
    }

    #[test]
    fn single_region_no_alignment_needed() {
        let mut input = BTreeMap::new();
        input.insert(RegionKey::state("Ohio"), series(&[("2020-04-01", 5)]));

        let aligned = align_cumulative(&input);
        assert_eq!(aligned.dates.len(), 1);
        assert_eq!(aligned.filled_points, 0);
    }
}
