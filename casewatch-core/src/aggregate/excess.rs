//! Cumulative excess over a baseline date.

use super::SeriesError;
use crate::domain::EconomicSeries;
use chrono::NaiveDate;
use serde::Serialize;

/// Running excess from the baseline index onwards.
///
/// `excess[0]` is always 0; `fraction` is `excess / denominator`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExcessResult {
    pub baseline: NaiveDate,
    pub dates: Vec<NaiveDate>,
    pub excess: Vec<f64>,
    pub fraction: Vec<f64>,
}

/// Index of the date closest to `target`. Ties resolve to the earlier date.
fn nearest_index(dates: &[NaiveDate], target: NaiveDate) -> usize {
    let hi = dates.partition_point(|&d| d < target);
    if hi == 0 {
        return 0;
    }
    if hi == dates.len() {
        return hi - 1;
    }
    let before = (target - dates[hi - 1]).num_days();
    let after = (dates[hi] - target).num_days();
    if after < before {
        hi
    } else {
        hi - 1
    }
}

/// Sum of `(v - baseline_value)` from the point nearest `baseline` onwards.
///
/// With `max_gap_days` set, a nearest date further than that from the
/// requested baseline is an error instead of a silent substitution.
pub fn cumulative_excess(
    series: &EconomicSeries,
    baseline: NaiveDate,
    denominator: f64,
    max_gap_days: Option<i64>,
) -> Result<ExcessResult, SeriesError> {
    if series.is_empty() {
        return Err(SeriesError::EmptySeries);
    }
    let dates = series.dates();
    let values = series.values();

    let start = nearest_index(dates, baseline);
    let nearest = dates[start];
    let gap_days = (nearest - baseline).num_days().abs();
    if let Some(max_gap_days) = max_gap_days {
        if gap_days > max_gap_days {
            return Err(SeriesError::BaselineTooFar {
                requested: baseline,
                nearest,
                gap_days,
                max_gap_days,
            });
        }
    }

    let base = values[start];
    let excess: Vec<f64> = values[start..]
        .iter()
        .scan(0.0, |acc, &v| {
            *acc += v - base;
            Some(*acc)
        })
        .collect();
    let fraction = excess.iter().map(|e| e / denominator).collect();

    Ok(ExcessResult {
        baseline: nearest,
        dates: dates[start..].to_vec(),
        excess,
        fraction,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{assert_approx, make_dates, DEFAULT_EPSILON};

    fn weekly(values: &[f64]) -> EconomicSeries {
        let start = NaiveDate::from_ymd_opt(2020, 3, 7).unwrap();
        EconomicSeries::from_pairs(
            values
                .iter()
                .enumerate()
                .map(|(i, &v)| (start + chrono::Duration::weeks(i as i64), v)),
        )
    }

    #[test]
    fn excess_accumulates_from_baseline() {
        let series = weekly(&[200.0, 210.0, 3000.0]);
        let r = cumulative_excess(&series, series.dates()[0], 1000.0, None).unwrap();

        assert_eq!(r.excess, vec![0.0, 10.0, 2810.0]);
        assert_approx(r.fraction[2], 2.81, DEFAULT_EPSILON);
        assert_eq!(r.dates.len(), 3);
    }

    #[test]
    fn baseline_snaps_to_nearest_date() {
        let series = weekly(&[100.0, 150.0, 400.0]);
        // Mar 15 is one day after the second point (Mar 14).
        let baseline = NaiveDate::from_ymd_opt(2020, 3, 15).unwrap();
        let r = cumulative_excess(&series, baseline, 1.0, None).unwrap();

        assert_eq!(r.baseline, series.dates()[1]);
        assert_eq!(r.excess, vec![0.0, 250.0]);
    }

    #[test]
    fn equidistant_baseline_prefers_earlier_date() {
        let dates = make_dates(3);
        let series = EconomicSeries::from_pairs([(dates[0], 1.0), (dates[2], 2.0)]);
        let r = cumulative_excess(&series, dates[1], 1.0, None).unwrap();
        assert_eq!(r.baseline, dates[0]);
    }

    #[test]
    fn baseline_outside_range_uses_endpoint() {
        let series = weekly(&[5.0, 6.0]);
        let early = NaiveDate::from_ymd_opt(2019, 1, 1).unwrap();
        let r = cumulative_excess(&series, early, 1.0, None).unwrap();
        assert_eq!(r.baseline, series.dates()[0]);
    }

    #[test]
    fn distant_baseline_rejected_with_limit() {
        let series = weekly(&[5.0, 6.0]);
        let early = NaiveDate::from_ymd_opt(2020, 2, 1).unwrap();
        let err = cumulative_excess(&series, early, 1.0, Some(14)).unwrap_err();

        assert!(matches!(
            err,
            SeriesError::BaselineTooFar { gap_days: 35, max_gap_days: 14, .. }
        ));
    }

    #[test]
    fn empty_series_is_rejected() {
        let err = cumulative_excess(&EconomicSeries::default(), make_dates(1)[0], 1.0, None);
        assert_eq!(err, Err(SeriesError::EmptySeries));
    }
}
