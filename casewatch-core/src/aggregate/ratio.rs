//! Ratio of two series on different date axes.
//!
//! The denominator is linearly interpolated onto the numerator's dates, with
//! dates treated as day ordinals. Outside the denominator's date range the
//! interpolation clamps to its first or last value. That clamping is an
//! artifact, not an estimate: callers should only ask for ratios where the
//! denominator spans the numerator.

use super::SeriesError;
use crate::domain::EconomicSeries;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;

/// Numerator dates and numerator / interpolated denominator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatioResult {
    pub dates: Vec<NaiveDate>,
    pub fraction: Vec<f64>,
}

fn ordinal(date: NaiveDate) -> f64 {
    date.num_days_from_ce() as f64
}

/// Interpolate `(src_dates, src_values)` at each of `targets`.
///
/// `src_dates` must be ascending and non-empty.
pub fn interpolate_onto(targets: &[NaiveDate], src_dates: &[NaiveDate], src_values: &[f64]) -> Vec<f64> {
    debug_assert_eq!(src_dates.len(), src_values.len());
    debug_assert!(!src_dates.is_empty());

    let last = src_dates.len() - 1;
    targets
        .iter()
        .map(|&t| {
            if t <= src_dates[0] {
                return src_values[0];
            }
            if t >= src_dates[last] {
                return src_values[last];
            }
            // First index with date > t; t lies in [hi-1, hi).
            let hi = src_dates.partition_point(|&d| d <= t);
            let lo = hi - 1;
            let (x0, x1) = (ordinal(src_dates[lo]), ordinal(src_dates[hi]));
            let (y0, y1) = (src_values[lo], src_values[hi]);
            y0 + (y1 - y0) * (ordinal(t) - x0) / (x1 - x0)
        })
        .collect()
}

/// `a / b`, with `b` aligned onto `a`'s dates.
pub fn ratio_of(a: &EconomicSeries, b: &EconomicSeries) -> Result<RatioResult, SeriesError> {
    if b.is_empty() {
        return Err(SeriesError::EmptySeries);
    }
    let denominators = interpolate_onto(a.dates(), b.dates(), b.values());
    let fraction = a
        .values()
        .iter()
        .zip(&denominators)
        .map(|(num, den)| num / den)
        .collect();

    Ok(RatioResult {
        dates: a.dates().to_vec(),
        fraction,
    })
}
