//! Rolling-window aggregation and derived series.
//!
//! Everything here is a pure function over slices. Nothing touches the
//! network or the published snapshot; callers pass in the series they hold.
//!
//! Parallel inputs (`counts` and `dates`, a series' dates and values) are
//! assumed to have equal length. That is checked with `debug_assert!` only.

pub mod excess;
pub mod ratio;
pub mod rolling;

pub use excess::{cumulative_excess, ExcessResult};
pub use ratio::{interpolate_onto, ratio_of, RatioResult};
pub use rolling::{rolling_new_events, RollingWindowResult};

use chrono::NaiveDate;
use thiserror::Error;

/// Errors from series computations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    /// The series is too short for the requested window. Callers skip the
    /// entity rather than treat this as fatal.
    #[error("not enough history: {len} points for a window of {window}")]
    InsufficientHistory { len: usize, window: usize },

    #[error("rolling window must be at least 1")]
    InvalidWindow,

    #[error("series is empty")]
    EmptySeries,

    #[error(
        "nearest date to baseline {requested} is {nearest}, {gap_days} days away (limit {max_gap_days})"
    )]
    BaselineTooFar {
        requested: NaiveDate,
        nearest: NaiveDate,
        gap_days: i64,
        max_gap_days: i64,
    },
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for aggregation tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;

/// Consecutive daily dates starting at 2020-03-01, for tests.
#[cfg(test)]
pub fn make_dates(n: usize) -> Vec<NaiveDate> {
    let base = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
    (0..n)
        .map(|i| base + chrono::Duration::days(i as i64))
        .collect()
}
