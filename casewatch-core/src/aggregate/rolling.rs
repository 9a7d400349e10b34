//! Window-averaged new events from cumulative counts.
//!
//! new[i] = (counts[i+window] - counts[i]) / window
//! Output drops the first `window` points, which lack enough history.

use super::SeriesError;
use chrono::NaiveDate;

/// Trimmed cumulative counts, per-period new events and trimmed dates.
///
/// All three vectors have the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct RollingWindowResult {
    pub counts: Vec<f64>,
    pub new_events: Vec<f64>,
    pub dates: Vec<NaiveDate>,
}

impl RollingWindowResult {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// new / cumulative × 100 per point; NaN where the cumulative count is zero.
    pub fn growth_percent(&self) -> Vec<f64> {
        self.new_events
            .iter()
            .zip(&self.counts)
            .map(|(&new, &total)| {
                if total == 0.0 {
                    f64::NAN
                } else {
                    new / total * 100.0
                }
            })
            .collect()
    }
}

/// Compute the window-averaged first difference of a cumulative series.
///
/// Fails with `InsufficientHistory` when `counts.len() <= window`.
pub fn rolling_new_events(
    counts: &[f64],
    dates: &[NaiveDate],
    window: usize,
) -> Result<RollingWindowResult, SeriesError> {
    debug_assert_eq!(counts.len(), dates.len(), "counts and dates must be aligned");

    if window == 0 {
        return Err(SeriesError::InvalidWindow);
    }
    let n = counts.len();
    if n <= window {
        return Err(SeriesError::InsufficientHistory { len: n, window });
    }

    let divisor = window as f64;
    let new_events = (window..n)
        .map(|i| (counts[i] - counts[i - window]) / divisor)
        .collect();

    Ok(RollingWindowResult {
        counts: counts[window..].to_vec(),
        new_events,
        dates: dates[window..].to_vec(),
    })
}
