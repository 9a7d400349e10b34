//! Per-entity time series.
//!
//! Both series types keep their columns private so the parallel-column
//! invariant (equal length, shared index alignment) holds by construction.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One day of cumulative counts for a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CasePoint {
    pub date: NaiveDate,
    pub cases: u64,
    pub deaths: u64,
}

/// Cumulative confirmed cases and deaths for one region, ordered by date.
///
/// Gaps in the date axis are allowed. Counts are not required to be
/// non-decreasing; upstream corrections occasionally lower them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaseSeries {
    dates: Vec<NaiveDate>,
    cases: Vec<u64>,
    deaths: Vec<u64>,
}

impl CaseSeries {
    /// Build from points already in ascending date order.
    pub fn from_points(points: impl IntoIterator<Item = CasePoint>) -> Self {
        let mut series = Self::default();
        for p in points {
            series.push(p);
        }
        series
    }

    pub fn with_capacity(n: usize) -> Self {
        Self {
            dates: Vec::with_capacity(n),
            cases: Vec::with_capacity(n),
            deaths: Vec::with_capacity(n),
        }
    }

    pub fn push(&mut self, point: CasePoint) {
        debug_assert!(
            self.dates.last().map_or(true, |last| *last <= point.date),
            "case points must arrive in date order"
        );
        self.dates.push(point.date);
        self.cases.push(point.cases);
        self.deaths.push(point.deaths);
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn cases(&self) -> &[u64] {
        &self.cases
    }

    pub fn deaths(&self) -> &[u64] {
        &self.deaths
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Most recent point, if any.
    pub fn latest(&self) -> Option<CasePoint> {
        let i = self.len().checked_sub(1)?;
        Some(self.point(i))
    }

    pub fn point(&self, i: usize) -> CasePoint {
        CasePoint {
            date: self.dates[i],
            cases: self.cases[i],
            deaths: self.deaths[i],
        }
    }

    pub fn points(&self) -> impl Iterator<Item = CasePoint> + '_ {
        (0..self.len()).map(|i| self.point(i))
    }

    /// Latest cumulative case count, zero for an empty series.
    pub fn latest_cases(&self) -> u64 {
        self.cases.last().copied().unwrap_or(0)
    }

    pub fn cases_f64(&self) -> Vec<f64> {
        self.cases.iter().map(|&c| c as f64).collect()
    }

    pub fn deaths_f64(&self) -> Vec<f64> {
        self.deaths.iter().map(|&d| d as f64).collect()
    }

    /// True when all three columns have the same length.
    pub fn is_aligned(&self) -> bool {
        self.dates.len() == self.cases.len() && self.dates.len() == self.deaths.len()
    }
}

/// A `(date, value)` series for one economic metric.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EconomicSeries {
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl EconomicSeries {
    /// Build from `(date, value)` pairs already in ascending date order.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (NaiveDate, f64)>) -> Self {
        let (dates, values) = pairs.into_iter().unzip();
        Self { dates, values }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn latest(&self) -> Option<(NaiveDate, f64)> {
        Some((*self.dates.last()?, *self.values.last()?))
    }

    /// Apply `f` to every value, keeping the date axis.
    pub fn map_values(mut self, f: impl Fn(f64) -> f64) -> Self {
        for v in &mut self.values {
            *v = f(*v);
        }
        self
    }
}
