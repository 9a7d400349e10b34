//! Read-only query facade over the published snapshot.
//!
//! Every call takes the current snapshot once (running the lazy first load
//! if nothing is published yet) and answers from that `Arc`, so a refresh
//! landing mid-query cannot mix two snapshots. No network I/O happens here.

use std::sync::Arc;

use casewatch_core::aggregate::{
    cumulative_excess, ratio_of, rolling_new_events, ExcessResult, RatioResult, SeriesError,
};
use casewatch_core::data::sources::{CONTINUING_CLAIMS, EMPLOYMENT_LEVEL, NEW_CLAIMS};
use casewatch_core::data::EconomicSourceSpec;
use casewatch_core::domain::{CaseSeries, EconomicSeries, RegionKey, RegionKind, Snapshot};
use casewatch_core::reference::{self, CauseOfDeath};
use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::config::DashboardConfig;
use crate::coordinator::{RefreshCoordinator, RefreshError};
use crate::ranking::{self, RankedRegion};

/// Errors from facade queries.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Includes `InsufficientHistory`, which callers skip rather than report.
    #[error(transparent)]
    Series(#[from] SeriesError),

    #[error("region '{0}' not in dataset")]
    UnknownRegion(RegionKey),

    #[error("economic source '{0}' not in dataset")]
    UnknownSource(String),

    #[error(transparent)]
    Refresh(#[from] RefreshError),
}

impl QueryError {
    /// True when the entity should be skipped rather than treated as a failure.
    pub fn is_insufficient_history(&self) -> bool {
        matches!(self, Self::Series(SeriesError::InsufficientHistory { .. }))
    }
}

/// The x axis of a plot series.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "values", rename_all = "snake_case")]
pub enum PlotX {
    /// Trimmed cumulative cases (absolute mode).
    Cases(Vec<f64>),
    /// Trimmed dates (percent mode).
    Dates(Vec<NaiveDate>),
}

impl PlotX {
    pub fn len(&self) -> usize {
        match self {
            Self::Cases(v) => v.len(),
            Self::Dates(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `(x, y, label)` for one plotted region.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPlot {
    pub label: String,
    pub x: PlotX,
    pub y: Vec<f64>,
}

/// An economic series with its display metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EconomicView {
    pub spec: EconomicSourceSpec,
    pub series: EconomicSeries,
}

/// Settings the facade needs beyond the snapshot itself.
#[derive(Debug, Clone)]
pub struct FacadeSettings {
    pub sources: Vec<EconomicSourceSpec>,
    pub workforce_size: f64,
    pub claims_baseline: NaiveDate,
    pub max_baseline_gap_days: Option<i64>,
}

impl From<&DashboardConfig> for FacadeSettings {
    fn from(config: &DashboardConfig) -> Self {
        Self {
            sources: config.sources.clone(),
            workforce_size: config.workforce_size,
            claims_baseline: config.claims_baseline,
            max_baseline_gap_days: config.max_baseline_gap_days,
        }
    }
}

/// Absolute or percent plot series from a cumulative case series.
pub fn plot_series(
    series: &CaseSeries,
    label: String,
    window: usize,
    as_percent: bool,
) -> Result<SeriesPlot, SeriesError> {
    let result = rolling_new_events(&series.cases_f64(), series.dates(), window)?;
    let (x, y) = if as_percent {
        let y = result.growth_percent();
        (PlotX::Dates(result.dates), y)
    } else {
        (PlotX::Cases(result.counts), result.new_events)
    };
    Ok(SeriesPlot { label, x, y })
}

pub struct QueryFacade {
    coordinator: Arc<RefreshCoordinator>,
    settings: FacadeSettings,
}

impl QueryFacade {
    pub fn new(coordinator: Arc<RefreshCoordinator>, settings: FacadeSettings) -> Self {
        Self {
            coordinator,
            settings,
        }
    }

    pub fn from_config(coordinator: Arc<RefreshCoordinator>, config: &DashboardConfig) -> Self {
        Self::new(coordinator, FacadeSettings::from(config))
    }

    fn snapshot(&self) -> Result<Arc<Snapshot>, QueryError> {
        Ok(self.coordinator.snapshot_or_refresh()?)
    }

    /// All regions of `kind`, pinned first, then by descending latest cases.
    pub fn ranked_regions(
        &self,
        kind: RegionKind,
        priority: &[RegionKey],
    ) -> Result<Vec<RegionKey>, QueryError> {
        let snapshot = self.snapshot()?;
        Ok(ranking::rank_regions(snapshot.regions(kind), priority))
    }

    /// The ranking as a display list: `top_n` highlighted, the rest of the
    /// first `limit` alphabetized.
    pub fn display_order(
        &self,
        kind: RegionKind,
        priority: &[RegionKey],
        top_n: usize,
        limit: usize,
    ) -> Result<Vec<RankedRegion>, QueryError> {
        let ranked = self.ranked_regions(kind, priority)?;
        Ok(ranking::display_order(ranked, top_n, limit))
    }

    /// Plot series for one region. `InsufficientHistory` propagates unchanged.
    pub fn series_for(
        &self,
        region: &RegionKey,
        window: usize,
        as_percent: bool,
    ) -> Result<SeriesPlot, QueryError> {
        let snapshot = self.snapshot()?;
        let series = snapshot
            .series(region)
            .ok_or_else(|| QueryError::UnknownRegion(region.clone()))?;
        Ok(plot_series(series, region.to_string(), window, as_percent)?)
    }

    /// Plot series for the national aggregate.
    pub fn national_series(&self, window: usize, as_percent: bool) -> Result<SeriesPlot, QueryError> {
        let snapshot = self.snapshot()?;
        Ok(plot_series(
            &snapshot.national,
            "United States".to_string(),
            window,
            as_percent,
        )?)
    }

    /// One economic series with its configured title and axis labels.
    pub fn economic(&self, code: &str) -> Result<EconomicView, QueryError> {
        let snapshot = self.snapshot()?;
        let spec = self
            .settings
            .sources
            .iter()
            .find(|s| s.code == code)
            .ok_or_else(|| QueryError::UnknownSource(code.to_string()))?;
        let series = snapshot
            .economic(code)
            .ok_or_else(|| QueryError::UnknownSource(code.to_string()))?;
        Ok(EconomicView {
            spec: spec.clone(),
            series: series.clone(),
        })
    }

    /// Continuing claims as a fraction of the employment level.
    pub fn claims_fraction(&self) -> Result<RatioResult, QueryError> {
        let snapshot = self.snapshot()?;
        let continuing = economic_series(&snapshot, CONTINUING_CLAIMS)?;
        let employed = economic_series(&snapshot, EMPLOYMENT_LEVEL)?;
        Ok(ratio_of(continuing, employed)?)
    }

    /// Cumulative new claims above the level at `baseline` (the configured
    /// date when `None`), also as a fraction of the workforce.
    pub fn claims_excess(&self, baseline: Option<NaiveDate>) -> Result<ExcessResult, QueryError> {
        let snapshot = self.snapshot()?;
        let claims = economic_series(&snapshot, NEW_CLAIMS)?;
        Ok(cumulative_excess(
            claims,
            baseline.unwrap_or(self.settings.claims_baseline),
            self.settings.workforce_size,
            self.settings.max_baseline_gap_days,
        )?)
    }

    pub fn causes_of_death(&self) -> Vec<CauseOfDeath> {
        reference::causes_of_death()
    }
}

fn economic_series<'a>(snapshot: &'a Snapshot, code: &str) -> Result<&'a EconomicSeries, QueryError> {
    snapshot
        .economic(code)
        .ok_or_else(|| QueryError::UnknownSource(code.to_string()))
}
