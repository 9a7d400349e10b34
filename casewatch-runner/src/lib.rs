//! Casewatch Runner: refresh coordination, scheduling, queries.
//!
//! This crate builds on `casewatch-core` to provide:
//! - TOML configuration with startup validation
//! - The refresh pipeline (repository sync, normalization, economic fetch)
//! - The refresh coordinator (single-flight cycles, retry with resync,
//!   atomic snapshot publish)
//! - A background scheduler thread
//! - Region ranking and the read-only query facade

pub mod config;
pub mod coordinator;
pub mod facade;
pub mod pipeline;
pub mod ranking;
pub mod scheduler;

pub use config::{ConfigError, DashboardConfig, RepoConfig, RetryConfig};
pub use coordinator::{
    CoordinatorState, RefreshCoordinator, RefreshError, RefreshReport, RetryPolicy,
};
pub use facade::{
    plot_series, EconomicView, FacadeSettings, PlotX, QueryError, QueryFacade, SeriesPlot,
};
pub use pipeline::{DashboardPipeline, SnapshotSource};
pub use ranking::{display_order, rank_regions, RankedRegion};
pub use scheduler::{spawn_scheduler, SchedulerHandle};
