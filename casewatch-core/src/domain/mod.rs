//! Domain types for Casewatch

pub mod region;
pub mod series;
pub mod snapshot;

pub use region::{RegionKey, RegionKind};
pub use series::{CasePoint, CaseSeries, EconomicSeries};
pub use snapshot::Snapshot;
