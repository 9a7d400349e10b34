//! Source fetching, caching, and normalization

pub mod align;
pub mod cache;
pub mod fetcher;
pub mod fred;
pub mod normalize;
pub mod provider;
pub mod records;
pub mod repo;
pub mod sources;

pub use align::{align_cumulative, AlignedCounts};
pub use cache::{CacheStatus, PayloadCache, PayloadMeta};
pub use fetcher::SourceFetcher;
pub use fred::{fred_csv_url, HttpSource};
pub use normalize::{normalize_counties, normalize_states, summarize};
pub use provider::{DataError, FetchMode, FetchResult, PayloadOrigin, RemoteSource};
pub use records::{parse_county_rows, parse_economic, parse_state_rows, CaseRow};
pub use repo::{DatasetRepo, GitCli, RepoBackend, SyncOutcome};
pub use sources::{EconomicSourceSpec, ValueTransform};
