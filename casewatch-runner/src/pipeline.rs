//! Snapshot construction for one refresh cycle.
//!
//! Steps, in order:
//! 1. Sync the dataset repository (a failed sync is tolerated while the case
//!    files are still present in the checkout)
//! 2. Parse and normalize the county and state files
//! 3. Summarize the national series
//! 4. Fetch and parse every configured economic source, strict mode
//!
//! Any failure aborts the whole build; a partial snapshot is never returned.

use std::collections::BTreeMap;
use std::sync::Arc;

use casewatch_core::data::{
    normalize_counties, normalize_states, parse_county_rows, parse_economic, parse_state_rows,
    summarize, CacheStatus, DataError, DatasetRepo, EconomicSourceSpec, FetchMode, PayloadCache,
    RemoteSource, RepoBackend, SourceFetcher,
};
use casewatch_core::domain::{EconomicSeries, Snapshot};
use tracing::{debug, info, warn};

use crate::config::DashboardConfig;

/// Something that can build a complete snapshot and reset its local state.
///
/// The coordinator only sees this trait, so tests drive it with scripted
/// fakes.
pub trait SnapshotSource: Send + Sync {
    /// Build a snapshot from the current upstream data.
    fn load(&self) -> Result<Snapshot, DataError>;

    /// Discard local state so the next `load` starts from a clean copy.
    fn resync(&self) -> Result<(), DataError>;
}

/// The production snapshot source: dataset repository plus economic fetcher.
pub struct DashboardPipeline {
    repo: DatasetRepo,
    fetcher: SourceFetcher,
    sources: Vec<EconomicSourceSpec>,
    counties_file: String,
    states_file: String,
}

impl DashboardPipeline {
    pub fn new(
        repo: DatasetRepo,
        fetcher: SourceFetcher,
        sources: Vec<EconomicSourceSpec>,
        counties_file: impl Into<String>,
        states_file: impl Into<String>,
    ) -> Self {
        Self {
            repo,
            fetcher,
            sources,
            counties_file: counties_file.into(),
            states_file: states_file.into(),
        }
    }

    /// Wire a pipeline from configuration.
    ///
    /// `remote` builds the network source for each configured economic code;
    /// the binary passes FRED HTTP sources, tests pass fixtures.
    pub fn from_config<F>(
        config: &DashboardConfig,
        backend: Arc<dyn RepoBackend>,
        remote: F,
    ) -> Result<Self, DataError>
    where
        F: Fn(&EconomicSourceSpec) -> Result<Arc<dyn RemoteSource>, DataError>,
    {
        let repo = DatasetRepo::new(&config.repo.url, config.checkout_dir(), backend);
        let mut fetcher = SourceFetcher::new(PayloadCache::new(config.cache_dir()));
        for spec in &config.sources {
            fetcher.register(remote(spec)?, config.economic_expiry());
        }
        Ok(Self::new(
            repo,
            fetcher,
            config.sources.clone(),
            &config.repo.counties_file,
            &config.repo.states_file,
        ))
    }

    pub fn repo(&self) -> &DatasetRepo {
        &self.repo
    }

    pub fn fetcher(&self) -> &SourceFetcher {
        &self.fetcher
    }

    pub fn sources(&self) -> &[EconomicSourceSpec] {
        &self.sources
    }

    /// Cache presence and freshness for every configured economic source.
    pub fn economic_status(&self) -> Vec<CacheStatus> {
        self.sources
            .iter()
            .flat_map(|spec| {
                let expiry = self.fetcher.expiry(&spec.code).unwrap_or_default();
                self.fetcher.cache().status(&[spec.code.as_str()], expiry)
            })
            .collect()
    }

    fn sync_repo(&self) -> Result<(), DataError> {
        match self.repo.sync() {
            Ok(outcome) => {
                debug!(?outcome, "dataset repository synced");
                Ok(())
            }
            Err(e)
                if self.repo.has_file(&self.counties_file)
                    && self.repo.has_file(&self.states_file) =>
            {
                warn!(error = %e, "repository sync failed, using existing checkout");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn load_economic(&self) -> Result<BTreeMap<String, EconomicSeries>, DataError> {
        let mut economic = BTreeMap::new();
        for spec in &self.sources {
            let fetched = self.fetcher.fetch(&spec.code, FetchMode::Strict)?;
            let series = parse_economic(&fetched.bytes, spec)?;
            debug!(
                source = %spec.code,
                origin = ?fetched.origin,
                points = series.len(),
                "economic series loaded"
            );
            economic.insert(spec.code.clone(), series);
        }
        Ok(economic)
    }
}

impl SnapshotSource for DashboardPipeline {
    fn load(&self) -> Result<Snapshot, DataError> {
        self.sync_repo()?;

        let county_bytes = self.repo.read_file(&self.counties_file)?;
        let state_bytes = self.repo.read_file(&self.states_file)?;

        let (counties, states) = rayon::join(
            || parse_county_rows(&county_bytes, &self.counties_file).map(normalize_counties),
            || parse_state_rows(&state_bytes, &self.states_file).map(normalize_states),
        );
        let (counties, states) = (counties?, states?);
        let national = summarize(&states);

        let economic = self.load_economic()?;

        info!(
            counties = counties.len(),
            states = states.len(),
            national_days = national.len(),
            economic = economic.len(),
            "snapshot built"
        );
        Ok(Snapshot::new(counties, states, national, economic))
    }

    fn resync(&self) -> Result<(), DataError> {
        self.repo.resync()
    }
}
