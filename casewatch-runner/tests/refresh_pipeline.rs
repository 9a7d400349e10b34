//! End-to-end refresh tests: fixture repository + fixture economic sources
//! → pipeline → coordinator → facade.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use casewatch_core::data::{DataError, RemoteSource, RepoBackend};
use casewatch_core::domain::{RegionKey, RegionKind};
use casewatch_runner::{
    CoordinatorState, DashboardConfig, DashboardPipeline, PlotX, QueryError, QueryFacade,
    RefreshCoordinator, RefreshError, RefreshReport, RetryPolicy,
};
use chrono::NaiveDate;

fn fixture_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

/// "Clones" by copying the case fixtures into the checkout.
#[derive(Default)]
struct FixtureRepo {
    clones: AtomicUsize,
    fail_pulls: AtomicBool,
    fail_clones: AtomicBool,
}

impl RepoBackend for FixtureRepo {
    fn clone_repo(&self, _url: &str, dest: &Path) -> Result<(), DataError> {
        if self.fail_clones.load(Ordering::SeqCst) {
            return Err(DataError::unavailable("dataset-repo", "clone refused"));
        }
        self.clones.fetch_add(1, Ordering::SeqCst);
        fs::create_dir_all(dest).unwrap();
        for name in ["us-counties.csv", "us-states.csv"] {
            fs::copy(fixture_dir().join(name), dest.join(name)).unwrap();
        }
        Ok(())
    }

    fn pull(&self, _checkout: &Path) -> Result<(), DataError> {
        if self.fail_pulls.load(Ordering::SeqCst) {
            Err(DataError::unavailable("dataset-repo", "network down"))
        } else {
            Ok(())
        }
    }
}

/// Serves `tests/fixtures/<CODE>.csv`, or fails while `down` is set.
struct FixtureSource {
    code: String,
    down: Arc<AtomicBool>,
}

impl RemoteSource for FixtureSource {
    fn id(&self) -> &str {
        &self.code
    }

    fn retrieve(&self) -> Result<Vec<u8>, DataError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(DataError::unavailable(&self.code, "HTTP 503"));
        }
        fs::read(fixture_dir().join(format!("{}.csv", self.code)))
            .map_err(|e| DataError::unavailable(&self.code, e))
    }
}

struct Harness {
    _dir: tempfile::TempDir,
    config: DashboardConfig,
    repo: Arc<FixtureRepo>,
    network_down: Arc<AtomicBool>,
    coordinator: Arc<RefreshCoordinator>,
}

impl Harness {
    fn new() -> Self {
        Self::with_config(|_| {})
    }

    fn with_config(adjust: impl FnOnce(&mut DashboardConfig)) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = DashboardConfig {
            data_dir: dir.path().to_path_buf(),
            pinned_counties: vec!["Santa Clara, California".to_string()],
            ..DashboardConfig::default()
        };
        adjust(&mut config);
        config.validate().unwrap();

        let repo = Arc::new(FixtureRepo::default());
        let network_down = Arc::new(AtomicBool::new(false));
        let down = Arc::clone(&network_down);
        let pipeline = DashboardPipeline::from_config(&config, repo.clone(), |spec| {
            Ok(Arc::new(FixtureSource {
                code: spec.code.clone(),
                down: Arc::clone(&down),
            }) as Arc<dyn RemoteSource>)
        })
        .unwrap();
        let coordinator = Arc::new(RefreshCoordinator::new(
            Arc::new(pipeline),
            RetryPolicy::immediate(),
        ));

        Self {
            _dir: dir,
            config,
            repo,
            network_down,
            coordinator,
        }
    }

    fn facade(&self) -> QueryFacade {
        QueryFacade::from_config(self.coordinator.clone(), &self.config)
    }
}

#[test]
fn refresh_publishes_complete_snapshot() {
    let h = Harness::new();
    let report = h.coordinator.refresh().unwrap();
    assert_eq!(report, RefreshReport::Published { generation: 1, attempts: 1 });

    let snap = h.coordinator.current().unwrap();
    assert!(snap.is_consistent());
    assert_eq!(snap.counties.len(), 3);
    assert_eq!(snap.states.len(), 3);
    assert_eq!(snap.economic.len(), 4);
    // Illinois is missing 2020-03-03; its 03-02 total carries over.
    assert_eq!(snap.national.cases(), &[30, 47, 67, 97, 136, 179, 224]);
    // Employment level arrives in thousands.
    assert_eq!(snap.economic("LNU02000000").unwrap().values()[0], 157_000_000.0);
    // UNRATE's "." observation is dropped.
    assert_eq!(snap.economic("UNRATE").unwrap().len(), 2);
}

#[test]
fn ranking_promotes_pins() {
    let h = Harness::new();
    let facade = h.facade();
    let pins = h.config.pinned(RegionKind::County).unwrap();

    let counties = facade.ranked_regions(RegionKind::County, &pins).unwrap();
    assert_eq!(
        counties,
        vec![
            RegionKey::county("Santa Clara", "California"),
            RegionKey::county("King", "Washington"),
            RegionKey::county("Cook", "Illinois"),
        ]
    );

    let states = facade.ranked_regions(RegionKind::State, &[]).unwrap();
    assert_eq!(
        states,
        vec![
            RegionKey::state("Washington"),
            RegionKey::state("California"),
            RegionKey::state("Illinois"),
        ]
    );

    let shown = facade.display_order(RegionKind::State, &[], 1, 10).unwrap();
    let labels: Vec<&str> = shown.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(labels, vec!["Washington", "California", "Illinois"]);
    assert!(shown[0].highlighted && !shown[1].highlighted);
}

#[test]
fn series_queries_use_lazy_first_load() {
    let h = Harness::new();
    let facade = h.facade();
    assert_eq!(h.coordinator.state(), CoordinatorState::Empty);

    let king = RegionKey::county("King", "Washington");
    let plot = facade.series_for(&king, 5, false).unwrap();
    assert_eq!(h.coordinator.state(), CoordinatorState::Ready { generation: 1 });

    assert_eq!(plot.label, "King, Washington");
    assert_eq!(plot.x, PlotX::Cases(vec![52.0, 60.0]));
    assert_eq!(plot.y, vec![(52.0 - 10.0) / 5.0, (60.0 - 14.0) / 5.0]);

    let pct = facade.series_for(&king, 5, true).unwrap();
    assert!(matches!(pct.x, PlotX::Dates(ref d) if d.len() == 2));

    let national = facade.national_series(3, false).unwrap();
    assert_eq!(national.y.len(), 4);
}

#[test]
fn short_history_and_unknown_regions() {
    let h = Harness::new();
    let facade = h.facade();

    let err = facade
        .series_for(&RegionKey::state("Washington"), 30, false)
        .unwrap_err();
    assert!(err.is_insufficient_history());

    let err = facade
        .series_for(&RegionKey::state("Atlantis"), 5, false)
        .unwrap_err();
    assert!(matches!(err, QueryError::UnknownRegion(_)));
}

#[test]
fn economic_queries() {
    let h = Harness::new();
    let facade = h.facade();

    let claims = facade.economic("ICSA").unwrap();
    assert_eq!(claims.spec.title, "New Unemployment Claims");
    assert_eq!(claims.series.len(), 6);
    assert!(matches!(facade.economic("NOPE"), Err(QueryError::UnknownSource(_))));

    let fraction = facade.claims_fraction().unwrap();
    assert_eq!(fraction.dates.len(), 6);
    assert!(fraction.fraction.iter().all(|f| *f > 0.0 && *f < 1.0));

    let excess = facade.claims_excess(None).unwrap();
    assert_eq!(excess.baseline, NaiveDate::from_ymd_opt(2020, 3, 7).unwrap());
    assert_eq!(excess.excess, vec![0.0, 71_000.0, 3_167_000.0, 9_823_000.0]);
    assert_eq!(excess.fraction[1], 71_000.0 / h.config.workforce_size);

    let far = NaiveDate::from_ymd_opt(2019, 6, 1).unwrap();
    assert!(matches!(facade.claims_excess(Some(far)), Err(QueryError::Series(_))));

    assert_eq!(facade.causes_of_death().len(), 11);
}

#[test]
fn failed_pull_with_checkout_is_tolerated() {
    let h = Harness::new();
    h.coordinator.refresh().unwrap();

    h.repo.fail_pulls.store(true, Ordering::SeqCst);
    // Pull fails, reclone succeeds, second pull fails: sync errors but the
    // fresh checkout has both files.
    let report = h.coordinator.refresh().unwrap();
    assert_eq!(report, RefreshReport::Published { generation: 2, attempts: 1 });
}

#[test]
fn network_outage_publishes_from_existing_checkout() {
    let h = Harness::new();
    h.coordinator.refresh().unwrap();
    let clones_before = h.repo.clones.load(Ordering::SeqCst);

    // Pull and clone both fail; the economic cache is still fresh.
    h.repo.fail_pulls.store(true, Ordering::SeqCst);
    h.repo.fail_clones.store(true, Ordering::SeqCst);

    let report = h.coordinator.refresh().unwrap();
    assert_eq!(report, RefreshReport::Published { generation: 2, attempts: 1 });
    assert_eq!(h.repo.clones.load(Ordering::SeqCst), clones_before);

    let checkout = h.config.checkout_dir();
    assert!(checkout.join("us-counties.csv").is_file());
    assert!(checkout.join("us-states.csv").is_file());

    let snap = h.coordinator.current().unwrap();
    assert_eq!(snap.national.cases(), &[30, 47, 67, 97, 136, 179, 224]);
}

#[test]
fn economic_outage_keeps_previous_snapshot() {
    let h = Harness::new();
    h.coordinator.refresh().unwrap();
    let before = h.coordinator.current().unwrap();
    let clones_before = h.repo.clones.load(Ordering::SeqCst);

    // Expire the economic cache so strict mode has to hit the network.
    let cache_dir = h.config.cache_dir();
    fs::remove_dir_all(&cache_dir).unwrap();
    h.network_down.store(true, Ordering::SeqCst);

    let err = h.coordinator.refresh().unwrap_err();
    match err {
        RefreshError::RetriesExhausted { attempts, first, last } => {
            assert_eq!(attempts, 2);
            assert!(matches!(first, DataError::SourceUnavailable { .. }));
            assert!(matches!(last, DataError::SourceUnavailable { .. }));
        }
        other => panic!("expected RetriesExhausted, got {other:?}"),
    }

    assert!(Arc::ptr_eq(&before, &h.coordinator.current().unwrap()));
    // The retry forced a destructive resync of the repository.
    assert_eq!(h.repo.clones.load(Ordering::SeqCst), clones_before + 1);

    h.network_down.store(false, Ordering::SeqCst);
    let report = h.coordinator.refresh().unwrap();
    assert_eq!(report, RefreshReport::Published { generation: 2, attempts: 1 });
}

#[test]
fn clone_failure_without_checkout_fails_refresh() {
    let h = Harness::new();
    h.repo.fail_clones.store(true, Ordering::SeqCst);

    assert!(matches!(
        h.coordinator.refresh(),
        Err(RefreshError::RetriesExhausted { .. })
    ));
    assert_eq!(h.coordinator.state(), CoordinatorState::Empty);
    assert!(matches!(
        h.facade().series_for(&RegionKey::state("Washington"), 5, false),
        Err(QueryError::Refresh(_))
    ));
}

#[test]
fn economic_cache_written_with_sidecars() {
    let dir = tempfile::tempdir().unwrap();
    let config = DashboardConfig {
        data_dir: dir.path().to_path_buf(),
        ..DashboardConfig::default()
    };
    let down = Arc::new(AtomicBool::new(false));
    let pipeline =
        DashboardPipeline::from_config(&config, Arc::new(FixtureRepo::default()), |spec| {
            Ok(Arc::new(FixtureSource {
                code: spec.code.clone(),
                down: Arc::clone(&down),
            }) as Arc<dyn RemoteSource>)
        })
        .unwrap();
    let pipeline = Arc::new(pipeline);
    assert!(pipeline.economic_status().iter().all(|s| !s.cached));

    let coordinator = RefreshCoordinator::new(pipeline.clone(), RetryPolicy::immediate());
    coordinator.refresh().unwrap();

    let status = pipeline.economic_status();
    assert_eq!(status.len(), 4);
    assert!(status.iter().all(|s| s.cached && s.fresh));
    assert!(config.cache_dir().join("ICSA.csv").is_file());
    assert!(config.cache_dir().join("ICSA.meta.json").is_file());
}
