//! Refresh coordinator: owns the published snapshot.
//!
//! States: `Empty → Refreshing → Ready → Refreshing → Ready …`
//!
//! - One cycle runs at a time (`refresh_lock`). A caller that has to wait for
//!   an in-flight cycle returns `Coalesced` instead of running another one.
//! - A failed load backs off for a random interval, forces a resync and
//!   retries the whole cycle. When every attempt fails the previous snapshot
//!   (or `Empty`) stays published.
//! - Publishing swaps one `Arc` under a write lock. Readers holding an older
//!   `Arc` keep a consistent snapshot for as long as they like.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread;
use std::time::Duration;

use casewatch_core::data::DataError;
use casewatch_core::domain::Snapshot;
use rand::Rng;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::RetryConfig;
use crate::pipeline::SnapshotSource;

/// Errors from a refresh cycle.
#[derive(Debug, Error)]
pub enum RefreshError {
    /// The single attempt failed and no retries are configured.
    #[error("refresh failed: {0}")]
    Failed(#[source] DataError),

    /// Every attempt failed. `first` is the original failure, `last` the
    /// failure of the final retry.
    #[error("refresh failed after {attempts} attempts (first: {first}; last: {last})")]
    RetriesExhausted {
        attempts: u32,
        first: DataError,
        #[source]
        last: DataError,
    },

    /// A lazy first load completed without producing a snapshot.
    #[error("no snapshot available")]
    NoSnapshot,
}

/// Observable coordinator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CoordinatorState {
    Empty,
    Refreshing,
    Ready { generation: u64 },
}

/// Outcome of a successful `refresh()` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RefreshReport {
    /// This call ran a cycle and published `generation`. `attempts > 1` means
    /// it recovered after at least one resync.
    Published { generation: u64, attempts: u32 },
    /// Another caller's cycle completed while this one waited.
    Coalesced,
}

/// Backoff and retry bounds after a failed load.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub backoff_min: Duration,
    pub backoff_max: Duration,
    pub retries: u32,
}

impl RetryPolicy {
    /// One retry, no sleeping. For tests and one-shot tools.
    pub fn immediate() -> Self {
        Self {
            backoff_min: Duration::ZERO,
            backoff_max: Duration::ZERO,
            retries: 1,
        }
    }

    /// Uniform draw from `[backoff_min, backoff_max]`.
    pub fn draw_backoff<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.backoff_max <= self.backoff_min {
            return self.backoff_min;
        }
        let secs = rng.gen_range(self.backoff_min.as_secs_f64()..=self.backoff_max.as_secs_f64());
        Duration::from_secs_f64(secs)
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            backoff_min: secs(config.backoff_min_secs),
            backoff_max: secs(config.backoff_max_secs),
            retries: config.retries,
        }
    }
}

/// Negative or non-finite seconds (rejected by config validation) become zero.
fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

/// Marks a cycle as running for as long as it is alive. Dropping it, also
/// while unwinding from a panicking source, clears `refreshing` and counts
/// the cycle as completed.
struct CycleGuard<'a> {
    coordinator: &'a RefreshCoordinator,
}

impl<'a> CycleGuard<'a> {
    fn enter(coordinator: &'a RefreshCoordinator) -> Self {
        coordinator.refreshing.store(true, Ordering::SeqCst);
        Self { coordinator }
    }
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.coordinator.refreshing.store(false, Ordering::SeqCst);
        self.coordinator.completed_cycles.fetch_add(1, Ordering::SeqCst);
    }
}

/// Owns the current snapshot and serializes refresh cycles.
pub struct RefreshCoordinator {
    source: Arc<dyn SnapshotSource>,
    policy: RetryPolicy,
    current: RwLock<Option<Arc<Snapshot>>>,
    refresh_lock: Mutex<()>,
    refreshing: AtomicBool,
    completed_cycles: AtomicU64,
}

impl RefreshCoordinator {
    pub fn new(source: Arc<dyn SnapshotSource>, policy: RetryPolicy) -> Self {
        Self {
            source,
            policy,
            current: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            refreshing: AtomicBool::new(false),
            completed_cycles: AtomicU64::new(0),
        }
    }

    /// The published snapshot, if any. Never blocks on a running refresh.
    pub fn current(&self) -> Option<Arc<Snapshot>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn state(&self) -> CoordinatorState {
        if self.refreshing.load(Ordering::SeqCst) {
            return CoordinatorState::Refreshing;
        }
        match self.current() {
            Some(snapshot) => CoordinatorState::Ready {
                generation: snapshot.generation,
            },
            None => CoordinatorState::Empty,
        }
    }

    /// Cycles finished so far, successful or not.
    pub fn completed_cycles(&self) -> u64 {
        self.completed_cycles.load(Ordering::SeqCst)
    }

    /// Run one refresh cycle, or wait for the one already in flight.
    pub fn refresh(&self) -> Result<RefreshReport, RefreshError> {
        let observed = self.completed_cycles.load(Ordering::SeqCst);
        let _guard = self
            .refresh_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if self.completed_cycles.load(Ordering::SeqCst) != observed {
            debug!("refresh coalesced with a cycle that completed while waiting");
            return Ok(RefreshReport::Coalesced);
        }

        let _cycle = CycleGuard::enter(self);
        self.run_cycle()
    }

    /// The current snapshot, loading it synchronously on first use.
    pub fn snapshot_or_refresh(&self) -> Result<Arc<Snapshot>, RefreshError> {
        if let Some(snapshot) = self.current() {
            return Ok(snapshot);
        }
        info!("no snapshot yet, running first load");
        self.refresh()?;
        self.current().ok_or(RefreshError::NoSnapshot)
    }

    fn run_cycle(&self) -> Result<RefreshReport, RefreshError> {
        let first = match self.source.load() {
            Ok(snapshot) => return Ok(self.publish(snapshot, 1)),
            Err(e) => e,
        };
        warn!(error = %first, "refresh attempt failed");

        if self.policy.retries == 0 {
            return Err(RefreshError::Failed(first));
        }

        let mut last = None;
        for retry in 1..=self.policy.retries {
            let attempt = retry + 1;
            let backoff = self.policy.draw_backoff(&mut rand::thread_rng());
            info!(attempt, backoff_ms = backoff.as_millis() as u64, "backing off before resync");
            thread::sleep(backoff);

            let outcome = self.source.resync().and_then(|()| self.source.load());
            match outcome {
                Ok(snapshot) => return Ok(self.publish(snapshot, attempt)),
                Err(e) => {
                    warn!(attempt, error = %e, "retry after resync failed");
                    last = Some(e);
                }
            }
        }

        let attempts = self.policy.retries + 1;
        match last {
            Some(last) => {
                warn!(attempts, "refresh gave up, keeping previous snapshot");
                Err(RefreshError::RetriesExhausted {
                    attempts,
                    first,
                    last,
                })
            }
            None => Err(RefreshError::Failed(first)),
        }
    }

    fn publish(&self, mut snapshot: Snapshot, attempts: u32) -> RefreshReport {
        let (generation, changed) = {
            let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
            let previous = current.as_deref();
            let generation = previous.map_or(0, |s| s.generation) + 1;
            let changed = previous.map_or(true, |s| s.fingerprint != snapshot.fingerprint);
            snapshot.generation = generation;
            *current = Some(Arc::new(snapshot));
            (generation, changed)
        };
        info!(generation, attempts, changed, "snapshot published");
        RefreshReport::Published {
            generation,
            attempts,
        }
    }
}
