//! Expiry-aware source retrieval on top of the payload cache.
//!
//! Resolution order for `fetch(id, mode)`:
//! 1. Cached payload younger than the source's expiry → return it, no network
//! 2. Otherwise retrieve from the network, persist, return
//! 3. Network failed and mode is best-effort → return the stale payload
//! 4. Otherwise → `SourceUnavailable`

use super::cache::PayloadCache;
use super::provider::{DataError, FetchMode, FetchResult, PayloadOrigin, RemoteSource};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

struct RegisteredSource {
    source: Arc<dyn RemoteSource>,
    expiry: Duration,
}

/// Fetches raw payloads for registered sources, honoring per-source expiry.
pub struct SourceFetcher {
    cache: PayloadCache,
    sources: BTreeMap<String, RegisteredSource>,
}

impl SourceFetcher {
    pub fn new(cache: PayloadCache) -> Self {
        Self {
            cache,
            sources: BTreeMap::new(),
        }
    }

    /// Register a source under its own id. A later registration with the
    /// same id replaces the earlier one.
    pub fn register(&mut self, source: Arc<dyn RemoteSource>, expiry: Duration) {
        self.sources
            .insert(source.id().to_string(), RegisteredSource { source, expiry });
    }

    pub fn with_source(mut self, source: Arc<dyn RemoteSource>, expiry: Duration) -> Self {
        self.register(source, expiry);
        self
    }

    pub fn cache(&self) -> &PayloadCache {
        &self.cache
    }

    pub fn source_ids(&self) -> Vec<&str> {
        self.sources.keys().map(String::as_str).collect()
    }

    pub fn expiry(&self, source_id: &str) -> Option<Duration> {
        self.sources.get(source_id).map(|s| s.expiry)
    }

    /// Fetch the payload for one source.
    pub fn fetch(&self, source_id: &str, mode: FetchMode) -> Result<FetchResult, DataError> {
        let registered = self
            .sources
            .get(source_id)
            .ok_or_else(|| DataError::UnknownSource(source_id.to_string()))?;

        if self.cache.is_fresh(source_id, registered.expiry) {
            match self.cache.read(source_id) {
                Ok(bytes) => {
                    debug!(source = source_id, bytes = bytes.len(), "cache hit");
                    return Ok(FetchResult {
                        source_id: source_id.to_string(),
                        bytes,
                        origin: PayloadOrigin::FreshCache,
                    });
                }
                Err(e) => warn!(source = source_id, error = %e, "fresh cache unreadable, refetching"),
            }
        }

        match registered.source.retrieve() {
            Ok(bytes) => {
                self.cache.write(source_id, &bytes)?;
                info!(source = source_id, bytes = bytes.len(), "fetched from network");
                Ok(FetchResult {
                    source_id: source_id.to_string(),
                    bytes,
                    origin: PayloadOrigin::Network,
                })
            }
            Err(err) => {
                if mode == FetchMode::BestEffort {
                    if let Ok(bytes) = self.cache.read(source_id) {
                        warn!(source = source_id, error = %err, "network failed, serving stale cache");
                        return Ok(FetchResult {
                            source_id: source_id.to_string(),
                            bytes,
                            origin: PayloadOrigin::StaleCache,
                        });
                    }
                }
                Err(match err {
                    e @ DataError::SourceUnavailable { .. } => e,
                    other => DataError::unavailable(source_id, other),
                })
            }
        }
    }
}
