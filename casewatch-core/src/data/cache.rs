//! On-disk payload cache, one file per remote source.
//!
//! Layout: `{cache_dir}/{SOURCE}.csv` plus `{cache_dir}/{SOURCE}.meta.json`
//!
//! Features:
//! - Freshness from the payload's modification time (no clock stored in-band)
//! - Atomic writes (write to .tmp, rename into place)
//! - Per-source lock held across write + rename, and across reads
//! - Metadata sidecar per source (hash, size, fetch time)

use super::provider::DataError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime};

/// Metadata sidecar for a cached payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayloadMeta {
    pub source_id: String,
    pub byte_count: usize,
    pub data_hash: String,
    pub fetched_at: DateTime<Utc>,
}

/// The payload cache.
pub struct PayloadCache {
    cache_dir: PathBuf,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl PayloadCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Root directory of the cache.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Path to the payload for a source: `{cache_dir}/{SOURCE}.csv`
    pub fn payload_path(&self, source_id: &str) -> PathBuf {
        self.cache_dir.join(format!("{source_id}.csv"))
    }

    fn meta_path(&self, source_id: &str) -> PathBuf {
        self.cache_dir.join(format!("{source_id}.meta.json"))
    }

    /// The lock guarding one source's files. Created on first use.
    fn source_lock(&self, source_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks
            .entry(source_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Age of the cached payload, `None` if nothing is cached.
    ///
    /// A modification time in the future counts as age zero.
    pub fn age(&self, source_id: &str) -> Option<Duration> {
        let mtime = fs::metadata(self.payload_path(source_id))
            .and_then(|m| m.modified())
            .ok()?;
        Some(
            SystemTime::now()
                .duration_since(mtime)
                .unwrap_or(Duration::ZERO),
        )
    }

    /// A payload is fresh while its age is at most `expiry`. A zero expiry
    /// makes every payload stale.
    pub fn is_fresh(&self, source_id: &str, expiry: Duration) -> bool {
        self.age(source_id).is_some_and(|age| within_expiry(age, expiry))
    }

    /// Persist a payload for a source.
    ///
    /// The source lock is held from the temp write through the rename and
    /// the sidecar write, so concurrent readers never see a partial file.
    pub fn write(&self, source_id: &str, bytes: &[u8]) -> Result<(), DataError> {
        let lock = self.source_lock(source_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        fs::create_dir_all(&self.cache_dir)
            .map_err(|e| DataError::CacheError(format!("failed to create dir: {e}")))?;

        let path = self.payload_path(source_id);
        let tmp_path = path.with_extension("csv.tmp");
        fs::write(&tmp_path, bytes)
            .map_err(|e| DataError::CacheError(format!("write {}: {e}", tmp_path.display())))?;

        // Atomic rename
        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            DataError::CacheError(format!("atomic rename failed: {e}"))
        })?;

        let meta = PayloadMeta {
            source_id: source_id.to_string(),
            byte_count: bytes.len(),
            data_hash: blake3::hash(bytes).to_hex().to_string(),
            fetched_at: Utc::now(),
        };
        let meta_json = serde_json::to_string_pretty(&meta)
            .map_err(|e| DataError::CacheError(format!("meta serialization: {e}")))?;
        fs::write(self.meta_path(source_id), meta_json)
            .map_err(|e| DataError::CacheError(format!("meta write: {e}")))?;

        Ok(())
    }

    /// Read the cached payload for a source.
    pub fn read(&self, source_id: &str) -> Result<Vec<u8>, DataError> {
        let lock = self.source_lock(source_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let path = self.payload_path(source_id);
        fs::read(&path).map_err(|e| {
            DataError::CacheError(format!("no cached payload for '{source_id}': {e}"))
        })
    }

    /// Metadata sidecar for a source, if present and readable.
    pub fn get_meta(&self, source_id: &str) -> Option<PayloadMeta> {
        let content = fs::read_to_string(self.meta_path(source_id)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Cache presence and freshness for a set of sources.
    pub fn status(&self, source_ids: &[&str], expiry: Duration) -> Vec<CacheStatus> {
        source_ids
            .iter()
            .map(|id| {
                let age = self.age(id);
                CacheStatus {
                    source_id: id.to_string(),
                    cached: age.is_some(),
                    age_secs: age.map(|a| a.as_secs()),
                    fresh: age.is_some_and(|a| within_expiry(a, expiry)),
                    byte_count: self.get_meta(id).map(|m| m.byte_count),
                }
            })
            .collect()
    }
}

fn within_expiry(age: Duration, expiry: Duration) -> bool {
    !expiry.is_zero() && age <= expiry
}

/// Cache status for a single source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStatus {
    pub source_id: String,
    pub cached: bool,
    pub age_secs: Option<u64>,
    pub fresh: bool,
    pub byte_count: Option<usize>,
}
