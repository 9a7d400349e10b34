//! Remote source trait and structured error types.
//!
//! The RemoteSource trait abstracts over upstream endpoints (FRED CSV over
//! HTTP today) so the fetcher can be exercised against in-process fakes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("source '{source_id}' unavailable: {reason}")]
    SourceUnavailable { source_id: String, reason: String },

    #[error("unknown source '{0}'")]
    UnknownSource(String),

    #[error("cache error: {0}")]
    CacheError(String),

    #[error("parse error in {file} at row {row}: {reason}")]
    Parse {
        file: String,
        row: usize,
        reason: String,
    },

    #[error("missing dataset file: {0}")]
    MissingFile(String),
}

impl DataError {
    pub fn unavailable(source_id: impl Into<String>, reason: impl ToString) -> Self {
        Self::SourceUnavailable {
            source_id: source_id.into(),
            reason: reason.to_string(),
        }
    }
}

/// Whether a stale cache may stand in for a failed network fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchMode {
    /// Network failure is an error even when a stale payload exists.
    Strict,
    /// Network failure falls back to a stale payload when one exists.
    BestEffort,
}

/// Where a returned payload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayloadOrigin {
    /// Cache was within its expiry window; no network access happened.
    FreshCache,
    /// Retrieved from the network and written to the cache.
    Network,
    /// Network failed; stale cache returned in best-effort mode.
    StaleCache,
}

/// Result of a successful fetch for a single source.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub source_id: String,
    pub bytes: Vec<u8>,
    pub origin: PayloadOrigin,
}

/// An upstream endpoint that returns one raw payload.
///
/// Implementations only talk to the network; the cache layer sits above this
/// trait.
pub trait RemoteSource: Send + Sync {
    /// Stable identifier, also used as the cache file stem.
    fn id(&self) -> &str;

    /// Retrieve the full payload.
    fn retrieve(&self) -> Result<Vec<u8>, DataError>;
}
