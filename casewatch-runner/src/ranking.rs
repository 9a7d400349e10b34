//! Region ranking and display ordering.
//!
//! Ranking is by latest cumulative case count, descending, ties broken by key.
//! Pinned regions are promoted to the head in pin order; the rest keep their
//! rank order. A pin that names a region missing from the map is logged and
//! skipped.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashSet};

use casewatch_core::domain::{CaseSeries, RegionKey};
use serde::Serialize;
use tracing::warn;

/// One entry of a display list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedRegion {
    pub key: RegionKey,
    pub label: String,
    /// Shown by default; the rest are listed but hidden until selected.
    pub highlighted: bool,
}

/// Every key of `regions`, pinned entries first, then by descending latest
/// cumulative cases.
pub fn rank_regions(
    regions: &BTreeMap<RegionKey, CaseSeries>,
    priority: &[RegionKey],
) -> Vec<RegionKey> {
    // BTreeMap iterates in key order and the sort is stable, so ties stay
    // in ascending key order.
    let mut ranked: Vec<&RegionKey> = regions.keys().collect();
    ranked.sort_by_key(|key| Reverse(regions[*key].latest_cases()));

    let mut pinned: HashSet<&RegionKey> = HashSet::new();
    let mut out = Vec::with_capacity(ranked.len());
    for key in priority {
        if !regions.contains_key(key) {
            warn!(region = %key, "pinned region not in dataset (UnknownRegion), skipping");
            continue;
        }
        if pinned.insert(key) {
            out.push(key.clone());
        }
    }

    out.extend(ranked.into_iter().filter(|k| !pinned.contains(*k)).cloned());
    out
}

/// Truncate a ranking to `limit`, keep the first `top_n` in rank order and
/// alphabetize the remainder by label.
pub fn display_order(ranked: Vec<RegionKey>, top_n: usize, limit: usize) -> Vec<RankedRegion> {
    let mut entries: Vec<RankedRegion> = ranked
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(i, key)| RankedRegion {
            label: key.to_string(),
            key,
            highlighted: i < top_n,
        })
        .collect();

    let split = top_n.min(entries.len());
    entries[split..].sort_by(|a, b| a.label.cmp(&b.label));
    entries
}
