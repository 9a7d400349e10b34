//! One complete, immutable copy of every normalized dataset.

use super::region::{RegionKey, RegionKind};
use super::series::{CaseSeries, EconomicSeries};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Everything one refresh cycle produces.
///
/// Built wholesale, then handed to the coordinator which stamps `generation`
/// and publishes it behind an `Arc`. Nothing mutates a snapshot after that.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub counties: BTreeMap<RegionKey, CaseSeries>,
    pub states: BTreeMap<RegionKey, CaseSeries>,
    pub national: CaseSeries,
    /// Economic series keyed by source code (e.g. `ICSA`).
    pub economic: BTreeMap<String, EconomicSeries>,
    /// BLAKE3 over the case data, for "did anything change" checks.
    pub fingerprint: String,
    pub built_at: DateTime<Utc>,
    /// Publish counter, 0 until the coordinator publishes the snapshot.
    pub generation: u64,
}

impl Snapshot {
    pub fn new(
        counties: BTreeMap<RegionKey, CaseSeries>,
        states: BTreeMap<RegionKey, CaseSeries>,
        national: CaseSeries,
        economic: BTreeMap<String, EconomicSeries>,
    ) -> Self {
        let fingerprint = fingerprint_cases(&counties, &states);
        Self {
            counties,
            states,
            national,
            economic,
            fingerprint,
            built_at: Utc::now(),
            generation: 0,
        }
    }

    pub fn regions(&self, kind: RegionKind) -> &BTreeMap<RegionKey, CaseSeries> {
        match kind {
            RegionKind::County => &self.counties,
            RegionKind::State => &self.states,
        }
    }

    /// Look up a region in the map matching its kind.
    pub fn series(&self, key: &RegionKey) -> Option<&CaseSeries> {
        self.regions(key.kind()).get(key)
    }

    pub fn economic(&self, code: &str) -> Option<&EconomicSeries> {
        self.economic.get(code)
    }

    /// Latest date present anywhere in the national series.
    pub fn as_of(&self) -> Option<chrono::NaiveDate> {
        self.national.dates().last().copied()
    }

    /// Every case series in the snapshot has aligned columns.
    pub fn is_consistent(&self) -> bool {
        self.national.is_aligned()
            && self.counties.values().all(CaseSeries::is_aligned)
            && self.states.values().all(CaseSeries::is_aligned)
    }
}

/// Deterministic BLAKE3 hash over both region maps.
///
/// `BTreeMap` iteration is ordered, so the hash does not depend on insertion
/// order.
pub fn fingerprint_cases(
    counties: &BTreeMap<RegionKey, CaseSeries>,
    states: &BTreeMap<RegionKey, CaseSeries>,
) -> String {
    let mut hasher = blake3::Hasher::new();
    for (key, series) in counties.iter().chain(states.iter()) {
        hasher.update(key.to_string().as_bytes());
        for p in series.points() {
            hasher.update(p.date.to_string().as_bytes());
            hasher.update(&p.cases.to_le_bytes());
            hasher.update(&p.deaths.to_le_bytes());
        }
    }
    hasher.finalize().to_hex().to_string()
}
