//! Map key for county and state series.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier for a county or a state.
///
/// Equality and ordering are exact string comparison. No canonicalization is
/// applied: "New York City" and "New York" are different counties.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RegionKey {
    County { county: String, state: String },
    State { state: String },
}

impl RegionKey {
    pub fn county(county: impl Into<String>, state: impl Into<String>) -> Self {
        Self::County {
            county: county.into(),
            state: state.into(),
        }
    }

    pub fn state(state: impl Into<String>) -> Self {
        Self::State {
            state: state.into(),
        }
    }

    pub fn kind(&self) -> RegionKind {
        match self {
            Self::County { .. } => RegionKind::County,
            Self::State { .. } => RegionKind::State,
        }
    }

    /// State name, present for both kinds.
    pub fn state_name(&self) -> &str {
        match self {
            Self::County { state, .. } | Self::State { state } => state,
        }
    }

    /// Parse `"County, State"` or `"State"`.
    ///
    /// Splits on the last comma so county names containing commas survive.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        match text.rsplit_once(',') {
            Some((county, state)) => {
                let (county, state) = (county.trim(), state.trim());
                if county.is_empty() || state.is_empty() {
                    None
                } else {
                    Some(Self::county(county, state))
                }
            }
            None => Some(Self::state(text)),
        }
    }
}

impl fmt::Display for RegionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::County { county, state } => write!(f, "{county}, {state}"),
            Self::State { state } => write!(f, "{state}"),
        }
    }
}

/// Which map of the snapshot a region lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionKind {
    County,
    State,
}
