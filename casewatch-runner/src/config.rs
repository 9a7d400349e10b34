//! Serializable dashboard configuration.
//!
//! Every field has a default, so an empty TOML file is a valid config.
//! `validate()` is called once at startup; nothing downstream re-checks.

use casewatch_core::data::EconomicSourceSpec;
use casewatch_core::data::ValueTransform;
use casewatch_core::domain::{RegionKey, RegionKind};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors from loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("economic source with empty code")]
    EmptySourceCode,

    #[error("economic source '{0}' configured more than once")]
    DuplicateSource(String),

    #[error("economic source '{code}' has invalid scale factor {factor}")]
    InvalidScale { code: String, factor: f64 },

    #[error("workforce size must be finite and positive, got {0}")]
    InvalidWorkforce(f64),

    #[error("maximum baseline gap must be non-negative, got {0} days")]
    InvalidBaselineGap(i64),

    #[error("refresh interval must be positive")]
    ZeroInterval,

    #[error("invalid retry backoff range {min}s..{max}s")]
    InvalidBackoff { min: f64, max: f64 },

    #[error("rolling window must be at least 1")]
    ZeroWindow,

    #[error("pinned region '{0}' is not \"County, State\" or \"State\"")]
    InvalidPinnedRegion(String),
}

/// Top-level configuration for the refresh pipeline and the dashboard queries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DashboardConfig {
    /// Root for the payload cache and the repository checkout.
    pub data_dir: PathBuf,

    /// Seconds between scheduled refresh cycles.
    pub refresh_interval_secs: u64,

    pub repo: RepoConfig,

    pub retry: RetryConfig,

    /// Economic payloads younger than this are served from the cache.
    pub economic_expiry_secs: u64,

    /// Economic sources, fetched in strict mode on every cycle.
    pub sources: Vec<EconomicSourceSpec>,

    /// Denominator for excess-claims fractions.
    pub workforce_size: f64,

    /// Default baseline date for cumulative excess claims.
    pub claims_baseline: NaiveDate,

    /// Reject a baseline lookup whose nearest date is further away than this.
    pub max_baseline_gap_days: Option<i64>,

    /// Counties promoted to the head of the county ranking ("County, State").
    pub pinned_counties: Vec<String>,

    /// States promoted to the head of the state ranking.
    pub pinned_states: Vec<String>,

    /// Rolling window width in days.
    pub window: usize,

    /// Entries shown in rank order before the alphabetized remainder.
    pub top_n: usize,

    /// Maximum counties listed at all.
    pub county_limit: usize,
}

/// Location of the county/state case repository.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RepoConfig {
    pub url: String,
    /// Checkout directory, relative to `data_dir` unless absolute.
    pub checkout_dir: PathBuf,
    pub counties_file: String,
    pub states_file: String,
}

/// Backoff window and retry count after a failed refresh.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    pub backoff_min_secs: f64,
    pub backoff_max_secs: f64,
    /// Full-cycle retries after the first failure, each preceded by a resync.
    pub retries: u32,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            refresh_interval_secs: 60 * 60,
            repo: RepoConfig::default(),
            retry: RetryConfig::default(),
            economic_expiry_secs: 24 * 60 * 60,
            sources: EconomicSourceSpec::default_table(),
            workforce_size: 164_500_000.0,
            claims_baseline: NaiveDate::from_ymd_opt(2020, 3, 7).unwrap_or_default(),
            max_baseline_gap_days: Some(14),
            pinned_counties: Vec::new(),
            pinned_states: Vec::new(),
            window: 5,
            top_n: 10,
            county_limit: 200,
        }
    }
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            url: "https://github.com/nytimes/covid-19-data.git".to_string(),
            checkout_dir: PathBuf::from("covid-19-data"),
            counties_file: "us-counties.csv".to_string(),
            states_file: "us-states.csv".to_string(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            backoff_min_secs: 5.0,
            backoff_max_secs: 15.0,
            retries: 1,
        }
    }
}

impl DashboardConfig {
    /// Load and validate a configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for spec in &self.sources {
            if spec.code.trim().is_empty() {
                return Err(ConfigError::EmptySourceCode);
            }
            if !seen.insert(spec.code.as_str()) {
                return Err(ConfigError::DuplicateSource(spec.code.clone()));
            }
            if let ValueTransform::Scale { factor } = spec.transform {
                if !factor.is_finite() || factor == 0.0 {
                    return Err(ConfigError::InvalidScale {
                        code: spec.code.clone(),
                        factor,
                    });
                }
            }
        }

        if !self.workforce_size.is_finite() || self.workforce_size <= 0.0 {
            return Err(ConfigError::InvalidWorkforce(self.workforce_size));
        }
        if let Some(gap) = self.max_baseline_gap_days.filter(|g| *g < 0) {
            return Err(ConfigError::InvalidBaselineGap(gap));
        }

        if self.refresh_interval_secs == 0 {
            return Err(ConfigError::ZeroInterval);
        }

        let (min, max) = (self.retry.backoff_min_secs, self.retry.backoff_max_secs);
        if !min.is_finite() || !max.is_finite() || min < 0.0 || min > max {
            return Err(ConfigError::InvalidBackoff { min, max });
        }

        if self.window == 0 {
            return Err(ConfigError::ZeroWindow);
        }

        self.pinned(RegionKind::County)?;
        self.pinned(RegionKind::State)?;
        Ok(())
    }

    /// Pinned regions of one kind, parsed into keys in configured order.
    pub fn pinned(&self, kind: RegionKind) -> Result<Vec<RegionKey>, ConfigError> {
        let raw = match kind {
            RegionKind::County => &self.pinned_counties,
            RegionKind::State => &self.pinned_states,
        };
        raw.iter()
            .map(|text| {
                RegionKey::parse(text)
                    .filter(|key| key.kind() == kind)
                    .ok_or_else(|| ConfigError::InvalidPinnedRegion(text.clone()))
            })
            .collect()
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.data_dir.join("cache")
    }

    pub fn checkout_dir(&self) -> PathBuf {
        self.data_dir.join(&self.repo.checkout_dir)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn economic_expiry(&self) -> Duration {
        Duration::from_secs(self.economic_expiry_secs)
    }

    /// Source spec for a code, if configured.
    pub fn source(&self, code: &str) -> Option<&EconomicSourceSpec> {
        self.sources.iter().find(|s| s.code == code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_is_default() {
        let config = DashboardConfig::from_toml("").unwrap();
        assert_eq!(config, DashboardConfig::default());
        assert_eq!(config.sources.len(), 4);
        assert_eq!(config.refresh_interval(), Duration::from_secs(3600));
        assert_eq!(config.economic_expiry(), Duration::from_secs(86_400));
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let config = DashboardConfig::from_toml(
            r#"
            data_dir = "/var/lib/casewatch"
            window = 7
            pinned_counties = ["Santa Clara, California"]

            [retry]
            backoff_max_secs = 30.0
            "#,
        )
        .unwrap();

        assert_eq!(config.window, 7);
        assert_eq!(config.retry.backoff_min_secs, 5.0);
        assert_eq!(config.retry.backoff_max_secs, 30.0);
        assert_eq!(config.checkout_dir(), PathBuf::from("/var/lib/casewatch/covid-19-data"));
        assert_eq!(
            config.pinned(RegionKind::County).unwrap(),
            vec![RegionKey::county("Santa Clara", "California")]
        );
    }

    #[test]
    fn test_source_table_from_toml() {
        let config = DashboardConfig::from_toml(
            r#"
            [[sources]]
            code = "ICSA"
            title = "New Claims"
            y_label = "Claims"

            [[sources]]
            code = "LNU02000000"
            title = "Employment Level"
            y_label = "Persons"
            transform = { kind = "scale", factor = 1000.0 }
            "#,
        )
        .unwrap();

        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.sources[0].x_label, "Date");
        assert_eq!(
            config.source("LNU02000000").unwrap().transform,
            ValueTransform::Scale { factor: 1000.0 }
        );
    }

    #[test]
    fn test_rejects_duplicate_codes() {
        let mut config = DashboardConfig::default();
        config.sources.push(config.sources[0].clone());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateSource(code)) if code == "ICSA"
        ));
    }

    #[test]
    fn test_rejects_empty_code() {
        let mut config = DashboardConfig::default();
        config.sources[1].code = "  ".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::EmptySourceCode)));
    }

    #[test]
    fn test_rejects_bad_scale_factors() {
        for factor in [0.0, f64::NAN, f64::INFINITY] {
            let mut config = DashboardConfig::default();
            config.sources[0].transform = ValueTransform::Scale { factor };
            assert!(matches!(
                config.validate(),
                Err(ConfigError::InvalidScale { .. })
            ));
        }
    }

    #[test]
    fn test_rejects_bad_workforce_size() {
        for size in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let mut config = DashboardConfig::default();
            config.workforce_size = size;
            assert!(matches!(
                config.validate(),
                Err(ConfigError::InvalidWorkforce(_))
            ));
        }
    }

    #[test]
    fn test_rejects_negative_baseline_gap() {
        let err = DashboardConfig::from_toml("max_baseline_gap_days = -3").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBaselineGap(-3)));

        let mut config = DashboardConfig::default();
        config.max_baseline_gap_days = Some(0);
        assert!(config.validate().is_ok());
        config.max_baseline_gap_days = None;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_interval_and_window() {
        let mut config = DashboardConfig::default();
        config.refresh_interval_secs = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroInterval)));

        let mut config = DashboardConfig::default();
        config.window = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroWindow)));
    }

    #[test]
    fn test_rejects_inverted_backoff() {
        let mut config = DashboardConfig::default();
        config.retry.backoff_min_secs = 20.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidBackoff { min, max }) if min == 20.0 && max == 15.0
        ));
    }

    #[test]
    fn test_rejects_pinned_state_in_county_list() {
        let mut config = DashboardConfig::default();
        config.pinned_counties = vec!["Texas".to_string()];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidPinnedRegion(text)) if text == "Texas"
        ));
    }

    #[test]
    fn test_from_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");
        match DashboardConfig::from_file(&path) {
            Err(ConfigError::Read { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected read error, got {other:?}"),
        }
    }
}
