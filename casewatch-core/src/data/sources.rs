//! Economic source table.
//!
//! One typed record per source instead of string-keyed dictionaries. The
//! runner's configuration deserializes a list of these and validates it at
//! startup.

use serde::{Deserialize, Serialize};

/// Transformation applied once to every value at ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValueTransform {
    #[default]
    Identity,
    /// Multiply by a constant (e.g. thousands of persons → persons).
    Scale { factor: f64 },
}

impl ValueTransform {
    pub fn apply(&self, value: f64) -> f64 {
        match self {
            Self::Identity => value,
            Self::Scale { factor } => value * factor,
        }
    }
}

/// One economic time-series source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EconomicSourceSpec {
    /// Short source code, used as id, cache file stem and snapshot key.
    pub code: String,
    pub title: String,
    #[serde(default = "default_x_label")]
    pub x_label: String,
    pub y_label: String,
    #[serde(default)]
    pub transform: ValueTransform,
}

fn default_x_label() -> String {
    "Date".to_string()
}

/// Initial weekly unemployment insurance claims.
pub const NEW_CLAIMS: &str = "ICSA";
/// Continued weekly claims.
pub const CONTINUING_CLAIMS: &str = "CCSA";
/// Employment level, published in thousands of persons.
pub const EMPLOYMENT_LEVEL: &str = "LNU02000000";
/// Unemployment rate, percent.
pub const UNEMPLOYMENT_RATE: &str = "UNRATE";

impl EconomicSourceSpec {
    pub fn new(code: &str, title: &str, y_label: &str) -> Self {
        Self {
            code: code.to_string(),
            title: title.to_string(),
            x_label: default_x_label(),
            y_label: y_label.to_string(),
            transform: ValueTransform::Identity,
        }
    }

    pub fn with_transform(mut self, transform: ValueTransform) -> Self {
        self.transform = transform;
        self
    }

    /// The four labor-market series the dashboard charts.
    pub fn default_table() -> Vec<Self> {
        vec![
            Self::new(NEW_CLAIMS, "New Unemployment Claims", "Claims per week"),
            Self::new(CONTINUING_CLAIMS, "Continuing Unemployment Claims", "Claims"),
            Self::new(EMPLOYMENT_LEVEL, "Employment Level", "Persons employed")
                .with_transform(ValueTransform::Scale { factor: 1000.0 }),
            Self::new(UNEMPLOYMENT_RATE, "Unemployment Rate", "Percent"),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_transform() {
        assert_eq!(ValueTransform::Scale { factor: 1000.0 }.apply(1.5), 1500.0);
        assert_eq!(ValueTransform::Identity.apply(1.5), 1.5);
    }

    #[test]
    fn default_table_scales_employment_level() {
        let table = EconomicSourceSpec::default_table();
        assert_eq!(table.len(), 4);
        let level = table.iter().find(|s| s.code == EMPLOYMENT_LEVEL).unwrap();
        assert_eq!(level.transform, ValueTransform::Scale { factor: 1000.0 });
        assert!(table
            .iter()
            .filter(|s| s.code != EMPLOYMENT_LEVEL)
            .all(|s| s.transform == ValueTransform::Identity));
    }

    #[test]
    fn transform_deserializes_from_tagged_table() {
        let spec: EconomicSourceSpec = serde_json::from_str(
            r#"{"code":"X","title":"T","y_label":"Y","transform":{"kind":"scale","factor":2.0}}"#,
        )
        .unwrap();
        assert_eq!(spec.transform, ValueTransform::Scale { factor: 2.0 });
        assert_eq!(spec.x_label, "Date");
    }
}
