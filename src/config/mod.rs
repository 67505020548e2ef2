//! Site configuration
//!
//! Zones with planned capacities, the identity-to-zone assignment,
//! reconciliation thresholds and optional display metadata, loaded from
//! a YAML document:
//!
//! ```yaml
//! zones:
//!   lobby: { planned_capacity: 10, color: "#4A90E2" }
//!   floor_2: { planned_capacity: 25 }
//! assignments:
//!   floor_2: [T001, T002]
//! doors:
//!   1: "Main entrance"
//! thresholds:
//!   under_threshold: 0.6
//!   over_threshold: 1.5
//!   critical_deviation_threshold: 0.3
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Errors raised while loading or validating configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required key is absent
    #[error("missing required configuration key: {0}")]
    Missing(String),

    /// Keys are present but inconsistent
    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// A named functional area with a planned head count
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Zone {
    pub name: String,
    pub planned_capacity: u32,
    /// Display color, consumed only by renderers
    pub color: Option<String>,
}

impl Zone {
    pub fn new(name: impl Into<String>, planned_capacity: u32) -> Self {
        Self {
            name: name.into(),
            planned_capacity,
            color: None,
        }
    }
}

/// Fractions of planned capacity that drive reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
    /// Observed below `plan * under` is under-attended
    pub under: f64,
    /// Observed above `plan * over` is over-provisioned
    pub over: f64,
    /// Relative deviation above which a zone is critical
    pub critical_deviation: f64,
}

impl Thresholds {
    /// Validated thresholds: all positive and finite, `under < over`
    pub fn new(under: f64, over: f64, critical_deviation: f64) -> Result<Self, ConfigError> {
        for (name, value) in [
            ("under_threshold", under),
            ("over_threshold", over),
            ("critical_deviation_threshold", critical_deviation),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{} must be a positive number, got {}",
                    name, value
                )));
            }
        }
        if under >= over {
            return Err(ConfigError::Invalid(format!(
                "under_threshold ({}) must be lower than over_threshold ({})",
                under, over
            )));
        }
        Ok(Self {
            under,
            over,
            critical_deviation,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ConfigDocument {
    zones: Option<BTreeMap<String, ZoneDocument>>,
    assignments: Option<BTreeMap<String, Vec<String>>>,
    #[serde(default)]
    doors: BTreeMap<i64, String>,
    thresholds: Option<ThresholdsDocument>,
}

#[derive(Debug, Deserialize)]
struct ZoneDocument {
    planned_capacity: Option<u32>,
    color: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ThresholdsDocument {
    under_threshold: Option<f64>,
    over_threshold: Option<f64>,
    critical_deviation_threshold: Option<f64>,
}

/// Validated site configuration
#[derive(Debug, Clone, Serialize)]
pub struct SiteConfig {
    zones: Vec<Zone>,
    /// identity -> zone name
    assignments: BTreeMap<String, String>,
    doors: BTreeMap<i64, String>,
    thresholds: Thresholds,
}

impl SiteConfig {
    /// Build a configuration from parts
    ///
    /// `assignments` maps zone name -> identities. Each identity may belong
    /// to one zone only, and every zone named must be defined.
    pub fn new(
        zones: Vec<Zone>,
        assignments: BTreeMap<String, Vec<String>>,
        thresholds: Thresholds,
    ) -> Result<Self, ConfigError> {
        let mut zones = zones;
        zones.sort_by(|a, b| a.name.cmp(&b.name));
        if let Some(pair) = zones.windows(2).find(|w| w[0].name == w[1].name) {
            return Err(ConfigError::Invalid(format!("zone '{}' defined twice", pair[0].name)));
        }

        let mut by_identity = BTreeMap::new();
        for (zone, identities) in assignments {
            if !zones.iter().any(|z| z.name == zone) {
                return Err(ConfigError::Invalid(format!(
                    "assignment refers to unknown zone '{}'",
                    zone
                )));
            }
            for identity in identities {
                if let Some(previous) = by_identity.insert(identity.clone(), zone.clone()) {
                    if previous != zone {
                        return Err(ConfigError::Invalid(format!(
                            "identity '{}' assigned to both '{}' and '{}'",
                            identity, previous, zone
                        )));
                    }
                }
            }
        }

        Ok(Self {
            zones,
            assignments: by_identity,
            doors: BTreeMap::new(),
            thresholds,
        })
    }

    /// Attach door labels
    pub fn with_doors(mut self, doors: BTreeMap<i64, String>) -> Self {
        self.doors = doors;
        self
    }

    /// Parse and validate a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let doc: ConfigDocument = serde_yaml::from_str(yaml)?;

        let zone_docs = doc.zones.ok_or_else(|| ConfigError::Missing("zones".to_string()))?;
        let mut zones = Vec::with_capacity(zone_docs.len());
        for (name, zone) in zone_docs {
            let planned_capacity = zone
                .planned_capacity
                .ok_or_else(|| ConfigError::Missing(format!("zones.{}.planned_capacity", name)))?;
            zones.push(Zone {
                name,
                planned_capacity,
                color: zone.color,
            });
        }

        let assignments = doc
            .assignments
            .ok_or_else(|| ConfigError::Missing("assignments".to_string()))?;

        let t = doc
            .thresholds
            .ok_or_else(|| ConfigError::Missing("thresholds".to_string()))?;
        let required = |value: Option<f64>, key: &str| {
            value.ok_or_else(|| ConfigError::Missing(format!("thresholds.{}", key)))
        };
        let thresholds = Thresholds::new(
            required(t.under_threshold, "under_threshold")?,
            required(t.over_threshold, "over_threshold")?,
            required(t.critical_deviation_threshold, "critical_deviation_threshold")?,
        )?;

        let config = Self::new(zones, assignments, thresholds)?.with_doors(doc.doors);
        debug!(
            zones = config.zones.len(),
            identities = config.assignments.len(),
            "Configuration parsed"
        );
        Ok(config)
    }

    /// Load and validate a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml_str(&content)?;
        info!(path = %path.display(), zones = config.zones.len(), "Configuration loaded");
        Ok(config)
    }

    /// Zones ordered by name
    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn zone(&self, name: &str) -> Option<&Zone> {
        self.zones.iter().find(|z| z.name == name)
    }

    /// Zone an identity is assigned to, if any
    pub fn zone_of(&self, identity: &str) -> Option<&str> {
        self.assignments.get(identity).map(String::as_str)
    }

    /// All (identity, zone) pairs
    pub fn assignments(&self) -> impl Iterator<Item = (&str, &str)> {
        self.assignments.iter().map(|(i, z)| (i.as_str(), z.as_str()))
    }

    pub fn assigned_count(&self) -> usize {
        self.assignments.len()
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Label for a door, falling back to its number
    pub fn door_label(&self, door: i64) -> String {
        self.doors
            .get(&door)
            .cloned()
            .unwrap_or_else(|| format!("door {}", door))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"
zones:
  lobby: { planned_capacity: 10, color: "#4A90E2" }
  floor_2: { planned_capacity: 25 }
assignments:
  floor_2: [T001, T002]
  lobby: [T003]
doors:
  1: "Main entrance"
thresholds:
  under_threshold: 0.6
  over_threshold: 1.5
  critical_deviation_threshold: 0.3
"##;

    #[test]
    fn test_parse_sample() {
        let config = SiteConfig::from_yaml_str(SAMPLE).unwrap();

        assert_eq!(config.zones().len(), 2);
        assert_eq!(config.zones()[0].name, "floor_2");
        assert_eq!(config.zone("lobby").unwrap().color.as_deref(), Some("#4A90E2"));
        assert_eq!(config.zone_of("T002"), Some("floor_2"));
        assert_eq!(config.zone_of("T999"), None);
        assert_eq!(config.door_label(1), "Main entrance");
        assert_eq!(config.door_label(7), "door 7");
        assert_eq!(config.thresholds().over, 1.5);
    }

    #[test]
    fn test_missing_sections() {
        let err = SiteConfig::from_yaml_str("assignments: {}\n").unwrap_err();
        assert!(matches!(err, ConfigError::Missing(ref k) if k == "zones"));

        let yaml = "zones: {a: {planned_capacity: 1}}\nassignments: {}\n";
        let err = SiteConfig::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(ref k) if k == "thresholds"));

        let yaml = "zones: {a: {planned_capacity: 1}}\nassignments: {}\n\
                    thresholds: {under_threshold: 0.5, over_threshold: 1.2}\n";
        let err = SiteConfig::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(ref k) if k == "thresholds.critical_deviation_threshold"));
    }

    #[test]
    fn test_missing_capacity() {
        let yaml = "zones: {a: {color: red}}\nassignments: {}\n\
                    thresholds: {under_threshold: 0.5, over_threshold: 1.2, critical_deviation_threshold: 0.3}\n";
        let err = SiteConfig::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(ref k) if k == "zones.a.planned_capacity"));
    }

    #[test]
    fn test_threshold_validation() {
        assert!(Thresholds::new(0.6, 1.5, 0.3).is_ok());
        assert!(Thresholds::new(1.5, 0.6, 0.3).is_err());
        assert!(Thresholds::new(0.6, 0.6, 0.3).is_err());
        assert!(Thresholds::new(-0.1, 1.5, 0.3).is_err());
        assert!(Thresholds::new(0.6, 1.5, f64::NAN).is_err());
    }

    #[test]
    fn test_identity_in_two_zones_rejected() {
        let mut assignments = BTreeMap::new();
        assignments.insert("a".to_string(), vec!["T1".to_string()]);
        assignments.insert("b".to_string(), vec!["T1".to_string()]);

        let result = SiteConfig::new(
            vec![Zone::new("a", 1), Zone::new("b", 1)],
            assignments,
            Thresholds::new(0.6, 1.5, 0.3).unwrap(),
        );
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_unknown_zone_rejected() {
        let mut assignments = BTreeMap::new();
        assignments.insert("ghost".to_string(), vec!["T1".to_string()]);

        let result = SiteConfig::new(
            vec![Zone::new("a", 1)],
            assignments,
            Thresholds::new(0.6, 1.5, 0.3).unwrap(),
        );
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_missing_file() {
        let err = SiteConfig::from_file("/definitely/not/here.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
