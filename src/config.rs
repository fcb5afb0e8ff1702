use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::predict::{
    ElementCatalog, StalenessPolicy, TleLoader, VisibilityParams, DEFAULT_ELEVATION_MASK_DEG, DEFAULT_REFINE_TOLERANCE_MS,
    DEFAULT_SAMPLING_STEP_SECONDS,
};
use crate::scheduler::{Constraints, OptimizerConfig};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Service configuration. Every section has defaults, so an empty file
/// is a valid configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub visibility: VisibilityConfig,
    pub elements: ElementsConfig,
    pub staleness: StalenessPolicy,
    pub constraints: Constraints,
    pub optimizer: OptimizerConfig,
    pub metrics: MetricsConfig,
    pub storage: StorageConfig,
    pub web: WebConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisibilityConfig {
    #[serde(with = "humantime_duration")]
    pub sampling_step: Duration,
    #[serde(with = "humantime_duration")]
    pub refine_tolerance: Duration,
    /// Mask for stations that do not set their own.
    pub default_min_elevation_deg: f64,
}

impl Default for VisibilityConfig {
    fn default() -> Self {
        Self {
            sampling_step: Duration::seconds(DEFAULT_SAMPLING_STEP_SECONDS),
            refine_tolerance: Duration::milliseconds(DEFAULT_REFINE_TOLERANCE_MS),
            default_min_elevation_deg: DEFAULT_ELEVATION_MASK_DEG,
        }
    }
}

impl VisibilityConfig {
    pub fn params(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> VisibilityParams {
        VisibilityParams::new(start, end)
            .with_step(self.sampling_step)
            .with_tolerance(self.refine_tolerance)
    }
}

/// Local element-set store. Requests may refer to satellites held here
/// by catalog number instead of carrying their elements.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementsConfig {
    pub tle_folder: Option<PathBuf>,
}

impl ElementsConfig {
    /// Newest element sets from `tle_folder`; empty when unset or
    /// unreadable.
    pub fn load(&self) -> ElementCatalog {
        let Some(folder) = &self.tle_folder else {
            return ElementCatalog::new();
        };
        let mut loader = TleLoader::new(folder.clone());
        if let Err(e) = loader.load_all() {
            log::warn!("Failed to load element sets: {}", e);
        }
        loader.into_catalog()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub downlink_rate_mbps: f64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            downlink_rate_mbps: 10.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub base_folder: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_folder: PathBuf::from("schedules"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    pub bind: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Config::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }
}

/// `chrono::Duration` as a humantime string ("30s", "5m", "1h 30m").
pub mod humantime_duration {
    use chrono::Duration;
    use serde::{de, ser, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let std = duration.to_std().map_err(ser::Error::custom)?;
        serializer.serialize_str(&humantime::format_duration(std).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let text = String::deserialize(deserializer)?;
        parse(&text).map_err(de::Error::custom)
    }

    pub fn parse(text: &str) -> Result<Duration, String> {
        humantime::parse_duration(text.trim())
            .map_err(|e| e.to_string())
            .and_then(|d| Duration::from_std(d).map_err(|e| e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::OptimizerStrategy;

    #[test]
    fn empty_file_is_all_defaults() {
        let config = Config::from_str("").unwrap();
        assert_eq!(config.visibility.sampling_step, Duration::seconds(30));
        assert_eq!(config.visibility.refine_tolerance, Duration::milliseconds(500));
        assert_eq!(config.optimizer.max_iterations, 200);
        assert_eq!(config.optimizer.time_budget, Duration::seconds(5));
        assert_eq!(config.constraints.turnaround, Duration::seconds(60));
        assert_eq!(config.web.bind, "0.0.0.0:8080");
        assert!(config.elements.tle_folder.is_none());
        assert!(config.elements.load().is_empty());
    }

    #[test]
    fn parses_partial_sections() {
        let yaml = r#"
visibility:
  sampling_step: 1m
  default_min_elevation_deg: 5
staleness:
  low_orbit_max_age: 2days
constraints:
  turnaround: 2m
  max_contacts_per_satellite: 3
  capacity_overrides:
    svalbard: 2
optimizer:
  strategy: first_improvement
  time_budget: 500ms
storage:
  base_folder: /var/lib/contact-o-mat
"#;
        let config = Config::from_str(yaml).unwrap();
        assert_eq!(config.visibility.sampling_step, Duration::minutes(1));
        assert_eq!(config.visibility.refine_tolerance, Duration::milliseconds(500));
        assert!((config.visibility.default_min_elevation_deg - 5.0).abs() < 1e-12);
        assert_eq!(config.staleness.low_orbit_max_age, Duration::days(2));
        assert_eq!(config.staleness.high_orbit_max_age, Duration::days(21));
        assert_eq!(config.constraints.turnaround, Duration::minutes(2));
        assert_eq!(config.constraints.max_contacts_per_satellite, Some(3));
        assert_eq!(config.constraints.capacity_overrides.get("svalbard"), Some(&2));
        assert_eq!(config.optimizer.strategy, OptimizerStrategy::FirstImprovement);
        assert_eq!(config.optimizer.time_budget, Duration::milliseconds(500));
        assert_eq!(
            config.storage.base_folder,
            PathBuf::from("/var/lib/contact-o-mat")
        );
    }

    #[test]
    fn rejects_bad_duration() {
        let err = Config::from_str("visibility:\n  sampling_step: soon\n").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn loads_element_folder() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("iss.tle"),
            "ISS (ZARYA)
1 25544U 98067A   20194.88612269 -.00002218  00000-0 -31515-4 0  9992
2 25544  51.6461 221.2784 0001413  89.1723 280.4612 15.49507896236008
",
        )
        .unwrap();
        let elements = ElementsConfig {
            tle_folder: Some(dir.path().to_path_buf()),
        };
        assert!(elements.load().contains(25544));

        let missing = ElementsConfig {
            tle_folder: Some(dir.path().join("nope")),
        };
        assert!(missing.load().is_empty());
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "web:\n  bind: 127.0.0.1:9000\n").unwrap();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.web.bind, "127.0.0.1:9000");
    }
}
