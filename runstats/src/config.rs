//! Collector configuration and default resolution.

use crate::scheduler::MAX_INTERVAL;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_HOST: &str = "localhost:8086";
const DEFAULT_ORG: &str = "metrics";
const DEFAULT_BUCKET: &str = "rust";
const DEFAULT_MEASUREMENT: &str = "rust.runtime";
const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);
const UNKNOWN_HOST: &str = "unknown";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] json5::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Collector configuration.
///
/// Every field may be left at its zero value; [`Config::resolve`] fills the
/// gaps. `Config::default()` therefore means "all defaults".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Sink `host:port` pair (default: "localhost:8086").
    pub host: String,

    /// Sink credential. No default.
    pub token: String,

    /// Organization namespace (default: "metrics").
    pub org: String,

    /// Bucket namespace (default: "rust").
    pub bucket: String,

    /// Measurement to write points to.
    /// Default is "rust.runtime.<hostname>".
    pub measurement: String,

    /// Interval at which to collect points (default: 10s).
    #[serde(rename = "collection_interval_ms", with = "duration_ms")]
    pub collection_interval: Duration,

    /// Disable `cpu.*` fields.
    pub disable_cpu: bool,

    /// Disable `mem.*` fields. Also disables `mem.gc.*`.
    pub disable_mem: bool,

    /// Disable `mem.gc.*` fields.
    pub disable_gc: bool,
}

impl Config {
    /// Load configuration from a JSON5 file.
    ///
    /// The result is not resolved; missing fields keep their zero value.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json5(&content)
    }

    /// Parse configuration from a JSON5 string.
    pub fn from_json5(content: &str) -> Result<Self, ConfigError> {
        Ok(json5::from_str(content)?)
    }

    /// Fill every zero-valued field with its default.
    ///
    /// The measurement suffix comes from the local hostname, or "unknown" if
    /// it cannot be read.
    pub fn resolve(self) -> Self {
        self.resolve_with(|| {
            hostname::get()?
                .into_string()
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "hostname is not UTF-8"))
        })
    }

    /// Same as [`Config::resolve`] with a caller-supplied hostname lookup.
    ///
    /// The lookup only runs when the measurement is unset.
    pub fn resolve_with<F>(mut self, hostname: F) -> Self
    where
        F: FnOnce() -> io::Result<String>,
    {
        if self.host.is_empty() {
            self.host = DEFAULT_HOST.to_string();
        }
        if self.org.is_empty() {
            self.org = DEFAULT_ORG.to_string();
        }
        if self.bucket.is_empty() {
            self.bucket = DEFAULT_BUCKET.to_string();
        }
        if self.measurement.is_empty() {
            let suffix = match hostname() {
                Ok(name) if !name.is_empty() => name,
                _ => UNKNOWN_HOST.to_string(),
            };
            self.measurement = format!("{}.{}", DEFAULT_MEASUREMENT, suffix);
        }
        if self.collection_interval.is_zero() {
            self.collection_interval = DEFAULT_INTERVAL;
        }
        self
    }

    /// Validate a resolved configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.collection_interval.is_zero() {
            return Err(ConfigError::Validation(
                "collection_interval_ms must be > 0".to_string(),
            ));
        }

        if self.collection_interval > MAX_INTERVAL {
            return Err(ConfigError::Validation(format!(
                "collection_interval_ms must be at most {}",
                MAX_INTERVAL.as_millis()
            )));
        }

        if self.measurement.trim().is_empty() {
            return Err(ConfigError::Validation(
                "measurement must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Whether CPU fields are collected.
    pub fn cpu_enabled(&self) -> bool {
        !self.disable_cpu
    }

    /// Whether memory fields are collected.
    pub fn mem_enabled(&self) -> bool {
        !self.disable_mem
    }

    /// Whether reclamation fields are collected. Requires memory collection.
    pub fn gc_enabled(&self) -> bool {
        self.mem_enabled() && !self.disable_gc
    }
}

/// (De)serialize a [`Duration`] as whole milliseconds.
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_host() -> io::Result<String> {
        Ok("server01".to_string())
    }

    #[test]
    fn test_resolve_defaults() {
        let config = Config::default().resolve_with(fixed_host);

        assert_eq!(config.host, "localhost:8086");
        assert_eq!(config.org, "metrics");
        assert_eq!(config.bucket, "rust");
        assert_eq!(config.measurement, "rust.runtime.server01");
        assert_eq!(config.collection_interval, Duration::from_secs(10));
        assert!(config.token.is_empty());
        assert!(config.cpu_enabled());
        assert!(config.mem_enabled());
        assert!(config.gc_enabled());
        config.validate().unwrap();
    }

    #[test]
    fn test_resolve_unknown_host() {
        let config = Config::default()
            .resolve_with(|| Err(io::Error::new(io::ErrorKind::NotFound, "no hostname")));
        assert_eq!(config.measurement, "rust.runtime.unknown");

        let config = Config::default().resolve_with(|| Ok(String::new()));
        assert_eq!(config.measurement, "rust.runtime.unknown");
    }

    #[test]
    fn test_resolve_preserves_explicit_values() {
        let config = Config {
            host: "influx:9999".to_string(),
            org: "ops".to_string(),
            bucket: "svc".to_string(),
            measurement: "api.runtime".to_string(),
            collection_interval: Duration::from_millis(250),
            disable_cpu: true,
            ..Default::default()
        };

        let resolved = config.clone().resolve_with(|| panic!("lookup must not run"));
        assert_eq!(resolved, config);
        assert!(!resolved.cpu_enabled());
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let intervals = [0, 1, 50, 10_000, 3_600_000];

        for ms in intervals {
            let config = Config {
                collection_interval: Duration::from_millis(ms),
                ..Default::default()
            };

            let once = config.resolve_with(fixed_host);
            let twice = once.clone().resolve_with(fixed_host);
            assert_eq!(once, twice);

            if ms == 0 {
                assert_eq!(once.collection_interval, Duration::from_secs(10));
            } else {
                assert_eq!(once.collection_interval, Duration::from_millis(ms));
            }
        }
    }

    #[test]
    fn test_gc_requires_memory() {
        let config = Config {
            disable_mem: true,
            disable_gc: false,
            ..Default::default()
        };
        assert!(!config.mem_enabled());
        assert!(!config.gc_enabled());
    }

    #[test]
    fn test_parse_minimal_config() {
        let config = Config::from_json5("{}").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_parse_full_config() {
        let json = r#"{
            host: "influx.internal:8086",
            token: "s3cr3t",
            org: "ops",
            bucket: "services",
            measurement: "billing.runtime",
            collection_interval_ms: 500,
            disable_cpu: true,
            disable_gc: true,
        }"#;

        let config = Config::from_json5(json).unwrap().resolve_with(fixed_host);
        config.validate().unwrap();

        assert_eq!(config.host, "influx.internal:8086");
        assert_eq!(config.token, "s3cr3t");
        assert_eq!(config.measurement, "billing.runtime");
        assert_eq!(config.collection_interval, Duration::from_millis(500));
        assert!(!config.cpu_enabled());
        assert!(config.mem_enabled());
        assert!(!config.gc_enabled());
    }

    #[test]
    fn test_parse_invalid_config() {
        let result = Config::from_json5("{ collection_interval_ms: \"soon\" }");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_from_file() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("runstats.json5");
        std::fs::write(&path, "{ measurement: 'svc', collection_interval_ms: 1000 }")?;

        let config = Config::load_from_file(&path)?;
        assert_eq!(config.measurement, "svc");
        assert_eq!(config.collection_interval, Duration::from_secs(1));

        let missing = Config::load_from_file(dir.path().join("missing.json5"));
        assert!(matches!(missing, Err(ConfigError::Io(_))));
        Ok(())
    }

    #[test]
    fn test_validate_rejects_unresolved() {
        let config = Config::default();
        assert!(config.validate().is_err());

        let config = Config {
            measurement: "   ".to_string(),
            collection_interval: Duration::from_secs(1),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_bounds_interval() {
        let config = Config {
            collection_interval: MAX_INTERVAL,
            ..Default::default()
        }
        .resolve_with(|| Ok("h".to_string()));
        assert!(config.validate().is_ok());

        for interval in [MAX_INTERVAL + Duration::from_millis(1), Duration::MAX] {
            let config = Config {
                collection_interval: interval,
                ..config.clone()
            };
            assert!(matches!(
                config.validate(),
                Err(ConfigError::Validation(_))
            ));
        }

        // About 463 days
        let config: Config = json5::from_str("{ collection_interval_ms: 40000000000 }").unwrap();
        assert!(config.resolve_with(|| Ok("h".to_string())).validate().is_err());
    }
}
