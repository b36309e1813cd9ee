//! TOML configuration for the zero-day detector.
//!
//! A layered configuration model: compiled-in defaults, an optional TOML file
//! (explicit path, `ZERODAY_CONFIG`, or the standard system location) and
//! command-line overrides for the transport section.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Environment variable naming an explicit configuration file.
pub const CONFIG_ENV_VAR: &str = "ZERODAY_CONFIG";

/// Standard system location for the configuration file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/zeroday/zeroday.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration for the detector process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectorConfig {
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub reporting: ReportingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl DetectorConfig {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        info!(path = %path.display(), "loaded detector configuration");
        Ok(config)
    }

    /// Resolve the configuration, in order:
    /// 1. `explicit`, when given. A failure here is an error.
    /// 2. The path in the `ZERODAY_CONFIG` environment variable.
    /// 3. `/etc/zeroday/zeroday.toml`.
    /// 4. Compiled-in defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        if let Ok(env_path) = std::env::var(CONFIG_ENV_VAR) {
            let path = PathBuf::from(env_path);
            match Self::load(&path) {
                Ok(cfg) => return Ok(cfg),
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "ZERODAY_CONFIG set but file could not be loaded, trying fallback"
                    );
                }
            }
        }

        let system_path = Path::new(SYSTEM_CONFIG_PATH);
        if system_path.exists() {
            match Self::load(system_path) {
                Ok(cfg) => return Ok(cfg),
                Err(e) => {
                    warn!(
                        path = %system_path.display(),
                        error = %e,
                        "system config file exists but could not be loaded, using defaults"
                    );
                }
            }
        }

        debug!("no config file found, using compiled-in defaults");
        Ok(Self::default())
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        let t = &self.transport;
        if t.ingress_channel.trim().is_empty() || t.egress_channel.trim().is_empty() {
            bail!("transport channel names must not be empty");
        }

        let w = &self.window;
        if w.capacity == 0 {
            bail!("window.capacity must be at least 1");
        }
        if w.warmup_threshold == 0 {
            bail!("window.warmup_threshold must be at least 1");
        }
        if w.warmup_threshold > w.capacity {
            bail!(
                "window.warmup_threshold ({}) exceeds window.capacity ({}); scoring would never start",
                w.warmup_threshold,
                w.capacity
            );
        }

        let m = &self.model;
        if m.retrain_interval == 0 {
            bail!("model.retrain_interval must be at least 1");
        }
        if !(m.contamination > 0.0 && m.contamination <= 0.5) {
            bail!(
                "model.contamination must be in (0, 0.5], got {}",
                m.contamination
            );
        }
        if m.n_estimators == 0 {
            bail!("model.n_estimators must be at least 1");
        }
        if m.max_samples < 2 {
            bail!("model.max_samples must be at least 2");
        }

        let r = &self.reporting;
        if r.stats_interval == 0 || r.progress_interval == 0 {
            bail!("reporting intervals must be at least 1");
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Message bus endpoint and channel names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Redis connection URL.
    pub url: String,
    /// Channel carrying raw `identifier|timestamp|feature_value` records.
    pub ingress_channel: String,
    /// Channel alerts are published to.
    pub egress_channel: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379/".to_string(),
            ingress_channel: "traffic_monitor".to_string(),
            egress_channel: "ai_alerts".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Window
// ---------------------------------------------------------------------------

/// Sliding window sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Maximum number of recent feature values retained.
    pub capacity: usize,
    /// Minimum window length before any training or scoring happens.
    /// Independent of `capacity`.
    pub warmup_threshold: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            warmup_threshold: 100,
        }
    }
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// Retrain cadence and isolation forest parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Retrain whenever the processed count is a multiple of this.
    pub retrain_interval: u64,
    /// Expected fraction of anomalies in the training window.
    pub contamination: f64,
    /// Seed for tree subsampling and split selection.
    pub seed: u64,
    /// Number of isolation trees.
    pub n_estimators: usize,
    /// Upper bound on the per-tree subsample size.
    pub max_samples: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            retrain_interval: 100,
            contamination: 0.01,
            seed: 42,
            n_estimators: 100,
            max_samples: 256,
        }
    }
}

// ---------------------------------------------------------------------------
// Reporting
// ---------------------------------------------------------------------------

/// Periodic status output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportingConfig {
    /// Emit a stats summary every this many processed records.
    pub stats_interval: u64,
    /// Emit a warm-up progress line every this many processed records.
    pub progress_interval: u64,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            stats_interval: 500,
            progress_interval: 50,
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum tracing level (`trace`, `debug`, `info`, `warn`, `error`).
    /// `RUST_LOG` takes precedence when set.
    pub level: String,
    /// Emit JSON log lines instead of the human-readable format.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_sane() {
        let cfg = DetectorConfig::default();

        assert_eq!(cfg.transport.url, "redis://127.0.0.1:6379/");
        assert_eq!(cfg.transport.ingress_channel, "traffic_monitor");
        assert_eq!(cfg.transport.egress_channel, "ai_alerts");

        assert_eq!(cfg.window.capacity, 1000);
        assert_eq!(cfg.window.warmup_threshold, 100);

        assert_eq!(cfg.model.retrain_interval, 100);
        assert_eq!(cfg.model.contamination, 0.01);
        assert_eq!(cfg.model.seed, 42);
        assert_eq!(cfg.model.n_estimators, 100);
        assert_eq!(cfg.model.max_samples, 256);

        assert_eq!(cfg.reporting.stats_interval, 500);
        assert_eq!(cfg.reporting.progress_interval, 50);

        assert_eq!(cfg.logging.level, "info");
        assert!(!cfg.logging.json);

        cfg.validate().unwrap();
    }

    #[test]
    fn test_parse_full_toml() {
        let toml_str = r#"
[transport]
url = "redis://bus.internal:6380/2"
ingress_channel = "edge_traffic"
egress_channel = "edge_alerts"

[window]
capacity = 5000
warmup_threshold = 250

[model]
retrain_interval = 250
contamination = 0.05
seed = 7
n_estimators = 50
max_samples = 128

[reporting]
stats_interval = 1000
progress_interval = 25

[logging]
level = "debug"
json = true
"#;

        let cfg: DetectorConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(cfg.transport.url, "redis://bus.internal:6380/2");
        assert_eq!(cfg.transport.ingress_channel, "edge_traffic");
        assert_eq!(cfg.transport.egress_channel, "edge_alerts");
        assert_eq!(cfg.window.capacity, 5000);
        assert_eq!(cfg.window.warmup_threshold, 250);
        assert_eq!(cfg.model.retrain_interval, 250);
        assert_eq!(cfg.model.contamination, 0.05);
        assert_eq!(cfg.model.seed, 7);
        assert_eq!(cfg.model.n_estimators, 50);
        assert_eq!(cfg.model.max_samples, 128);
        assert_eq!(cfg.reporting.stats_interval, 1000);
        assert_eq!(cfg.reporting.progress_interval, 25);
        assert_eq!(cfg.logging.level, "debug");
        assert!(cfg.logging.json);
        cfg.validate().unwrap();
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml_str = r#"
[window]
capacity = 200
"#;

        let cfg: DetectorConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(cfg.window.capacity, 200);
        assert_eq!(cfg.window.warmup_threshold, 100);
        assert_eq!(cfg.transport.ingress_channel, "traffic_monitor");
        assert_eq!(cfg.model.retrain_interval, 100);
    }

    #[test]
    fn test_empty_toml_is_default() {
        let cfg: DetectorConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.window.capacity, 1000);
        assert_eq!(cfg.reporting.stats_interval, 500);
    }

    #[test]
    fn test_warmup_larger_than_capacity_rejected() {
        let mut cfg = DetectorConfig::default();
        cfg.window.capacity = 50;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("warmup_threshold"));
    }

    #[test]
    fn test_contamination_bounds() {
        let mut cfg = DetectorConfig::default();
        cfg.model.contamination = 0.0;
        assert!(cfg.validate().is_err());
        cfg.model.contamination = 0.6;
        assert!(cfg.validate().is_err());
        cfg.model.contamination = 0.5;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_zero_intervals_rejected() {
        let mut cfg = DetectorConfig::default();
        cfg.model.retrain_interval = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = DetectorConfig::default();
        cfg.reporting.stats_interval = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[model]\nseed = 1234").unwrap();

        let cfg = DetectorConfig::resolve(Some(file.path())).unwrap();
        assert_eq!(cfg.model.seed, 1234);
        assert_eq!(cfg.model.n_estimators, 100);
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let result = DetectorConfig::resolve(Some(Path::new("/nonexistent/zeroday.toml")));
        assert!(result.is_err());
    }
}
