//! Orchestrator configuration.
//!
//! Settings come from three layers, later layers winning: a JSON file,
//! `DESIGNFLOW_*` environment variables, then explicit overrides from the
//! caller (the CLI applies its flags last).

use crate::errors::{ConfigurationError, DesignflowError};
use crate::pipeline::RetryConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding `max_parallel_units`.
pub const ENV_MAX_PARALLEL_UNITS: &str = "DESIGNFLOW_MAX_PARALLEL_UNITS";
/// Environment variable overriding `unit_timeout_seconds`.
pub const ENV_UNIT_TIMEOUT_SECONDS: &str = "DESIGNFLOW_UNIT_TIMEOUT_SECONDS";
/// Environment variable overriding `phase_timeout_seconds`.
pub const ENV_PHASE_TIMEOUT_SECONDS: &str = "DESIGNFLOW_PHASE_TIMEOUT_SECONDS";
/// Environment variable overriding `output_directory`.
pub const ENV_OUTPUT_DIR: &str = "DESIGNFLOW_OUTPUT_DIR";
/// Environment variable overriding `log_level`.
pub const ENV_LOG_LEVEL: &str = "DESIGNFLOW_LOG_LEVEL";

const fn default_max_parallel_units() -> usize {
    4
}

const fn default_unit_timeout_seconds() -> f64 {
    3600.0
}

fn default_output_directory() -> PathBuf {
    PathBuf::from("./data/outputs")
}

const fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Per-unit overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitSettings {
    /// Timeout for this unit, replacing the global one.
    #[serde(default)]
    pub timeout_seconds: Option<f64>,
    /// Attempt limit for this unit, replacing the retry policy's.
    #[serde(default)]
    pub max_attempts: Option<usize>,
    /// Disabled units are not executed and surface as cancelled.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for UnitSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: None,
            max_attempts: None,
            enabled: true,
        }
    }
}

/// Settings for the pipeline controller and phase executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Maximum units running at once within a phase.
    #[serde(default = "default_max_parallel_units")]
    pub max_parallel_units: usize,
    /// Default per-unit timeout.
    #[serde(default = "default_unit_timeout_seconds")]
    pub unit_timeout_seconds: f64,
    /// Optional timeout for a whole phase.
    #[serde(default)]
    pub phase_timeout_seconds: Option<f64>,
    /// Retry policy for retryable failures.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Where runs are persisted.
    #[serde(default = "default_output_directory")]
    pub output_directory: PathBuf,
    /// Also write one file per phase.
    #[serde(default = "default_true")]
    pub intermediate_outputs: bool,
    /// Log level used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Per-unit overrides keyed by unit name.
    #[serde(default)]
    pub units: BTreeMap<String, UnitSettings>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_parallel_units: default_max_parallel_units(),
            unit_timeout_seconds: default_unit_timeout_seconds(),
            phase_timeout_seconds: None,
            retry: RetryConfig::default(),
            output_directory: default_output_directory(),
            intermediate_outputs: true,
            log_level: default_log_level(),
            units: BTreeMap::new(),
        }
    }
}

impl OrchestratorConfig {
    /// Creates a config with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a config from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, DesignflowError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigurationError::invalid_settings(format!(
                "failed to read config {}: {e}",
                path.display()
            ))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            ConfigurationError::invalid_settings(format!(
                "failed to parse config {}: {e}",
                path.display()
            ))
            .into()
        })
    }

    /// Applies `DESIGNFLOW_*` overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self, ConfigurationError> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary variable lookup.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_MAX_PARALLEL_UNITS) {
            self.max_parallel_units = parse_var(ENV_MAX_PARALLEL_UNITS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_UNIT_TIMEOUT_SECONDS) {
            self.unit_timeout_seconds = parse_var(ENV_UNIT_TIMEOUT_SECONDS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_PHASE_TIMEOUT_SECONDS) {
            self.phase_timeout_seconds = Some(parse_var(ENV_PHASE_TIMEOUT_SECONDS, &raw)?);
        }
        if let Some(raw) = lookup(ENV_OUTPUT_DIR) {
            self.output_directory = PathBuf::from(raw);
        }
        if let Some(raw) = lookup(ENV_LOG_LEVEL) {
            self.log_level = raw;
        }
        Ok(self)
    }

    /// Sets the parallelism bound.
    #[must_use]
    pub fn with_max_parallel_units(mut self, n: usize) -> Self {
        self.max_parallel_units = n;
        self
    }

    /// Sets the default unit timeout.
    #[must_use]
    pub fn with_unit_timeout_seconds(mut self, seconds: f64) -> Self {
        self.unit_timeout_seconds = seconds;
        self
    }

    /// Sets the phase timeout.
    #[must_use]
    pub fn with_phase_timeout_seconds(mut self, seconds: f64) -> Self {
        self.phase_timeout_seconds = Some(seconds);
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the output directory.
    #[must_use]
    pub fn with_output_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_directory = dir.into();
        self
    }

    /// Sets overrides for one unit.
    #[must_use]
    pub fn with_unit_settings(mut self, unit: impl Into<String>, settings: UnitSettings) -> Self {
        self.units.insert(unit.into(), settings);
        self
    }

    /// Rejects out-of-range values.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.max_parallel_units == 0 {
            return Err(ConfigurationError::invalid_settings(
                "max_parallel_units must be at least 1",
            ));
        }
        check_seconds("unit_timeout_seconds", self.unit_timeout_seconds)?;
        if let Some(phase) = self.phase_timeout_seconds {
            check_seconds("phase_timeout_seconds", phase)?;
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigurationError::invalid_settings(
                "retry.max_attempts must be at least 1",
            ));
        }
        for (name, settings) in &self.units {
            if let Some(seconds) = settings.timeout_seconds {
                check_seconds(&format!("units.{name}.timeout_seconds"), seconds)?;
            }
            if settings.max_attempts == Some(0) {
                return Err(ConfigurationError::invalid_settings(format!(
                    "units.{name}.max_attempts must be at least 1"
                )));
            }
        }
        Ok(())
    }

    /// Effective timeout for a unit.
    #[must_use]
    pub fn unit_timeout(&self, unit: &str) -> Duration {
        let seconds = self
            .units
            .get(unit)
            .and_then(|s| s.timeout_seconds)
            .unwrap_or(self.unit_timeout_seconds);
        seconds_to_duration(seconds)
    }

    /// Effective attempt limit for a unit (at least 1).
    #[must_use]
    pub fn max_attempts(&self, unit: &str) -> usize {
        self.units
            .get(unit)
            .and_then(|s| s.max_attempts)
            .unwrap_or(self.retry.max_attempts)
            .max(1)
    }

    /// Whether a unit is enabled.
    #[must_use]
    pub fn is_enabled(&self, unit: &str) -> bool {
        self.units.get(unit).map_or(true, |s| s.enabled)
    }

    /// The phase timeout, if configured.
    #[must_use]
    pub fn phase_timeout(&self) -> Option<Duration> {
        self.phase_timeout_seconds.map(seconds_to_duration)
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigurationError>
where
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e| {
        ConfigurationError::invalid_settings(format!("{key}={raw:?} is not valid: {e}"))
            .with_context_entry("variable", key)
    })
}

fn check_seconds(field: &str, seconds: f64) -> Result<(), ConfigurationError> {
    if seconds.is_finite() && seconds > 0.0 {
        Ok(())
    } else {
        Err(ConfigurationError::invalid_settings(format!(
            "{field} must be a positive number of seconds, got {seconds}"
        )))
    }
}

fn seconds_to_duration(seconds: f64) -> Duration {
    Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX)
}
