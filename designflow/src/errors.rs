//! Error types for the designflow pipeline.
//!
//! Only configuration errors are fatal to a run. Faults raised inside a unit
//! are captured as [`UnitFault`] at the task boundary and folded into the
//! unit's result envelope.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// The main error type for designflow operations.
#[derive(Debug, Error)]
pub enum DesignflowError {
    /// The pipeline could not be configured.
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),

    /// A generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The category of a configuration error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigErrorKind {
    /// A unit name was requested that the registry does not know.
    UnregisteredUnit,
    /// The registry has no units at all.
    EmptyRegistry,
    /// The repository location is missing, not a directory, or unreadable.
    InvalidRepository,
    /// A glob pattern failed to compile.
    InvalidPattern,
    /// The pipeline request is malformed.
    MalformedInput,
    /// The orchestrator settings are out of range or unreadable.
    InvalidSettings,
}

impl ConfigErrorKind {
    /// Returns the stable error code for this kind.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnregisteredUnit => "CONFIG-UNREGISTERED-UNIT",
            Self::EmptyRegistry => "CONFIG-EMPTY-REGISTRY",
            Self::InvalidRepository => "CONFIG-INVALID-REPOSITORY",
            Self::InvalidPattern => "CONFIG-INVALID-PATTERN",
            Self::MalformedInput => "CONFIG-MALFORMED-INPUT",
            Self::InvalidSettings => "CONFIG-INVALID-SETTINGS",
        }
    }

    /// Returns a default hint for fixing errors of this kind.
    #[must_use]
    pub fn default_hint(&self) -> &'static str {
        match self {
            Self::UnregisteredUnit => {
                "Register a factory for the unit or remove it from the pipeline plan."
            }
            Self::EmptyRegistry => "Register at least one unit before running the pipeline.",
            Self::InvalidRepository => {
                "Pass an existing local directory or a remote URL such as https://host/repo."
            }
            Self::InvalidPattern => "Check the glob syntax of include/exclude patterns.",
            Self::MalformedInput => "Check the pipeline request fields.",
            Self::InvalidSettings => "Check the orchestrator configuration values.",
        }
    }
}

impl fmt::Display for ConfigErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Error raised when the pipeline cannot be configured.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("[{kind}] {message}")]
pub struct ConfigurationError {
    /// The error category.
    pub kind: ConfigErrorKind,
    /// Human-readable message.
    pub message: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl ConfigurationError {
    /// Creates a new configuration error with the kind's default hint.
    #[must_use]
    pub fn new(kind: ConfigErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            fix_hint: Some(kind.default_hint().to_string()),
            context: HashMap::new(),
        }
    }

    /// Creates an unregistered unit error.
    #[must_use]
    pub fn unregistered(unit: impl Into<String>) -> Self {
        let unit = unit.into();
        Self::new(
            ConfigErrorKind::UnregisteredUnit,
            format!("unit '{unit}' is not registered"),
        )
        .with_context_entry("unit", unit)
    }

    /// Creates an empty registry error.
    #[must_use]
    pub fn empty_registry() -> Self {
        Self::new(ConfigErrorKind::EmptyRegistry, "unit registry is empty")
    }

    /// Creates an invalid repository error.
    #[must_use]
    pub fn invalid_repository(message: impl Into<String>) -> Self {
        Self::new(ConfigErrorKind::InvalidRepository, message)
    }

    /// Creates an invalid glob pattern error.
    #[must_use]
    pub fn invalid_pattern(pattern: &str, reason: impl fmt::Display) -> Self {
        Self::new(
            ConfigErrorKind::InvalidPattern,
            format!("invalid glob pattern '{pattern}': {reason}"),
        )
        .with_context_entry("pattern", pattern)
    }

    /// Creates a malformed input error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ConfigErrorKind::MalformedInput, message)
    }

    /// Creates an invalid settings error.
    #[must_use]
    pub fn invalid_settings(message: impl Into<String>) -> Self {
        Self::new(ConfigErrorKind::InvalidSettings, message)
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Returns the stable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }
}

/// A fault captured at a unit's task boundary.
///
/// Every variant becomes a `failed` or `cancelled` result envelope; the
/// `Display` text is the envelope's error message.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UnitFault {
    /// The unit did not finish within its timeout.
    #[error("unit '{unit}' timed out after {seconds:.1}s")]
    Timeout {
        /// The unit name.
        unit: String,
        /// The timeout that elapsed.
        seconds: f64,
    },

    /// The unit panicked.
    #[error("unit '{unit}' panicked: {message}")]
    Panicked {
        /// The unit name.
        unit: String,
        /// The panic payload, when it was a string.
        message: String,
    },

    /// The unit was cancelled before finishing.
    #[error("unit '{unit}' cancelled: {reason}")]
    Cancelled {
        /// The unit name.
        unit: String,
        /// Why it was cancelled.
        reason: String,
    },

    /// The unit name could not be resolved from the registry.
    #[error("registration error: unit '{unit}' is not registered")]
    NotRegistered {
        /// The unit name.
        unit: String,
    },

    /// The unit is a placeholder.
    #[error("not implemented")]
    NotImplemented,

    /// The unit's own logic failed.
    #[error("{0}")]
    Execution(String),
}

impl UnitFault {
    /// Returns a short machine-readable tag for the fault.
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "timeout",
            Self::Panicked { .. } => "panic",
            Self::Cancelled { .. } => "cancelled",
            Self::NotRegistered { .. } => "not_registered",
            Self::NotImplemented => "not_implemented",
            Self::Execution(_) => "execution",
        }
    }

    /// Returns true if another attempt may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl From<anyhow::Error> for UnitFault {
    fn from(err: anyhow::Error) -> Self {
        Self::Execution(format!("{err:#}"))
    }
}

/// Result alias for designflow operations.
pub type Result<T, E = DesignflowError> = std::result::Result<T, E>;
