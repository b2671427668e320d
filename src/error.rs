//! Configuration error types.
//!
//! The simulation itself never fails: numerical degeneracy is reported as the
//! absence of an event. The only fallible surface is loading and validating
//! an [`ArenaConfig`](crate::ArenaConfig).

use std::fmt;

/// Errors raised while loading or validating arena configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    Io {
        /// Path that was being read.
        path: String,
        source: std::io::Error,
    },

    /// The config file is not valid JSON for [`ArenaConfig`](crate::ArenaConfig).
    Parse {
        path: String,
        source: serde_json::Error,
    },

    /// A value is outside its accepted range.
    Invalid {
        /// Field name as it appears in the config file.
        field: &'static str,
        /// The rejected value.
        value: f64,
        /// Human-readable description of the accepted range.
        expected: &'static str,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "failed to read config '{}': {}", path, source)
            }
            ConfigError::Parse { path, source } => {
                write!(f, "failed to parse config '{}': {}", path, source)
            }
            ConfigError::Invalid {
                field,
                value,
                expected,
            } => write!(
                f,
                "config field '{}' = {} is outside accepted range {}",
                field, value, expected
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
            ConfigError::Invalid { .. } => None,
        }
    }
}

/// Convenience alias: a `Result` using `ConfigError` as the error type.
pub type ConfigResult<T> = Result<T, ConfigError>;
