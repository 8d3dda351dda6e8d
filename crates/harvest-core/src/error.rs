//! Core error types for Harvest.
//!
//! Configuration loading and run-configuration validation each get their own
//! error type; retry exhaustion is generic over the wrapped cause.

use thiserror::Error;

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to determine config directory path
    #[error("could not determine config directory (XDG base directories not available)")]
    NoConfigDir,

    /// Failed to parse TOML
    #[error("failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to serialize config
    #[error("failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// I/O error reading/writing config
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration value
    #[error("invalid config value for {field}: {reason}")]
    InvalidValue {
        /// Field name
        field: String,
        /// Reason for invalidity
        reason: String,
    },
}

/// Errors raised while building or validating a [`RunConfig`](crate::RunConfig).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RunConfigError {
    /// No order types were requested
    #[error("at least one order type is required")]
    NoOrderTypes,

    /// No customer ids were requested
    #[error("at least one customer id is required")]
    NoCustomers,

    /// Unrecognised order type label
    #[error("unknown order type: '{0}'")]
    UnknownOrderType(String),

    /// Customer id failed validation
    #[error("invalid customer id '{id}': {reason}")]
    InvalidCustomerId {
        /// Offending id
        id: String,
        /// Reason for rejection
        reason: String,
    },

    /// Date string did not match `MM/dd/yyyy`
    #[error("invalid date '{0}': expected MM/dd/yyyy")]
    InvalidDate(String),

    /// Start date is after end date
    #[error("start date {start} is after end date {end}")]
    DateRange {
        /// Formatted start date
        start: String,
        /// Formatted end date
        end: String,
    },
}

/// An operation kept failing until its retry policy ran out of attempts.
///
/// Carries the number of attempts made and the cause of the last failure.
#[derive(Error, Debug)]
#[error("operation failed after {attempts} attempt(s): {source}")]
pub struct RetryExhausted<E>
where
    E: std::error::Error + 'static,
{
    /// How many times the operation ran
    pub attempts: u32,
    /// Error returned by the final attempt
    #[source]
    pub source: E,
}

impl<E> RetryExhausted<E>
where
    E: std::error::Error + 'static,
{
    /// Consume the wrapper and return the last cause.
    pub fn into_source(self) -> E {
        self.source
    }
}

/// Result type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ConfigError::NoConfigDir;
        assert_eq!(
            err.to_string(),
            "could not determine config directory (XDG base directories not available)"
        );

        let err = RunConfigError::InvalidDate("2024-01-01".to_string());
        assert_eq!(err.to_string(), "invalid date '2024-01-01': expected MM/dd/yyyy");
    }

    #[test]
    fn test_retry_exhausted_exposes_source() {
        let io_err = std::io::Error::new(std::io::ErrorKind::TimedOut, "slow portal");
        let err = RetryExhausted {
            attempts: 3,
            source: io_err,
        };

        assert_eq!(err.to_string(), "operation failed after 3 attempt(s): slow portal");
        let source = std::error::Error::source(&err).expect("source is set");
        assert_eq!(source.to_string(), "slow portal");
        assert_eq!(err.into_source().kind(), std::io::ErrorKind::TimedOut);
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let config_err: ConfigError = io_err.into();
        assert!(matches!(config_err, ConfigError::Io(_)));
    }
}
