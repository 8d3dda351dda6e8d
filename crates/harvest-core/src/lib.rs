//! Harvest Core - Foundation crate for the Harvest order extraction tool.
//!
//! This crate provides configuration management, the run-configuration types
//! and the retry primitives that all other Harvest crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Configuration, validation and retry-exhaustion errors
//! - [`config`] - TOML-based configuration with XDG paths
//! - [`types`] - Run configuration (`OrderType`, `CustomerId`, `RunConfig`)
//! - [`retry`] - Retry policy and executor with rollback hook
//!
//! # Example
//!
//! ```rust
//! use harvest_core::{AppConfig, RetryExecutor};
//!
//! let config = AppConfig::default();
//! let executor = RetryExecutor::new(config.retry.policy());
//! assert_eq!(executor.policy().max_attempts(), 3);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod retry;
pub mod types;

// Re-export commonly used types
pub use config::{AppConfig, BrowserConfig, OutputConfig, PortalConfig, RetryConfig};
pub use error::{ConfigError, ConfigResult, RetryExhausted, RunConfigError};
pub use retry::{Delays, RetryExecutor, RetryPolicy};
pub use types::{
    format_portal_date, parse_portal_date, CustomerId, OrderType, RunConfig, PORTAL_DATE_FORMAT,
};
