//! Configuration management for Harvest.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use crate::retry::RetryPolicy;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main application configuration.
///
/// This is loaded from `~/.config/harvest/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Browser launch settings
    pub browser: BrowserConfig,
    /// Customer portal location and wait thresholds
    pub portal: PortalConfig,
    /// Retry policy for filter setup and per-row extraction
    pub retry: RetryConfig,
    /// Where extracted records are written
    pub output: OutputConfig,
}

impl AppConfig {
    /// Load configuration from disk, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path, falling back to defaults if
    /// the file does not exist.
    pub fn load_from(config_path: &Path) -> ConfigResult<Self> {
        if config_path.exists() {
            tracing::debug!("Loading config from {}", config_path.display());
            let contents = fs::read_to_string(config_path)?;
            let config: Self = toml::from_str(&contents)?;
            config.validate()?;
            Ok(config)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `HARVEST_HEADLESS`: Override browser headless mode (true/false)
    /// - `HARVEST_CHROME_PATH`: Override the Chromium executable
    /// - `HARVEST_PORTAL_URL`: Override the customer portal URL
    /// - `HARVEST_OUTPUT_DIR`: Override the output directory
    /// - `HARVEST_RETRY_ATTEMPTS`: Override the maximum retry attempts
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply `HARVEST_*` environment overrides on top of the current values.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("HARVEST_HEADLESS") {
            if let Ok(headless) = val.parse() {
                self.browser.headless = headless;
                tracing::debug!("Override browser.headless from env: {}", headless);
            }
        }

        if let Ok(val) = std::env::var("HARVEST_CHROME_PATH") {
            tracing::debug!("Override browser.chrome_path from env: {}", val);
            self.browser.chrome_path = Some(PathBuf::from(val));
        }

        if let Ok(val) = std::env::var("HARVEST_PORTAL_URL") {
            tracing::debug!("Override portal.url from env: {}", val);
            self.portal.url = val;
        }

        if let Ok(val) = std::env::var("HARVEST_OUTPUT_DIR") {
            tracing::debug!("Override output.directory from env: {}", val);
            self.output.directory = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("HARVEST_RETRY_ATTEMPTS") {
            if let Ok(attempts) = val.parse() {
                self.retry.max_attempts = attempts;
                tracing::debug!("Override retry.max_attempts from env: {}", attempts);
            }
        }
    }

    /// Check values that would make a run meaningless.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "retry.max_attempts".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        if let Some(factor) = self.retry.increment_factor {
            if !(factor.is_finite() && factor >= 1.0) {
                return Err(ConfigError::InvalidValue {
                    field: "retry.increment_factor".to_string(),
                    reason: format!("must be a finite number >= 1.0, got {factor}"),
                });
            }
        }

        if self.portal.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "portal.poll_interval_ms".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        if self.portal.url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "portal.url".to_string(),
                reason: "must not be empty".to_string(),
            });
        }

        Ok(())
    }

    /// Save configuration to disk.
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> ConfigResult<()> {
        let config_path = Self::config_path()?;
        self.save_to(&config_path)
    }

    /// Save configuration to an explicit path.
    pub fn save_to(&self, config_path: &Path) -> ConfigResult<()> {
        let config_dir = config_path
            .parent()
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "config_path".to_string(),
                reason: "no parent directory".to_string(),
            })?;

        fs::create_dir_all(config_dir)?;
        tracing::debug!("Saving config to {}", config_path.display());

        let contents = toml::to_string_pretty(self)?;
        fs::write(config_path, contents)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/harvest/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("com", "harvest", "harvest").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }
}

/// Browser launch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run browser in headless mode
    pub headless: bool,
    /// Browser window width
    pub window_width: u32,
    /// Browser window height
    pub window_height: u32,
    /// Explicit Chromium executable; auto-detected when unset
    pub chrome_path: Option<PathBuf>,
    /// Disable the Chromium sandbox (needed inside most containers)
    pub no_sandbox: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: false,
            window_width: 1920,
            window_height: 1080,
            chrome_path: None,
            no_sandbox: true,
        }
    }
}

/// Customer portal settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    /// Customer orders page
    pub url: String,
    /// Default wait for slots bound on the page model, in seconds
    pub page_timeout_secs: u64,
    /// Wait for per-row and per-cell handles, in seconds
    pub cell_timeout_secs: u64,
    /// Interval between element polls, in milliseconds
    pub poll_interval_ms: u64,
    /// Order-type dropdown text that selects the open-order layout
    pub open_order_label: String,
    /// Order-type dropdown text that selects the closed-order layout
    pub closed_order_label: String,
}

impl PortalConfig {
    /// Default wait for bound page slots.
    #[must_use]
    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }

    /// Wait for specialized row/cell handles.
    #[must_use]
    pub fn cell_timeout(&self) -> Duration {
        Duration::from_secs(self.cell_timeout_secs)
    }

    /// Interval between element polls.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            url: "https://customerportal.supermicro.com/SO/CustOrders.aspx".to_string(),
            page_timeout_secs: 120,
            cell_timeout_secs: 10,
            poll_interval_ms: 500,
            open_order_label: "Open Order".to_string(),
            closed_order_label: "Closed Order".to_string(),
        }
    }
}

/// Retry settings shared by filter setup and per-row extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts including the first
    pub max_attempts: u32,
    /// Wait before the first retry, in seconds
    pub interval_secs: u64,
    /// Multiply the wait by this factor on each further retry
    pub increment_factor: Option<f64>,
    /// Upper bound on the wait, in seconds
    pub max_interval_secs: Option<u64>,
}

impl RetryConfig {
    /// Build the retry policy these settings describe.
    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        let interval = Duration::from_secs(self.interval_secs);
        match self.increment_factor {
            Some(factor) => RetryPolicy::incremental(
                self.max_attempts,
                interval,
                factor,
                self.max_interval_secs.map(Duration::from_secs),
            ),
            None => RetryPolicy::fixed(self.max_attempts, interval),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            interval_secs: 15,
            increment_factor: None,
            max_interval_secs: None,
        }
    }
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving the record files and the run log
    pub directory: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("output"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.portal.page_timeout_secs, 120);
        assert_eq!(config.portal.cell_timeout_secs, 10);
        assert_eq!(config.portal.open_order_label, "Open Order");
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.interval_secs, 15);
        assert!(config.browser.no_sandbox);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("[browser]"));
        assert!(toml_str.contains("[portal]"));
        assert!(toml_str.contains("[retry]"));

        let parsed: AppConfig = toml::from_str(&toml_str).expect("parse serialized config");
        assert_eq!(parsed.portal.url, config.portal.url);
    }

    #[test]
    fn test_config_save_load() {
        let tmp = TempDir::new().expect("create temp dir");
        let config_path = tmp.path().join("nested").join("config.toml");

        let mut config = AppConfig::default();
        config.browser.headless = true;
        config.retry.max_attempts = 5;
        config.save_to(&config_path).expect("save config");

        let loaded = AppConfig::load_from(&config_path).expect("load config");
        assert!(loaded.browser.headless);
        assert_eq!(loaded.retry.max_attempts, 5);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let tmp = TempDir::new().expect("create temp dir");
        let loaded = AppConfig::load_from(&tmp.path().join("absent.toml")).expect("load defaults");
        assert_eq!(loaded.retry.max_attempts, 3);
    }

    #[test]
    fn test_env_overrides() {
        std::env::set_var("HARVEST_PORTAL_URL", "http://localhost:8080/orders");
        std::env::set_var("HARVEST_RETRY_ATTEMPTS", "7");
        std::env::set_var("HARVEST_HEADLESS", "not-a-bool");

        let mut config = AppConfig::default();
        config.apply_env_overrides();
        assert_eq!(config.portal.url, "http://localhost:8080/orders");
        assert_eq!(config.retry.max_attempts, 7);
        // Unparseable values leave the default in place
        assert!(!config.browser.headless);

        std::env::remove_var("HARVEST_PORTAL_URL");
        std::env::remove_var("HARVEST_RETRY_ATTEMPTS");
        std::env::remove_var("HARVEST_HEADLESS");
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[portal]
closed_order_label = "Closed Orders"

[retry]
increment_factor = 2.0
max_interval_secs = 60
"#;

        let config: AppConfig = toml::from_str(toml_str).expect("parse partial config");
        assert_eq!(config.portal.closed_order_label, "Closed Orders");
        assert_eq!(config.portal.page_timeout_secs, 120);
        assert_eq!(config.retry.max_attempts, 3);

        let policy = config.retry.policy();
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.delays().take(4).collect::<Vec<_>>(), vec![
            Duration::from_secs(15),
            Duration::from_secs(30),
            Duration::from_secs(60),
            Duration::from_secs(60),
        ]);
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let mut config = AppConfig::default();
        config.retry.max_attempts = 0;
        let err = config.validate().expect_err("zero attempts rejected");
        assert!(err.to_string().contains("retry.max_attempts"));
    }

    #[test]
    fn test_validate_rejects_shrinking_factor() {
        let mut config = AppConfig::default();
        config.retry.increment_factor = Some(0.5);
        assert!(config.validate().is_err());
    }
}
