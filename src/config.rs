//! Configuration System using Figment
//!
//! Configuration is loaded from (in order of precedence, highest last):
//! 1. Built-in defaults
//! 2. TOML configuration file (default: `config/dp832.toml`, optional)
//! 3. Environment variables prefixed with `DP832_`
//!
//! CLI flags are applied on top by the binary before [`Settings::validate`].
//!
//! # Environment Variables
//!
//! Nested keys are separated by a double underscore:
//!
//! ```text
//! DP832_INSTRUMENT__ADDRESS=10.0.0.7:5555
//! DP832_APPLICATION__LOG_LEVEL=debug
//! DP832_ACQUISITION__POLL_INTERVAL_MS=250
//! ```
//!
//! # Example
//!
//! ```no_run
//! use dp832_daq::config::Settings;
//!
//! let settings = Settings::load()?;
//! println!("Polling {} every {:?}", settings.instrument.address, settings.poll_interval());
//! # Ok::<(), dp832_daq::error::DaqError>(())
//! ```

use crate::error::{AppResult, DaqError};
use crate::measurement::OutputFormat;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "config/dp832.toml";

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "DP832_";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Application settings
    #[serde(default)]
    pub application: ApplicationConfig,
    /// Connection to the power supply
    #[serde(default)]
    pub instrument: InstrumentConfig,
    /// Poll loop settings
    #[serde(default)]
    pub acquisition: AcquisitionConfig,
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application name
    #[serde(default = "default_name")]
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log formatter (text, json)
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

/// Instrument connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentConfig {
    /// `host:port` of the instrument's raw socket
    #[serde(default = "default_address")]
    pub address: String,
    /// Model the handshake must report
    #[serde(default = "default_expected_model")]
    pub expected_model: String,
    /// Connect deadline in milliseconds (0 = OS default)
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
    /// Per-reply read deadline in milliseconds (0 = wait forever)
    #[serde(default = "default_read_timeout")]
    pub read_timeout_ms: u64,
}

/// Poll loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    /// Tick period in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Measurement output format
    #[serde(default)]
    pub output: OutputFormat,
}

// ============================================================================
// Default value functions
// ============================================================================

fn default_name() -> String {
    "dp832-daq".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_address() -> String {
    "192.168.0.200:5555".to_string()
}

fn default_expected_model() -> String {
    crate::instrument::DP832_MODEL.to_string()
}

fn default_connect_timeout() -> u64 {
    5000
}

fn default_read_timeout() -> u64 {
    5000
}

fn default_poll_interval() -> u64 {
    100
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            expected_model: default_expected_model(),
            connect_timeout_ms: default_connect_timeout(),
            read_timeout_ms: default_read_timeout(),
        }
    }
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            output: OutputFormat::default(),
        }
    }
}

// ============================================================================
// Configuration Loading and Validation
// ============================================================================

impl Settings {
    /// Load from [`DEFAULT_CONFIG_PATH`] and the environment, then validate.
    ///
    /// A missing file is not an error; defaults apply.
    pub fn load() -> AppResult<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load from a specific file path and the environment, then validate.
    ///
    /// # Errors
    ///
    /// `DaqError::Config` if a source cannot be parsed, `DaqError::Configuration`
    /// if the merged values are invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let settings: Self = Self::figment(path.as_ref()).extract()?;
        settings.validate()?;
        Ok(settings)
    }

    /// The provider stack used by [`Settings::load_from`].
    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Validate configuration after loading
    ///
    /// Checks:
    /// - Log level and log format are known
    /// - Address is non-empty `host:port` with a numeric port
    /// - Expected model is non-empty
    /// - Poll interval is positive
    pub fn validate(&self) -> AppResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.as_str()) {
            return Err(DaqError::Configuration(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            )));
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.application.log_format.as_str()) {
            return Err(DaqError::Configuration(format!(
                "Invalid log_format '{}'. Must be one of: {}",
                self.application.log_format,
                valid_formats.join(", ")
            )));
        }

        let address = self.instrument.address.trim();
        let port_ok = address
            .rsplit_once(':')
            .map(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok())
            .unwrap_or(false);
        if !port_ok {
            return Err(DaqError::Configuration(format!(
                "Invalid instrument address '{}'. Expected host:port",
                self.instrument.address
            )));
        }

        if self.instrument.expected_model.trim().is_empty() {
            return Err(DaqError::Configuration(
                "'expected_model' cannot be empty".to_string(),
            ));
        }

        if self.acquisition.poll_interval_ms == 0 {
            return Err(DaqError::Configuration(
                "'poll_interval_ms' must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Tick period of the poll loop.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.acquisition.poll_interval_ms)
    }

    /// Connect deadline, `None` when disabled.
    pub fn connect_timeout(&self) -> Option<Duration> {
        non_zero_millis(self.instrument.connect_timeout_ms)
    }

    /// Read deadline, `None` when disabled.
    pub fn read_timeout(&self) -> Option<Duration> {
        non_zero_millis(self.instrument.read_timeout_ms)
    }
}

fn non_zero_millis(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}
