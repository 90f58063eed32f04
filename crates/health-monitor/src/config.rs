//! Monitor configuration.

use health_state::HealthConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable prefix, e.g. `HEALTH_MONITOR_LOG_LEVEL=debug`
pub const ENV_PREFIX: &str = "HEALTH_MONITOR";

/// Complete monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Classification thresholds
    pub health: HealthConfig,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Emit logs as JSON lines
    pub log_json: bool,

    /// Observation file (NDJSON); stdin when unset
    pub input: Option<PathBuf>,

    /// Queue depth per subject worker
    pub channel_capacity: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            health: HealthConfig::default(),
            log_level: "info".to_string(),
            log_json: false,
            input: None,
            channel_capacity: 256,
        }
    }
}

impl MonitorConfig {
    fn environment() -> config::Environment {
        config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    /// Load configuration from file, overridden by environment
    pub fn from_file(path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(Self::environment())
            .build()?;

        settings.try_deserialize()
    }

    /// Load from environment variables
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(Self::environment())
            .build()?;

        settings.try_deserialize()
    }

    /// File if given, environment only otherwise
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Self::from_env(),
        }
    }
}
