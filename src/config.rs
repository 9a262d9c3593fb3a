//! Configuration loading using Figment.
//!
//! Configuration is layered, later sources overriding earlier ones:
//! 1. Built-in defaults
//! 2. `config/robolink.toml` (or the file given with `--config`)
//! 3. Environment variables prefixed with `ROBOLINK_`, nested with `__`
//!
//! ```text
//! ROBOLINK_APPLICATION__LOG_LEVEL=debug
//! ROBOLINK_CLIENT__ADDRESS=10.1.1.20:8080
//! ROBOLINK_CLIENT__CHECK_CONNECTED_EVERY=5s
//! ```
//!
//! # Example
//! ```no_run
//! use robolink::config::RobolinkConfig;
//!
//! let config = RobolinkConfig::load()?;
//! println!("Robot: {:?}", config.client.address);
//! # Ok::<(), figment::Error>(())
//! ```

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use robolink_client::{ClientOptions, RobotAddress};
use serde::{Deserialize, Serialize};

use crate::logging::OutputFormat;

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/robolink.toml";

/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "ROBOLINK_";

const VALID_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobolinkConfig {
    /// Application settings
    pub application: ApplicationConfig,
    /// Robot connection settings
    pub client: ClientConfig,
}

/// Application-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Application name, used in log output
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Log output format
    pub log_format: OutputFormat,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: "robolink".to_string(),
            log_level: "info".to_string(),
            log_format: OutputFormat::Compact,
        }
    }
}

/// Robot connection configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Robot address; falls back to `ROBOLINK_ROBOT_URL`, then the default
    pub address: Option<String>,
    /// Loop schedules and timeouts
    #[serde(flatten)]
    pub options: ClientOptions,
}

impl RobolinkConfig {
    /// Load from [`DEFAULT_CONFIG_PATH`] and the environment.
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load from a specific file and the environment.
    ///
    /// A missing file is not an error; defaults and environment still apply.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, figment::Error> {
        Self::figment(path.as_ref()).extract()
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Validate configuration after loading.
    pub fn validate(&self) -> Result<(), String> {
        let level = self.application.log_level.to_lowercase();
        if !VALID_LEVELS.contains(&level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                VALID_LEVELS.join(", ")
            ));
        }

        if let Some(address) = &self.client.address {
            address
                .parse::<RobotAddress>()
                .map_err(|e| format!("Invalid client.address '{address}': {e}"))?;
        }

        self.client.options.validate()
    }
}
