//! Server settings
//!
//! Layered: built-in defaults, then an optional `guardian.toml`, then
//! `GUARDIAN__*` environment variables (`GUARDIAN__FUSION__ADAS__STALENESS_BUDGET_MS=2000`).

use config::{Config, ConfigError, Environment, File, FileFormat};
use event_fusion::FusionConfig;
use serde::{Deserialize, Serialize};

/// Default settings file name (extension resolved by `config`)
pub const SETTINGS_FILE: &str = "guardian";

/// Environment variable prefix
pub const ENV_PREFIX: &str = "GUARDIAN";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Socket address the HTTP server binds to
    pub listen_addr: String,
    /// Maximum log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Milliseconds of simulated speech per message character
    pub speech_ms_per_char: u64,
    pub fusion: FusionConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            log_level: "info".to_string(),
            speech_ms_per_char: 60,
            fusion: FusionConfig::default(),
        }
    }
}

impl Settings {
    /// Load `guardian.*` from the working directory and the environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::build(Config::builder().add_source(File::with_name(SETTINGS_FILE).required(false)))
    }

    /// Load from TOML text layered under the environment
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        Self::build(Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
    }

    fn build(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
