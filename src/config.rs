//! Configuration management
//!
//! Parses TOML configuration files and provides typed access to settings.
//! Every section is optional; an empty file yields the built-in defaults.

use crate::catalog::{FamilyRule, VisionTable};
use crate::resolver::{Endpoint, default_candidates};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Config file looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Candidate endpoints in priority order
    #[serde(default = "default_candidates")]
    pub endpoints: Vec<Endpoint>,
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoints: default_candidates(),
            probe: ProbeConfig::default(),
            generation: GenerationConfig::default(),
            catalog: CatalogConfig::default(),
            server: ServerConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Liveness probe settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProbeConfig {
    #[serde(default = "default_probe_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_probe_timeout(),
        }
    }
}

fn default_probe_timeout() -> u64 {
    3
}

/// Generation request settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerationConfig {
    /// Cold models can take a while to load, hence the long default
    #[serde(default = "default_generation_timeout")]
    pub timeout_seconds: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_generation_timeout(),
        }
    }
}

fn default_generation_timeout() -> u64 {
    120
}

/// Classification table additions
///
/// Rules listed here are evaluated before the built-in rules.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub rules: Vec<FamilyRule>,
}

/// Local HTTP bridge settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
        }
    }
}

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    3100
}

/// Observability configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::error::AppResult<Self> {
        let path_display = path.as_ref().display().to_string();

        let content = std::fs::read_to_string(path.as_ref()).map_err(|source| {
            crate::error::AppError::ConfigFileRead {
                path: path_display.clone(),
                source,
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|source| {
            crate::error::AppError::ConfigParseFailed {
                path: path_display.clone(),
                source,
            }
        })?;

        config
            .validate()
            .map_err(|e| crate::error::AppError::ConfigValidationFailed {
                path: path_display,
                reason: e.to_string(),
            })?;

        Ok(config)
    }

    /// Load an explicit path, or `config.toml` if present, or the defaults
    ///
    /// An explicitly requested file must exist; only the implicit default
    /// path may be missing.
    pub fn discover(explicit: Option<&str>) -> crate::error::AppResult<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::from_file(DEFAULT_CONFIG_PATH),
            None => Ok(Self::default()),
        }
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe.timeout_seconds)
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation.timeout_seconds)
    }

    /// Classification table: configured rules first, then built-ins
    pub fn vision_table(&self) -> VisionTable {
        VisionTable::with_overrides(self.catalog.rules.iter().cloned())
    }

    /// Validate configuration after parsing
    ///
    /// This is called automatically by `from_file()` and `from_str()`, but
    /// can also be called explicitly on configs built in code.
    pub fn validate(&self) -> crate::error::AppResult<()> {
        if self.endpoints.is_empty() {
            return Err(crate::error::AppError::Config(
                "Configuration error: no candidate endpoints. \
                At least one [[endpoints]] entry is required.\n\n\
                Example fix - add to config.toml:\n\
                [[endpoints]]\n\
                host = \"localhost\"\n\
                port = 11434"
                    .to_string(),
            ));
        }

        for (index, endpoint) in self.endpoints.iter().enumerate() {
            if endpoint.host().trim().is_empty() {
                return Err(crate::error::AppError::Config(format!(
                    "Configuration error: endpoints[{}] has an empty host",
                    index
                )));
            }
            if endpoint.port() == 0 {
                return Err(crate::error::AppError::Config(format!(
                    "Configuration error: endpoints[{}] ({}) has port 0. \
                    Port must be between 1 and 65535.",
                    index,
                    endpoint.host()
                )));
            }
        }

        if self.probe.timeout_seconds == 0 || self.probe.timeout_seconds > 30 {
            return Err(crate::error::AppError::Config(format!(
                "Configuration error: probe.timeout_seconds must be between 1 and 30, got {}. \
                Probes run one after another, so long timeouts stall the whole sweep.",
                self.probe.timeout_seconds
            )));
        }

        if self.generation.timeout_seconds == 0 || self.generation.timeout_seconds > 600 {
            return Err(crate::error::AppError::Config(format!(
                "Configuration error: generation.timeout_seconds must be between 1 and 600, got {}",
                self.generation.timeout_seconds
            )));
        }

        for (index, rule) in self.catalog.rules.iter().enumerate() {
            if rule.token().trim().is_empty() {
                return Err(crate::error::AppError::Config(format!(
                    "Configuration error: catalog.rules[{}] has an empty token",
                    index
                )));
            }
        }

        if self.server.host.trim().is_empty() {
            return Err(crate::error::AppError::Config(
                "Configuration error: server.host cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

impl FromStr for Config {
    type Err = crate::error::AppError;

    fn from_str(toml_str: &str) -> Result<Self, Self::Err> {
        let config: Config = toml::from_str(toml_str).map_err(|source| {
            crate::error::AppError::ConfigParseFailed {
                path: "<string>".to_string(),
                source,
            }
        })?;

        config.validate()?;
        Ok(config)
    }
}
