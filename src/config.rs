//! Host configuration.
//!
//! Read from an optional JSON file, then overridden field by field from the
//! command line or environment.

use crate::infrastructure::retry::RetryPolicy;
use crate::logging::LogFormat;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_GATEWAY_URL: &str = "https://testpos.oxipay.com.au/webapi/v1/Test";
pub const DEFAULT_GATEWAY_VERSION: &str = "1.1";
pub const DEFAULT_DATABASE_URL: &str = "sqlite://vendproxy.db";

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("unable to read config file {path}")]
    #[diagnostic(code(vendproxy::config::read), help("check the --config path"))]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config file {path} is not valid JSON")]
    #[diagnostic(code(vendproxy::config::parse))]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid configuration value for {field}: {reason}")]
    #[diagnostic(code(vendproxy::config::invalid))]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub url: String,
    /// Integration version sent as the registration firmware version.
    pub version: String,
    pub timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_GATEWAY_URL.to_string(),
            version: DEFAULT_GATEWAY_VERSION.to_string(),
            timeout_secs: 30,
        }
    }
}

impl GatewayConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub connect_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
            connect_attempts: 5,
            initial_backoff_ms: 200,
            max_connections: 5,
        }
    }
}

impl DatabaseConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.connect_attempts,
            Duration::from_millis(self.initial_backoff_ms),
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// RocksDB directory for sessions. In-memory when unset.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub gateway: GatewayConfig,
    pub database: DatabaseConfig,
    pub session: SessionConfig,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            database: DatabaseConfig::default(),
            session: SessionConfig::default(),
            log_level: "info".to_string(),
            log_format: LogFormat::default(),
        }
    }
}

impl HostConfig {
    /// Loads a JSON config file. Missing sections take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.gateway.url.trim();
        if url.is_empty() || !url.starts_with("http") {
            return Err(ConfigError::Invalid {
                field: "gateway.url",
                reason: format!("{url:?} is not an http(s) URL"),
            });
        }
        if self.gateway.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "gateway.timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "database.url",
                reason: "must not be empty".to_string(),
            });
        }
        if self.database.connect_attempts == 0 {
            return Err(ConfigError::Invalid {
                field: "database.connect_attempts",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}
