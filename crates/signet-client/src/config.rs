//! Configuration management for the signet client

use crate::poller::DEFAULT_POLL_INTERVAL;
use crate::service::CallOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const CONFIG_DIR: &str = ".signet";
const CONFIG_FILE: &str = "config.toml";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    /// I/O error
    #[error("io error:: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("toml parsing error:: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("toml serialization error:: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("unknown configuration key:: {0}")]
    UnknownKey(String),

    #[error("invalid value for {key}:: {value}")]
    InvalidValue { key: String, value: String },
}

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Vault service JSON-RPC endpoint
    pub node: String,
    /// Signer identity calls are made as
    pub identity: Option<String>,
    /// Request timeout in seconds, 0 disables it
    pub timeout: u64,
    /// Vault state refresh interval in seconds
    pub poll_interval: u64,
    /// Output format (json, text)
    pub output: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            node: "http://localhost:4943".to_string(),
            identity: None,
            timeout: 30,
            poll_interval: DEFAULT_POLL_INTERVAL.as_secs(),
            output: "text".to_string(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: ClientConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Get default configuration directory
    pub fn default_config_dir() -> PathBuf {
        if let Some(home) = dirs::home_dir() {
            home.join(CONFIG_DIR)
        } else {
            PathBuf::from(CONFIG_DIR)
        }
    }

    /// Configuration file inside `home`
    pub fn config_file_in(home: &Path) -> PathBuf {
        home.join(CONFIG_FILE)
    }

    /// Load configuration from `home` or fall back to defaults
    pub fn load_or_default(home: &Path) -> Result<Self, ConfigError> {
        let config_path = Self::config_file_in(home);

        if config_path.exists() {
            Self::load_from_file(config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Initialize configuration directory and file
    pub fn init(home: &Path, overwrite: bool) -> Result<Self, ConfigError> {
        let config_file = Self::config_file_in(home);

        if !home.exists() {
            fs::create_dir_all(home)?;
        }

        if config_file.exists() && !overwrite {
            return Self::load_from_file(config_file);
        }

        let config = Self::default();
        config.save_to_file(config_file)?;
        Ok(config)
    }

    /// Set a configuration value
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = || ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };

        match key {
            "node" => {
                url::Url::parse(value).map_err(|_| invalid())?;
                self.node = value.to_string();
            }
            "identity" => {
                self.identity = match value {
                    "" => None,
                    id => Some(
                        signet_types::SignerId::parse(id)
                            .map_err(|_| invalid())?
                            .to_string(),
                    ),
                };
            }
            "timeout" => self.timeout = value.parse().map_err(|_| invalid())?,
            "poll_interval" => match value.parse::<u64>() {
                Ok(secs) if secs > 0 => self.poll_interval = secs,
                _ => return Err(invalid()),
            },
            "output" => match value {
                "text" | "json" => self.output = value.to_string(),
                _ => return Err(invalid()),
            },
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    /// Deadline applied to each remote call
    pub fn call_options(&self) -> CallOptions {
        let timeout = match self.timeout {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        CallOptions::new(timeout)
    }

    pub fn poll_interval(&self) -> Duration {
        match self.poll_interval {
            0 => DEFAULT_POLL_INTERVAL,
            secs => Duration::from_secs(secs),
        }
    }
}
