//! Configuration module for the fingerprint extension host
//!
//! Configuration comes from .env files, environment variables and an
//! optional YAML file. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Example
//! ```rust,no_run
//! use fingerprint_control::config::ExtensionConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ExtensionConfig::from_env()?;
//!
//! // Load from YAML file with environment variable fallbacks
//! let config = ExtensionConfig::from_file(&PathBuf::from("config.yaml"))?;
//!
//! println!("Cluster {}", config.cluster_id);
//! # Ok(())
//! # }
//! ```

use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

mod yaml;

pub use yaml::YamlConfig;

pub const DEFAULT_CLUSTER_ID: &str = "local-cluster";

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid value '{value}' for {name}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "plain" | "text" | "pretty" => Ok(LogFormat::Plain),
            "json" => Ok(LogFormat::Json),
            other => Err(ConfigError::Invalid {
                name: "LOG_FORMAT",
                value: other.to_string(),
                reason: "expected 'plain' or 'json'".to_string(),
            }),
        }
    }
}

/// Host configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionConfig {
    /// Cluster identifier, the input of the install id
    pub cluster_id: String,
    pub node_id: i32,
    /// When false the registry never discovers an implementation
    pub extension_enabled: bool,
    pub log_format: LogFormat,
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self {
            cluster_id: DEFAULT_CLUSTER_ID.to_string(),
            node_id: 0,
            extension_enabled: true,
            log_format: LogFormat::Plain,
        }
    }
}

impl ExtensionConfig {
    /// Load configuration from environment variables
    ///
    /// The .env file is loaded in main.rs at startup, so its values are
    /// already visible here.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self::merge(None)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file, falling back to environment
    /// variables for anything the file leaves out.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let yaml_config = YamlConfig::from_file(path)?;
        let config = Self::merge(Some(yaml_config))?;
        config.validate()?;
        Ok(config)
    }

    fn merge(yaml: Option<YamlConfig>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let yaml = yaml.unwrap_or_default();
        let cluster = yaml.cluster.unwrap_or_default();

        let cluster_id = cluster
            .id
            .or_else(|| env::var("CLUSTER_ID").ok())
            .unwrap_or(defaults.cluster_id);

        let node_id = match cluster.node_id {
            Some(id) => id,
            None => match env::var("NODE_ID") {
                Ok(value) => value.trim().parse::<i32>().map_err(|_| ConfigError::Invalid {
                    name: "NODE_ID",
                    value: value.clone(),
                    reason: "expected an integer".to_string(),
                })?,
                Err(_) => defaults.node_id,
            },
        };

        let extension_enabled = match yaml.extension.and_then(|e| e.enabled) {
            Some(enabled) => enabled,
            None => match env::var("FINGERPRINT_EXTENSION_ENABLED") {
                Ok(value) => parse_bool("FINGERPRINT_EXTENSION_ENABLED", &value)?,
                Err(_) => defaults.extension_enabled,
            },
        };

        let log_format = match yaml
            .logging
            .and_then(|l| l.format)
            .or_else(|| env::var("LOG_FORMAT").ok())
        {
            Some(format) => format.parse()?,
            None => defaults.log_format,
        };

        Ok(Self {
            cluster_id,
            node_id,
            extension_enabled,
            log_format,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cluster_id.trim().is_empty() {
            return Err(ConfigError::Invalid {
                name: "CLUSTER_ID",
                value: self.cluster_id.clone(),
                reason: "must not be empty".to_string(),
            });
        }
        if self.node_id < 0 {
            return Err(ConfigError::Invalid {
                name: "NODE_ID",
                value: self.node_id.to_string(),
                reason: "must be non-negative".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            name,
            value: value.to_string(),
            reason: "expected a boolean".to_string(),
        }),
    }
}
