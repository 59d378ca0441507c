//! # Server Configuration
//!
//! Settings are read from a YAML file, then selectively overridden by
//! environment variables:
//!
//! ```yaml
//! data_dir: /var/lib/meal-donation
//! log_filter: info
//! server:
//!   bind: 127.0.0.1:3000
//!   cors_origin: http://localhost:8080
//! fulfillment:
//!   allow_overfulfillment: true
//! ```
//!
//! The file is `$MEAL_DONATION_CONFIG` when set, otherwise `config.yaml`
//! inside the default data directory. A missing file means defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::domain::FulfillmentPolicy;

pub const CONFIG_PATH_ENV: &str = "MEAL_DONATION_CONFIG";
pub const DATA_DIR_ENV: &str = "MEAL_DONATION_DATA_DIR";
pub const BIND_ENV: &str = "MEAL_DONATION_BIND";
pub const CORS_ORIGIN_ENV: &str = "MEAL_DONATION_CORS_ORIGIN";

const CONFIG_FILE: &str = "config.yaml";
const APP_DIR_NAME: &str = "Meal Donation";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid bind address {0:?}")]
    InvalidBind(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    /// Origin allowed by CORS; `None` allows any origin
    pub cors_origin: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
            cors_origin: Some("http://localhost:8080".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub log_filter: String,
    pub server: ServerConfig,
    pub fulfillment: FulfillmentPolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_filter: "info".to_string(),
            server: ServerConfig::default(),
            fulfillment: FulfillmentPolicy::default(),
        }
    }
}

impl AppConfig {
    /// Load from the configured file and apply environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| default_data_dir().join(CONFIG_FILE));

        let mut config = Self::from_file(&path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.bind_address()?;
        Ok(config)
    }

    /// Read a YAML file; a missing file yields the defaults
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Apply `MEAL_DONATION_*` overrides through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(DATA_DIR_ENV).filter(|v| !v.trim().is_empty()) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(bind) = lookup(BIND_ENV).filter(|v| !v.trim().is_empty()) {
            self.server.bind = bind;
        }
        if let Some(origin) = lookup(CORS_ORIGIN_ENV) {
            let origin = origin.trim();
            self.server.cors_origin = match origin {
                "" | "*" => None,
                _ => Some(origin.to_string()),
            };
        }
    }

    pub fn bind_address(&self) -> Result<SocketAddr, ConfigError> {
        self.server
            .bind
            .parse()
            .map_err(|_| ConfigError::InvalidBind(self.server.bind.clone()))
    }
}

/// `<platform data dir>/Meal Donation`, or `./data` when the platform has none
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("data"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.bind, "127.0.0.1:3000");
        assert!(config.fulfillment.allow_overfulfillment);
        assert_eq!(config.log_filter, "info");
        assert!(config.bind_address().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = AppConfig::from_yaml_str(
            "data_dir: /tmp/meals\nfulfillment:\n  allow_overfulfillment: false\n",
        )
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/meals"));
        assert!(!config.fulfillment.allow_overfulfillment);
        assert_eq!(config.server, ServerConfig::default());
    }

    #[test]
    fn test_invalid_yaml_is_a_parse_error() {
        let result = AppConfig::from_yaml_str("server: [not, a, map]");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = AppConfig::from_file(&temp_dir.path().join("absent.yaml")).unwrap();
        assert_eq!(config.server, ServerConfig::default());
    }

    #[test]
    fn test_file_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE);
        fs::write(&path, "server:\n  bind: 0.0.0.0:8088\n  cors_origin: null\n").unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:8088");
        assert_eq!(config.server.cors_origin, None);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            (DATA_DIR_ENV, "/srv/meals"),
            (BIND_ENV, "0.0.0.0:9000"),
            (CORS_ORIGIN_ENV, "*"),
        ]);

        let mut config = AppConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.data_dir, PathBuf::from("/srv/meals"));
        assert_eq!(config.bind_address().unwrap().port(), 9000);
        assert_eq!(config.server.cors_origin, None);
    }

    #[test]
    fn test_invalid_bind() {
        let mut config = AppConfig::default();
        config.server.bind = "not-an-address".to_string();
        assert!(matches!(config.bind_address(), Err(ConfigError::InvalidBind(_))));
    }
}
