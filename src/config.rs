//! Configuration handling for the proxy client

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

const LOCAL_CONFIG: &str = "iitd-proxy.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub gateway: GatewayConfig,
    pub timing: TimingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Skip TLS certificate validation toward the gateway.
    ///
    /// The gateway serves a certificate that does not validate, so this is on
    /// by default. Turning it off makes every gateway request fail unless the
    /// certificate is trusted locally.
    pub accept_invalid_certs: bool,
    /// Page fetched through the proxy by the connectivity probe
    pub probe_url: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            accept_invalid_certs: true,
            probe_url: "http://www.google.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub request_timeout_secs: u64,
    pub max_attempts: u32,
    pub base_delay_secs: u64,
    pub backoff_multiplier: u32,
    pub refresh_interval_secs: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 10,
            max_attempts: 3,
            base_delay_secs: 2,
            backoff_multiplier: 2,
            refresh_interval_secs: 60,
        }
    }
}

impl TimingConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load config from an explicit path or the default locations
    ///
    /// Lookup order: `explicit`, `./iitd-proxy.toml`,
    /// `~/.iitd-proxy/config.toml`, then built-in defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let local = PathBuf::from(LOCAL_CONFIG);
        if local.exists() {
            return Self::load(&local);
        }

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".iitd-proxy").join("config.toml");
            if home_config.exists() {
                return Self::load(&home_config);
            }
        }

        info!("No config file found, using defaults");
        Ok(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.gateway.accept_invalid_certs);
        assert_eq!(config.timing.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.timing.max_attempts, 3);
        assert_eq!(config.timing.base_delay_secs, 2);
        assert_eq!(config.timing.backoff_multiplier, 2);
        assert_eq!(config.timing.refresh_interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[gateway]\naccept_invalid_certs = false\n\n[timing]\nrefresh_interval_secs = 30\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert!(!config.gateway.accept_invalid_certs);
        assert_eq!(config.gateway.probe_url, "http://www.google.com");
        assert_eq!(config.timing.refresh_interval_secs, 30);
        assert_eq!(config.timing.max_attempts, 3);
    }

    #[test]
    fn test_load_invalid_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[timing\nmax_attempts = ").unwrap();

        let result = Config::load(&path);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_discover_explicit_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nope.toml");

        let result = Config::discover(Some(path.as_path()));
        assert!(matches!(result, Err(ConfigError::ReadError(_))));
    }
}
