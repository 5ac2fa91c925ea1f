//! Server configuration
//!
//! Defaults, then an optional `server.toml`, then the `HOST` / `PORT`
//! environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use hearth_utils::{server_config_file, HearthError, Result};

/// Default bind host
pub const DEFAULT_HOST: &str = "localhost";

/// Default bind port
pub const DEFAULT_PORT: u16 = 8080;

/// Default host key location, relative to the working directory
pub const DEFAULT_HOST_KEY_PATH: &str = ".ssh/id_ed25519";

/// Default drain window granted to live sessions on shutdown
pub const DEFAULT_DRAIN_TIMEOUT_SECS: u64 = 30;

/// Default time a client has to complete its handshake
pub const DEFAULT_HANDSHAKE_TIMEOUT_SECS: u64 = 10;

/// Root server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub host_key_path: PathBuf,
    pub drain_timeout_secs: u64,
    pub handshake_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.into(),
            port: DEFAULT_PORT,
            host_key_path: PathBuf::from(DEFAULT_HOST_KEY_PATH),
            drain_timeout_secs: DEFAULT_DRAIN_TIMEOUT_SECS,
            handshake_timeout_secs: DEFAULT_HANDSHAKE_TIMEOUT_SECS,
        }
    }
}

impl ServerConfig {
    /// `host:port`, bracketing IPv6 literals
    pub fn bind_addr(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }
}

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load from the default file location and the process environment
    pub fn load() -> Result<ServerConfig> {
        let path = server_config_file();
        let config = if path.exists() {
            Self::load_from_path(&path)?
        } else {
            ServerConfig::default()
        };

        let config = Self::apply_env(config, |key| std::env::var(key).ok())?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<ServerConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| HearthError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::parse(&content, path)
    }

    /// Parse configuration from string
    pub fn parse(content: &str, path: &Path) -> Result<ServerConfig> {
        toml::from_str(content).map_err(|e| HearthError::ConfigInvalid {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Overlay `HOST` and `PORT`; empty values leave the setting untouched
    pub fn apply_env<F>(mut config: ServerConfig, lookup: F) -> Result<ServerConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HOST").filter(|h| !h.is_empty()) {
            config.host = host;
        }

        if let Some(port) = lookup("PORT").filter(|p| !p.is_empty()) {
            config.port = port
                .parse()
                .map_err(|_| HearthError::config(format!("invalid PORT: {:?}", port)))?;
        }

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(config: &ServerConfig) -> Result<()> {
        if config.host.trim().is_empty() {
            return Err(HearthError::config("host must not be empty"));
        }

        if config.drain_timeout_secs == 0 {
            return Err(HearthError::config(
                "drain_timeout_secs must be at least 1",
            ));
        }

        if config.handshake_timeout_secs == 0 {
            return Err(HearthError::config(
                "handshake_timeout_secs must be at least 1",
            ));
        }

        Ok(())
    }
}
