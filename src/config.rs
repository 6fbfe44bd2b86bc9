//! Runtime configuration
//!
//! Loaded from an optional YAML file (`TURNSTILE_CONFIG`) with every field
//! defaulted, then the `LISTEN` environment variable overrides the listen
//! address.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::services::AuthLevel;

/// Environment variable naming the YAML config file
pub const CONFIG_ENV: &str = "TURNSTILE_CONFIG";

/// Environment variable overriding `server.listen_addr`
pub const LISTEN_ENV: &str = "LISTEN";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub files: FilesConfig,
    pub cache: CacheConfig,
    pub exec: ExecConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the listener binds to
    pub listen_addr: String,
    /// Number of slots in the connection table
    pub max_connections: usize,
    /// Size of the per-connection receive buffer
    pub recv_buffer_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            max_connections: 100,
            recv_buffer_size: 2048,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    /// Sandbox root for `/file/` and `/upload`
    pub root: PathBuf,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/var/data"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub default_ttl_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: 300,
            sweep_interval_secs: 60,
        }
    }
}

impl CacheConfig {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExecConfig {
    /// Registers the `/exec` route when set
    pub enabled: bool,
    pub timeout_secs: u64,
    pub max_output_bytes: usize,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            timeout_secs: 10,
            max_output_bytes: 2047,
        }
    }
}

impl ExecConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub users: Vec<UserConfig>,
}

/// One credential accepted by the static authenticator
#[derive(Debug, Clone, Deserialize)]
pub struct UserConfig {
    pub principal: String,
    pub secret: String,
    #[serde(default)]
    pub level: AuthLevel,
}

impl Config {
    /// Load configuration from `TURNSTILE_CONFIG` (if set) and apply the
    /// `LISTEN` override.
    pub fn load() -> Result<Self> {
        let mut cfg = match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };

        if let Ok(addr) = std::env::var(LISTEN_ENV) {
            cfg.server.listen_addr = addr;
        }

        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml_str(&raw)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        let cfg: Config = serde_yaml::from_str(raw).context("Failed to parse YAML config")?;

        if cfg.server.max_connections == 0 {
            anyhow::bail!("server.max_connections must be at least 1");
        }
        if cfg.server.recv_buffer_size == 0 {
            anyhow::bail!("server.recv_buffer_size must be at least 1");
        }

        Ok(cfg)
    }
}
