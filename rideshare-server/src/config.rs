//! Server configuration.
//!
//! Read from an optional YAML file, then overlaid with environment
//! variables. Every field has a default, so an empty file (or no file at
//! all) yields a working local setup.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::search::SearchConfig;
use crate::stations::CacheConfig;

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_VAR: &str = "RIDESHARE_CONFIG";

/// File read when [`CONFIG_PATH_VAR`] is unset, if it exists.
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Top-level server configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// SQLite connection URL, overridden by `DATABASE_URL`
    pub database_url: String,

    /// Listen address, overridden by `BIND_ADDR`
    pub bind_addr: SocketAddr,

    /// Connection pool size
    pub max_connections: u32,

    /// How often popular route counts are rebuilt from ride history.
    /// Zero disables the background rebuild.
    pub popular_routes_refresh_secs: u64,

    pub search: SearchConfig,

    pub cache: CacheSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://rideshare.db".to_string(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            max_connections: 5,
            popular_routes_refresh_secs: 60 * 60,
            search: SearchConfig::default(),
            cache: CacheSettings::default(),
        }
    }
}

/// Station lookup cache settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub ttl_secs: u64,
    pub max_capacity: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        let defaults = CacheConfig::default();
        Self {
            ttl_secs: defaults.ttl.as_secs(),
            max_capacity: defaults.max_capacity,
        }
    }
}

impl CacheSettings {
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            ttl: Duration::from_secs(self.ttl_secs),
            max_capacity: self.max_capacity,
        }
    }
}

impl AppConfig {
    /// Parse a YAML configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        // An empty file is a valid "all defaults" config
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Load configuration the way the server does at startup.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::resolve(|name| std::env::var(name).ok())
    }

    /// Pick the file, load it and apply overrides, reading variables
    /// through `var`.
    pub fn resolve(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let config = match var(CONFIG_PATH_VAR) {
            Some(path) => Self::load(path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::load(DEFAULT_CONFIG_PATH)?,
            None => Self::default(),
        };
        config.with_overrides(var)
    }

    /// Apply `DATABASE_URL` and `BIND_ADDR` overrides.
    pub fn with_overrides(
        mut self,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(url) = var("DATABASE_URL").filter(|u| !u.trim().is_empty()) {
            self.database_url = url;
        }
        if let Some(addr) = var("BIND_ADDR") {
            self.bind_addr = addr.trim().parse().map_err(|_| ConfigError::InvalidVar {
                name: "BIND_ADDR",
                value: addr.clone(),
            })?;
        }
        Ok(self)
    }

    /// Interval of the popular routes rebuild, if enabled.
    pub fn popular_routes_refresh(&self) -> Option<Duration> {
        (self.popular_routes_refresh_secs > 0)
            .then(|| Duration::from_secs(self.popular_routes_refresh_secs))
    }
}

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid value for {name}: {value:?}")]
    InvalidVar { name: &'static str, value: String },
}
