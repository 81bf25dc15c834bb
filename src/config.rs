use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::api::DEFAULT_API_BASE;
use crate::tree::DEFAULT_CONCURRENCY;

const CONFIG_FILE: &str = ".hn-threads.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration loaded from .hn-threads.toml in the current
/// directory. All fields are optional; the tool works with zero config, and
/// CLI flags override anything set here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub fetch: FetchConfig,

    #[serde(default)]
    pub monitor: MonitorSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiConfig {
    /// Item API base URL. If None, falls back to the HN_API_BASE env var,
    /// then to the public Firebase endpoint.
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FetchConfig {
    /// Bound on in-flight item fetches during a tree build.
    pub concurrency: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MonitorSection {
    /// Seconds between background refresh cycles in watch mode.
    pub interval_secs: Option<u64>,
}

impl Config {
    /// Load configuration from .hn-threads.toml in the current directory,
    /// or defaults if the file doesn't exist.
    pub fn load() -> Result<Config, ConfigError> {
        let path = Path::new(CONFIG_FILE);
        if path.exists() {
            Self::load_from(path)
        } else {
            Ok(Config::default())
        }
    }

    /// Load from a specific path (useful for testing).
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Resolve the API base: config file value takes precedence, then the
    /// HN_API_BASE env var, then the public endpoint.
    pub fn api_base(&self) -> String {
        self.api
            .base_url
            .clone()
            .or_else(|| std::env::var("HN_API_BASE").ok())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
    }

    pub fn concurrency(&self) -> usize {
        self.fetch.concurrency.unwrap_or(DEFAULT_CONCURRENCY)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.monitor.interval_secs.unwrap_or(60))
    }
}
