use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::geolocation::{PresencePolicy, RetryPolicy};

pub const DEFAULT_GEOLOCATION_URL: &str = "https://ipapi.co/json/";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub geolocation: GeolocationConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: String,
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:3307".to_string(),
            static_dir: PathBuf::from("public"),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Mysql,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub database: String,
    pub password: Option<String>,
    pub pool_size: u32,
    /// Issue `CREATE TABLE IF NOT EXISTS school` on startup
    pub create_schema: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Mysql,
            host: "localhost".to_string(),
            port: 3306,
            user: "root".to_string(),
            database: "schools".to_string(),
            password: None,
            pool_size: 10,
            create_schema: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GeolocationConfig {
    pub endpoint: Url,
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    /// Per-attempt HTTP timeout
    pub request_timeout_secs: u64,
    /// Budget for the whole lookup including backoff; unbounded when unset
    pub deadline_secs: Option<u64>,
    pub presence: PresencePolicy,
}

impl Default for GeolocationConfig {
    fn default() -> Self {
        Self {
            endpoint: Url::parse(DEFAULT_GEOLOCATION_URL).expect("default geolocation URL"),
            max_retries: 3,
            initial_backoff_ms: 1000,
            request_timeout_secs: 10,
            deadline_secs: None,
            presence: PresencePolicy::default(),
        }
    }
}

impl GeolocationConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            deadline: self.deadline_secs.map(Duration::from_secs),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.store.pool_size == 0 {
            bail!("store.pool_size must be at least 1");
        }
        if self.store.backend == StoreBackend::Mysql && self.store.database.is_empty() {
            bail!("store.database is required for the mysql backend");
        }
        match self.geolocation.endpoint.scheme() {
            "http" | "https" => {}
            other => bail!("geolocation.endpoint has unsupported scheme '{}'", other),
        }
        if self.geolocation.initial_backoff_ms == 0 && self.geolocation.max_retries > 0 {
            bail!("geolocation.initial_backoff_ms must be positive when retries are enabled");
        }
        Ok(())
    }
}
