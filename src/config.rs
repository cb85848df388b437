use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::query::DEFAULT_PAGE_SIZE;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 1247;
pub const DEFAULT_USER: &str = "rods";
pub const DEFAULT_ZONE: &str = "tempZone";
pub const DEFAULT_LISTEN: &str = "127.0.0.1:1247";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read environment file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse environment file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid value for {name}: '{value}'")]
    InvalidValue { name: String, value: String },
}

/// Keys accepted in a JSON environment file; all optional
#[derive(Debug, Default, Deserialize)]
struct EnvironmentFile {
    host: Option<String>,
    port: Option<u16>,
    user_name: Option<String>,
    zone_name: Option<String>,
    page_size: Option<usize>,
}

/// Connection settings for a client session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub host: String,
    pub port: u16,
    /// Identity the session acts as
    pub user_name: String,
    /// Home zone; the default zone of every operation
    pub zone: String,
    /// Sent as a bearer token when set
    pub api_key: Option<String>,
    pub page_size: usize,
    pub request_timeout: Option<Duration>,
}

impl SessionConfig {
    pub fn new(host: &str, port: u16, user_name: &str, zone: &str) -> Self {
        Self {
            host: host.to_string(),
            port,
            user_name: user_name.to_string(),
            zone: zone.to_string(),
            api_key: None,
            page_size: DEFAULT_PAGE_SIZE,
            request_timeout: None,
        }
    }

    /// Defaults, then the file named by `CATALOG_ENV_FILE`, then `CATALOG_*` variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = match env_var("CATALOG_ENV_FILE") {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        config.validate()?;
        tracing::info!(
            "Catalog endpoint: {} as '{}#{}'",
            config.base_url(),
            config.user_name,
            config.zone
        );
        tracing::info!(
            "API key configured: {}",
            if config.api_key.is_some() { "from env" } else { "none" }
        );
        Ok(config)
    }

    /// Defaults overridden by a JSON environment file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path: PathBuf = path.as_ref().to_path_buf();
        let contents = fs::read_to_string(&path)?;
        let file: EnvironmentFile = serde_json::from_str(&contents)?;
        tracing::info!("Loaded environment file {:?}", path);

        let mut config = Self::default();
        if let Some(host) = file.host {
            config.host = host;
        }
        if let Some(port) = file.port {
            config.port = port;
        }
        if let Some(user_name) = file.user_name {
            config.user_name = user_name;
        }
        if let Some(zone) = file.zone_name {
            config.zone = zone;
        }
        if let Some(page_size) = file.page_size {
            config.page_size = page_size;
        }
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Some(host) = env_var("CATALOG_HOST") {
            self.host = host;
        }
        if let Some(port) = parse_env("CATALOG_PORT")? {
            self.port = port;
        }
        if let Some(user_name) = env_var("CATALOG_USER") {
            self.user_name = user_name;
        }
        if let Some(zone) = env_var("CATALOG_ZONE") {
            self.zone = zone;
        }
        if let Some(api_key) = env_var("CATALOG_API_KEY") {
            self.api_key = Some(api_key);
        }
        if let Some(page_size) = parse_env("CATALOG_PAGE_SIZE")? {
            self.page_size = page_size;
        }
        if let Some(seconds) = parse_env::<u64>("CATALOG_TIMEOUT_SECS")? {
            self.request_timeout = Some(Duration::from_secs(seconds));
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(invalid("page_size", "0"));
        }
        if self.user_name.trim().is_empty() {
            return Err(invalid("user_name", &self.user_name));
        }
        if self.zone.trim().is_empty() {
            return Err(invalid("zone_name", &self.zone));
        }
        Ok(())
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT, DEFAULT_USER, DEFAULT_ZONE)
    }
}

/// Settings for the reference catalog server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub listen: String,
    pub zone: String,
    pub admin_user: String,
    /// Required bearer token; `None` accepts every client
    pub api_key: Option<String>,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let config = Self {
            listen: env_var("CATALOG_LISTEN").unwrap_or_else(|| DEFAULT_LISTEN.to_string()),
            zone: env_var("CATALOG_ZONE").unwrap_or_else(|| DEFAULT_ZONE.to_string()),
            admin_user: env_var("CATALOG_USER").unwrap_or_else(|| DEFAULT_USER.to_string()),
            api_key: env_var("CATALOG_API_KEY"),
        };
        tracing::info!("Catalog server address: {}", config.listen);
        tracing::info!("Catalog home zone: {}", config.zone);
        config
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN.to_string(),
            zone: DEFAULT_ZONE.to_string(),
            admin_user: DEFAULT_USER.to_string(),
            api_key: None,
        }
    }
}

/// Non-empty environment variable
fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T: FromStr>(name: &str) -> Result<Option<T>, ConfigError> {
    match env_var(name) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| invalid(name, &value)),
        None => Ok(None),
    }
}

fn invalid(name: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        name: name.to_string(),
        value: value.to_string(),
    }
}
