//! Service configuration.
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! `CRAFTOPIA__SECTION__KEY` environment variables. Secrets may be given as
//! `env:VAR_NAME` references and are resolved when read.

use crate::error::ConfigError;

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// The `[server]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
    /// Externally reachable base URL, used when handing out blob URLs.
    /// Defaults to `http://{bind}`.
    #[serde(default)]
    pub public_url: Option<String>,
    /// Sessions unused for this many seconds are dropped.
    #[serde(default = "default_session_idle_secs")]
    pub session_idle_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            public_url: None,
            session_idle_secs: default_session_idle_secs(),
        }
    }
}

fn default_session_idle_secs() -> u64 {
    2 * 60 * 60
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 9002))
}

/// The `[storage]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Holds the SQLite database and uploaded blobs.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

/// The `[model]` section: the hosted generative model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// API key. Supports `env:VAR_NAME` references.
    #[serde(default = "default_api_key")]
    pub api_key: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_key: default_api_key(),
            base_url: default_base_url(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_api_key() -> Option<String> {
    Some("env:GEMINI_API_KEY".to_string())
}

fn default_base_url() -> String {
    DEFAULT_GEMINI_BASE_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

impl ModelConfig {
    /// The API key with any `env:` reference resolved.
    pub fn api_key(&self) -> Result<Option<String>, ConfigError> {
        self.api_key
            .as_deref()
            .map(resolve_env_reference)
            .transpose()
    }
}

/// The `[logging]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directives used when `RUST_LOG` is unset.
    #[serde(default = "default_filter")]
    pub filter: String,
    /// When set, logs are also written to daily-rolling files here.
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            directory: None,
        }
    }
}

fn default_filter() -> String {
    "craftopia=info,tower_http=warn".to_string()
}

impl Config {
    /// Load configuration. An explicit `path` must exist; otherwise the
    /// default location is used when present.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();

        match path {
            Some(path) => {
                builder = builder.add_source(config::File::from(path.to_path_buf()).required(true));
            }
            None => {
                if let Some(default_path) = default_config_path() {
                    builder = builder.add_source(config::File::from(default_path).required(false));
                }
            }
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix("CRAFTOPIA")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize::<Config>()?)
    }

    pub fn data_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.storage.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::data_dir()
                .map(|dir| dir.join("craftopia"))
                .ok_or(ConfigError::NoDataDir),
        }
    }

    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.data_dir()?.join("craftopia.db"))
    }

    pub fn blob_dir(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.data_dir()?.join("blobs"))
    }

    pub fn session_idle_ttl(&self) -> Duration {
        Duration::from_secs(self.server.session_idle_secs)
    }

    pub fn public_url(&self) -> String {
        match &self.server.public_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://{}", self.server.bind),
        }
    }
}

/// `{config_dir}/craftopia/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("craftopia").join("config.toml"))
}

/// Resolve an `env:VAR_NAME` reference; other values pass through.
pub fn resolve_env_reference(value: &str) -> Result<String, ConfigError> {
    match value.strip_prefix("env:") {
        Some(name) => {
            std::env::var(name).map_err(|_| ConfigError::MissingEnv(name.to_string()))
        }
        None => Ok(value.to_string()),
    }
}
