use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::error::{ConfigError, Result};
use crate::feed::fetcher::DEFAULT_PROXY_URL;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_proxy_url")]
    pub proxy_url: String,

    /// Articles kept per load.
    #[serde(default = "default_news_limit")]
    pub news_limit: usize,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Where the feed set and favorites are persisted. Defaults to the
    /// platform data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub log_to_file: bool,

    #[serde(default = "default_log_file")]
    pub log_file: String,

    #[serde(default)]
    pub json_format: bool,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .map_err(|_| ConfigError::NotFound(path.as_ref().display().to_string()))?;

        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` when it exists, otherwise starts from the defaults.
    /// Environment overrides apply in both cases.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = if path.as_ref().exists() {
            Self::load(path)?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Config(e.to_string()))?;
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let proxy = url::Url::parse(&self.settings.proxy_url)
            .map_err(|_| ConfigError::InvalidUrl(self.settings.proxy_url.clone()))?;

        if !matches!(proxy.scheme(), "http" | "https") {
            return Err(ConfigError::Config(format!(
                "Proxy URL must use http or https: {}",
                self.settings.proxy_url
            )));
        }

        if self.settings.news_limit == 0 {
            return Err(ConfigError::Config("News limit must be greater than 0".to_string()));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(proxy) = std::env::var("RSS_SHELF_PROXY_URL") {
            self.settings.proxy_url = proxy;
        }

        if let Ok(limit) = std::env::var("RSS_SHELF_NEWS_LIMIT") {
            if let Ok(val) = limit.parse() {
                self.settings.news_limit = val;
            }
        }

        if let Ok(level) = std::env::var("RSS_SHELF_LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    /// Directory holding the persisted collections.
    pub fn resolved_data_dir(&self) -> Result<PathBuf> {
        match &self.storage.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => Self::data_dir(),
        }
    }

    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("rss-shelf"))
            .ok_or_else(|| ConfigError::Config("Could not determine config directory".to_string()))
    }

    pub fn data_dir() -> Result<PathBuf> {
        dirs::data_dir()
            .map(|dir| dir.join("rss-shelf"))
            .ok_or_else(|| ConfigError::Config("Could not determine data directory".to_string()))
    }

    pub fn default_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            settings: Settings::default(),
            storage: StorageSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            proxy_url: default_proxy_url(),
            news_limit: default_news_limit(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_to_file: false,
            log_file: default_log_file(),
            json_format: false,
        }
    }
}

fn default_proxy_url() -> String { DEFAULT_PROXY_URL.to_string() }
fn default_news_limit() -> usize { 10 }
fn default_user_agent() -> String {
    format!("RSS-Shelf/{}", env!("CARGO_PKG_VERSION"))
}

fn default_log_level() -> String { "warn".to_string() }
fn default_log_file() -> String { "logs/rss-shelf.log".to_string() }
