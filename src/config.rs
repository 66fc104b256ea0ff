//! Configuration system for tapi.
//!
//! Provides layered configuration from multiple sources:
//!
//! 1. **Compiled defaults** - Sensible defaults built into the binary
//! 2. **User config file** - `~/.config/tapi/config.toml`
//! 3. **Environment variables** - `TAPI_*` prefix
//! 4. **CLI arguments** - Highest priority, always wins
//!
//! # Example Configuration File
//!
//! ```toml
//! [cache]
//! tweet_ttl_secs = 600
//! response_ttl_secs = 600
//!
//! [api]
//! default_count = 20
//! include_rts = true
//!
//! [render]
//! base_url = "https://twitter.com"
//! new_tab = true
//! nofollow = true
//! ```

use crate::api::{ApiParams, DEFAULT_COUNT};
use crate::entities::{DEFAULT_BASE_URL, RenderOptions};
use crate::error::{Result, TapiError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Main configuration structure for tapi.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Cache lifetimes.
    pub cache: CacheConfig,
    /// Timeline request defaults.
    pub api: ApiConfig,
    /// Anchor markup settings.
    pub render: RenderConfig,
    /// Output formatting configuration.
    pub output: OutputConfig,
}

/// Cache lifetimes, in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// How long wrapped tweets stay cached.
    /// Environment variable: `TAPI_TWEET_TTL`
    pub tweet_ttl_secs: u64,

    /// How long raw API responses stay cached.
    /// Environment variable: `TAPI_RESPONSE_TTL`
    pub response_ttl_secs: u64,

    /// How long merged multi-user timelines stay cached.
    pub merged_ttl_secs: u64,
}

/// Defaults sent with timeline requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Default number of tweets per timeline.
    pub default_count: u32,

    /// Include retweets in timelines.
    pub include_rts: bool,
}

/// Anchor markup settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Site hashtag and mention links point at.
    /// Environment variable: `TAPI_BASE_URL`
    pub base_url: String,

    /// Open links in a new tab.
    pub new_tab: bool,

    /// Mark links `rel="nofollow"`.
    pub nofollow: bool,
}

/// Output formatting configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format: text or json.
    /// Environment variable: `TAPI_FORMAT`
    pub format: String,

    /// Enable colored output.
    pub colors: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            tweet_ttl_secs: 600,
            response_ttl_secs: 600,
            merged_ttl_secs: 600,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            default_count: DEFAULT_COUNT,
            include_rts: true,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            new_tab: true,
            nofollow: true,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "text".to_string(),
            colors: true,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables
    /// 2. User config file (~/.config/tapi/config.toml)
    /// 3. Compiled defaults
    #[must_use]
    pub fn load() -> Self {
        let mut config = Self::default();

        if let Some(user_config) = Self::load_user_config() {
            config.merge(user_config);
        }

        config.apply_env_overrides();

        debug!("Configuration loaded: {:?}", config);
        config
    }

    /// Like [`Config::load`], reading `path` instead of the user config.
    ///
    /// # Errors
    ///
    /// An explicitly named file that cannot be read or parsed is an error.
    pub fn load_with_file(path: &Path) -> Result<Self> {
        let mut config = Self::default();
        config.merge(Self::read_file(path)?);
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific file, if it exists and parses.
    #[must_use]
    pub fn load_from_file(path: &Path) -> Option<Self> {
        if !path.exists() {
            debug!("Config file not found: {}", path.display());
            return None;
        }

        match Self::read_file(path) {
            Ok(config) => {
                info!("Loaded config from: {}", path.display());
                Some(config)
            }
            Err(e) => {
                warn!("Ignoring config file {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Read and parse a config file.
    ///
    /// # Errors
    ///
    /// Returns a path error if the file cannot be read and a config error
    /// if it is not valid TOML for this structure.
    pub fn read_file(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| TapiError::path_error("read", path, e))?;
        toml::from_str(&content).map_err(|e| TapiError::ConfigError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    fn load_user_config() -> Option<Self> {
        let config_path = Self::user_config_path()?;
        Self::load_from_file(&config_path)
    }

    /// Get the path to the user configuration file.
    #[must_use]
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("tapi").join("config.toml"))
    }

    fn apply_env_overrides(&mut self) {
        if let Some(ttl) = env_parse("TAPI_TWEET_TTL") {
            self.cache.tweet_ttl_secs = ttl;
        }
        if let Some(ttl) = env_parse("TAPI_RESPONSE_TTL") {
            self.cache.response_ttl_secs = ttl;
        }

        if let Ok(base_url) = std::env::var("TAPI_BASE_URL") {
            self.render.base_url = base_url;
        }

        if let Ok(format) = std::env::var("TAPI_FORMAT") {
            self.output.format = format;
        }
        if std::env::var("TAPI_NO_COLOR").is_ok() || std::env::var("NO_COLOR").is_ok() {
            self.output.colors = false;
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Self) {
        self.cache = other.cache;

        self.api.default_count = other.api.default_count;
        self.api.include_rts = other.api.include_rts;

        if !other.render.base_url.is_empty() {
            self.render.base_url = other.render.base_url;
        }
        self.render.new_tab = other.render.new_tab;
        self.render.nofollow = other.render.nofollow;

        self.output.format = other.output.format;
        self.output.colors = other.output.colors;
    }

    #[must_use]
    pub const fn tweet_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.tweet_ttl_secs)
    }

    #[must_use]
    pub const fn response_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.response_ttl_secs)
    }

    #[must_use]
    pub const fn merged_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.merged_ttl_secs)
    }

    /// Anchor options for the renderer.
    #[must_use]
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            base_url: self.render.base_url.clone(),
            new_tab: self.render.new_tab,
            nofollow: self.render.nofollow,
        }
    }

    /// Defaults for timeline requests.
    #[must_use]
    pub fn timeline_params(&self) -> ApiParams {
        ApiParams::new()
            .with("count", self.api.default_count)
            .with("include_rts", u8::from(self.api.include_rts))
    }

    /// Look up a single value by dotted key, e.g. `render.base_url`.
    #[must_use]
    pub fn get_value(&self, key: &str) -> Option<String> {
        let value = match key {
            "cache.tweet_ttl_secs" => self.cache.tweet_ttl_secs.to_string(),
            "cache.response_ttl_secs" => self.cache.response_ttl_secs.to_string(),
            "cache.merged_ttl_secs" => self.cache.merged_ttl_secs.to_string(),
            "api.default_count" => self.api.default_count.to_string(),
            "api.include_rts" => self.api.include_rts.to_string(),
            "render.base_url" => self.render.base_url.clone(),
            "render.new_tab" => self.render.new_tab.to_string(),
            "render.nofollow" => self.render.nofollow.to_string(),
            "output.format" => self.output.format.clone(),
            "output.colors" => self.output.colors.to_string(),
            _ => return None,
        };
        Some(value)
    }

    /// Save the current configuration to the user config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be determined,
    /// the parent directory cannot be created, or the file cannot be written.
    pub fn save(&self) -> std::io::Result<PathBuf> {
        let config_path = Self::user_config_path().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine config directory",
            )
        })?;
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    /// Save the configuration to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        std::fs::write(path, content)?;
        info!("Saved config to: {}", path.display());
        Ok(())
    }

    /// Generate a default configuration file content.
    #[must_use]
    pub fn default_config_content() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

fn env_parse<T: std::str::FromStr>(var: &str) -> Option<T> {
    std::env::var(var).ok().and_then(|value| value.parse().ok())
}
