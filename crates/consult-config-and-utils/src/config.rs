//! Configuration management.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// Default backend API URL (can be overridden at compile time via TELECONSULT_API_URL).
pub const DEFAULT_API_URL: &str = match option_env!("TELECONSULT_API_URL") {
    Some(url) => url,
    None => "https://api.teleconsult.health",
};

/// Default widget script URL (can be overridden at compile time via TELECONSULT_WIDGET_URL).
pub const DEFAULT_WIDGET_SCRIPT_URL: &str = match option_env!("TELECONSULT_WIDGET_URL") {
    Some(url) => url,
    None => "https://widget.teleconsult.health/sdk/consult-widget.js",
};

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// How old a `NEW_TAB_OPENED` announcement may be and still matter.
pub const DEFAULT_RELEVANCE_WINDOW_MS: i64 = 1_000;

/// Credential lifetime used when the backend does not send `expiresIn`.
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 3_600;

/// Upper bound for `default_token_ttl_secs` (one year).
pub const MAX_TOKEN_TTL_SECS: i64 = 365 * 24 * 3_600;

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Backend base URL (profile, access grant, and code exchange endpoints).
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Third-party widget script URL, without cache-busting parameter.
    #[serde(default = "default_widget_script_url")]
    pub widget_script_url: String,
    /// Widget locale.
    #[serde(default = "default_widget_locale")]
    pub widget_locale: String,
    /// Widget theme name.
    #[serde(default = "default_widget_theme")]
    pub widget_theme: String,
    /// Relevance window for tab announcements, in milliseconds.
    #[serde(default = "default_relevance_window_ms")]
    pub relevance_window_ms: i64,
    /// Maximum checks for the widget entry point before giving up.
    #[serde(default = "default_widget_ready_max_attempts")]
    pub widget_ready_max_attempts: u32,
    /// First delay between entry point checks, in milliseconds.
    #[serde(default = "default_widget_ready_initial_delay_ms")]
    pub widget_ready_initial_delay_ms: u64,
    /// Upper bound for the delay between entry point checks, in milliseconds.
    #[serde(default = "default_widget_ready_max_delay_ms")]
    pub widget_ready_max_delay_ms: u64,
    /// Credential TTL fallback, in seconds.
    #[serde(default = "default_token_ttl_secs")]
    pub default_token_ttl_secs: i64,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_widget_script_url() -> String {
    DEFAULT_WIDGET_SCRIPT_URL.to_string()
}

fn default_widget_locale() -> String {
    "pt-BR".to_string()
}

fn default_widget_theme() -> String {
    "light".to_string()
}

fn default_relevance_window_ms() -> i64 {
    DEFAULT_RELEVANCE_WINDOW_MS
}

fn default_widget_ready_max_attempts() -> u32 {
    5
}

fn default_widget_ready_initial_delay_ms() -> u64 {
    250
}

fn default_widget_ready_max_delay_ms() -> u64 {
    2_000
}

fn default_token_ttl_secs() -> i64 {
    DEFAULT_TOKEN_TTL_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            api_url: default_api_url(),
            widget_script_url: default_widget_script_url(),
            widget_locale: default_widget_locale(),
            widget_theme: default_widget_theme(),
            relevance_window_ms: default_relevance_window_ms(),
            widget_ready_max_attempts: default_widget_ready_max_attempts(),
            widget_ready_initial_delay_ms: default_widget_ready_initial_delay_ms(),
            widget_ready_max_delay_ms: default_widget_ready_max_delay_ms(),
            default_token_ttl_secs: default_token_ttl_secs(),
        }
    }
}

impl Config {
    /// Create a new Config with default values, then override from environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load configuration from the config file, falling back to defaults.
    /// Environment variables are applied last.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let config_path = paths.config_file();
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    /// Override configuration from environment variables.
    fn load_from_env(&mut self) {
        if let Ok(log_level) = std::env::var("TELECONSULT_LOG_LEVEL") {
            self.log_level = log_level;
        }
        if let Ok(api_url) = std::env::var("TELECONSULT_API_URL") {
            if !api_url.trim().is_empty() {
                self.api_url = api_url.trim().to_string();
            }
        }
    }

    /// Reject values that would break the admission or window flows.
    pub fn validate(&self) -> CoreResult<()> {
        self.api_url()?;
        self.widget_script_url()?;
        if self.relevance_window_ms <= 0 {
            return Err(CoreError::Config(
                "relevance_window_ms must be positive".to_string(),
            ));
        }
        if self.widget_ready_max_attempts == 0 {
            return Err(CoreError::Config(
                "widget_ready_max_attempts must be at least 1".to_string(),
            ));
        }
        if self.default_token_ttl_secs <= 0 || self.default_token_ttl_secs > MAX_TOKEN_TTL_SECS {
            return Err(CoreError::Config(format!(
                "default_token_ttl_secs must be between 1 and {MAX_TOKEN_TTL_SECS}"
            )));
        }
        Ok(())
    }

    /// Get the backend URL as a parsed URL.
    pub fn api_url(&self) -> CoreResult<Url> {
        Url::parse(&self.api_url).map_err(CoreError::from)
    }

    /// Get the widget script URL as a parsed URL.
    pub fn widget_script_url(&self) -> CoreResult<Url> {
        Url::parse(&self.widget_script_url).map_err(CoreError::from)
    }
}
