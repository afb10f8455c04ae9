use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::core::FeedSettings;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub appwrite: AppwriteSettings,
    pub collection: CollectionSettings,
    pub database: DatabaseSettings,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
    /// Feed sessions kept in memory before the least recently used is dropped
    #[serde(default = "default_max_feed_sessions")]
    pub max_feed_sessions: usize,
}

fn default_max_feed_sessions() -> usize { 10_000 }

#[derive(Debug, Clone, Deserialize)]
pub struct AppwriteSettings {
    pub endpoint: String,
    pub api_key: String,
    pub project_id: String,
    pub database_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectionSettings {
    pub user_profiles: String,
    pub user_matches: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
}

/// Tunables of every discovery feed
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_fetch_limit")]
    pub fetch_limit: usize,
    #[serde(default = "default_low_water_mark")]
    pub low_water_mark: usize,
    #[serde(default = "default_history_cap")]
    pub history_cap: usize,
    #[serde(default = "default_error_dismiss_ms")]
    pub error_dismiss_ms: u64,
    #[serde(default = "default_search_debounce_ms")]
    pub search_debounce_ms: u64,
    #[serde(default = "default_search_cache_ttl_secs")]
    pub search_cache_ttl_secs: u64,
    #[serde(default = "default_search_cache_capacity")]
    pub search_cache_capacity: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            fetch_limit: default_fetch_limit(),
            low_water_mark: default_low_water_mark(),
            history_cap: default_history_cap(),
            error_dismiss_ms: default_error_dismiss_ms(),
            search_debounce_ms: default_search_debounce_ms(),
            search_cache_ttl_secs: default_search_cache_ttl_secs(),
            search_cache_capacity: default_search_cache_capacity(),
        }
    }
}

fn default_page_size() -> usize { 20 }
fn default_fetch_limit() -> usize { 50 }
fn default_low_water_mark() -> usize { 3 }
fn default_history_cap() -> usize { 10 }
fn default_error_dismiss_ms() -> u64 { 3_000 }
fn default_search_debounce_ms() -> u64 { 300 }
fn default_search_cache_ttl_secs() -> u64 { 300 }
fn default_search_cache_capacity() -> usize { 20 }

impl From<&FeedConfig> for FeedSettings {
    fn from(config: &FeedConfig) -> Self {
        Self {
            page_size: config.page_size.max(1),
            fetch_limit: config.fetch_limit.max(1),
            low_water_mark: config.low_water_mark,
            history_cap: config.history_cap.max(1),
            error_dismiss_after: Duration::from_millis(config.error_dismiss_ms),
            search_debounce: Duration::from_millis(config.search_debounce_ms),
            search_cache_ttl: Duration::from_secs(config.search_cache_ttl_secs),
            search_cache_capacity: config.search_cache_capacity.max(1),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Environment variables (prefixed with LUME__)
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            // Development overrides
            .add_source(File::with_name("config/local").required(false))
            // e.g., LUME__FEED__PAGE_SIZE -> feed.page_size
            .add_source(
                Environment::with_prefix("LUME")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings = substitute_env_vars(settings)?;

        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("LUME")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    pub fn feed_settings(&self) -> FeedSettings {
        FeedSettings::from(&self.feed)
    }
}

/// Apply the conventional deployment variables on top of the loaded config
///
/// `DATABASE_URL` wins over the file; Appwrite credentials may come from
/// `APPWRITE_*` variables as injected by the hosting platform.
fn substitute_env_vars(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let mut builder = Config::builder().add_source(settings);

    if let Ok(database_url) = env::var("DATABASE_URL") {
        builder = builder.set_override("database.url", database_url)?;
    }

    let overrides = [
        ("APPWRITE_ENDPOINT", "appwrite.endpoint"),
        ("APPWRITE_API_KEY", "appwrite.api_key"),
        ("APPWRITE_PROJECT_ID", "appwrite.project_id"),
        ("APPWRITE_DATABASE_ID", "appwrite.database_id"),
    ];
    for (var, key) in overrides {
        if let Ok(value) = env::var(var) {
            builder = builder.set_override(key, value)?;
        }
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    #[test]
    fn test_default_feed_config() {
        let settings = FeedSettings::from(&FeedConfig::default());
        assert_eq!(settings.page_size, 20);
        assert_eq!(settings.fetch_limit, 50);
        assert_eq!(settings.low_water_mark, 3);
        assert_eq!(settings.history_cap, 10);
        assert_eq!(settings.error_dismiss_after, Duration::from_secs(3));
        assert_eq!(settings.search_debounce, Duration::from_millis(300));
        assert_eq!(settings.search_cache_ttl, Duration::from_secs(300));
        assert_eq!(settings.search_cache_capacity, 20);
    }

    #[test]
    fn test_default_logging() {
        let logging = LoggingSettings::default();
        assert_eq!(logging.level, "info");
        assert_eq!(logging.format, "json");
    }

    #[test]
    fn test_partial_feed_section() {
        let toml = r#"
            [server]
            host = "127.0.0.1"
            port = 8080

            [appwrite]
            endpoint = "http://localhost/v1"
            api_key = "key"
            project_id = "project"
            database_id = "db"

            [collection]
            user_profiles = "profiles"
            user_matches = "matches"

            [database]
            url = "postgres://localhost/lume"

            [feed]
            page_size = 10
        "#;

        let settings: Settings = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        let feed = settings.feed_settings();
        assert_eq!(feed.page_size, 10);
        assert_eq!(feed.fetch_limit, 50);
        assert_eq!(settings.logging.format, "json");
        assert_eq!(settings.server.max_feed_sessions, 10_000);
    }
}
