//! Configuration management for Feedwell.
//!
//! Configuration is read from `~/.config/feedwell/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.
//! Each component receives its own section at construction so tests can vary
//! timeouts, TTLs and window sizes without touching global state.

use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const DEFAULT_USER_AGENT: &str = "feedwell/0.1.0 (+feed ingestion)";
pub const DEFAULT_ACCEPT: &str =
    "application/rss+xml, application/atom+xml, application/xml, text/xml;q=0.9, */*;q=0.8";

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub fetcher: FetcherConfig,
    pub cache: CacheConfig,
    pub rate_limit: RateLimitConfig,
    pub store: StoreConfig,
}

/// Origin fetching.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// Whole-request timeout in milliseconds (default: 10000)
    pub timeout_ms: u64,
    pub user_agent: String,
    /// Value of the `Accept` header sent to origins
    pub accept: String,
    /// Maximum concurrent fetches for batch updates (default: 10)
    pub workers: usize,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept: DEFAULT_ACCEPT.to_string(),
            workers: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// TTL applied to content and metadata when the caller gives none (default: 900)
    pub default_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: 900,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub window_secs: u64,
    /// Requests admitted per client per window
    pub max_requests: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: 60,
            max_requests: 100,
        }
    }
}

impl RateLimitConfig {
    pub fn window_ms(&self) -> i64 {
        i64::try_from(self.window_secs.saturating_mul(1000)).unwrap_or(i64::MAX)
    }
}

/// Key-value substrate.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database path (default: `<data dir>/feedwell/feedwell.db`)
    pub path: Option<PathBuf>,
    /// Smallest TTL the store accepts; shorter TTLs are raised to this
    pub min_ttl_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            min_ttl_secs: 60,
        }
    }
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// If the config file exists but is invalid, returns an error.
    /// Missing fields in the config file will use default values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
            return Ok(Self::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path, which must exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the default config file path: `~/.config/feedwell/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("feedwell").join("config.toml"))
    }

    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> String {
        r##"# Feedwell Configuration

[fetcher]
# Abort an origin request after this many milliseconds
timeout_ms = 10000

# Identifying User-Agent sent to every origin
user_agent = "feedwell/0.1.0 (+feed ingestion)"

# Accept header listing feed MIME types
accept = "application/rss+xml, application/atom+xml, application/xml, text/xml;q=0.9, */*;q=0.8"

# Maximum concurrent fetches when updating several feeds
workers = 10

[cache]
# Seconds a fetched feed and its ETag/Last-Modified stay cached
default_ttl_secs = 900

[rate_limit]
# Fixed window length in seconds
window_secs = 60

# Requests admitted per client in each window
max_requests = 100

[store]
# SQLite database path (defaults to the platform data directory)
# path = "/var/lib/feedwell/feedwell.db"

# Minimum TTL accepted by the store
min_ttl_secs = 60
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_deserializes() {
        let content = Config::default_config_content();
        let config: Config = toml::from_str(&content).expect("Default config should be valid TOML");

        assert_eq!(config.fetcher.timeout_ms, 10_000);
        assert_eq!(config.fetcher.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(config.fetcher.accept, DEFAULT_ACCEPT);
        assert_eq!(config.cache.default_ttl_secs, 900);
        assert_eq!(config.rate_limit.window_secs, 60);
        assert_eq!(config.rate_limit.max_requests, 100);
        assert_eq!(config.store.min_ttl_secs, 60);
        assert!(config.store.path.is_none());
    }

    #[test]
    fn test_partial_config() {
        let content = r##"
[rate_limit]
max_requests = 5
"##;
        let config: Config = toml::from_str(content).expect("Partial config should work");

        assert_eq!(config.rate_limit.max_requests, 5);
        assert_eq!(config.rate_limit.window_secs, 60);
        assert_eq!(config.fetcher.timeout_ms, 10_000);
    }

    #[test]
    fn test_empty_config() {
        let config: Config = toml::from_str("").expect("Empty config should work");

        assert_eq!(config.cache.default_ttl_secs, 900);
        assert_eq!(config.fetcher.workers, 10);
    }

    #[test]
    fn test_window_ms() {
        let config = RateLimitConfig::default();
        assert_eq!(config.window_ms(), 60_000);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[cache]\ndefault_ttl_secs = 120\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.cache.default_ttl_secs, 120);
    }

    #[test]
    fn test_load_from_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[cache\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
