use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Outbound request policy. The source has no published limits, so these are
/// the values it tolerates without handing out 429s.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_max_active_fetches")]
    pub max_active_fetches: usize,
    #[serde(default = "default_target_fetches_per_minute")]
    pub target_fetches_per_minute: u32,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_rate_poll_interval_ms")]
    pub rate_poll_interval_ms: u64,
    #[serde(default = "default_too_many_requests_backoff_secs")]
    pub too_many_requests_backoff_secs: u64,
    #[serde(default = "default_server_error_backoff_secs")]
    pub server_error_backoff_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Overrides the cache directory derived from the base path.
    #[serde(default)]
    pub root: Option<PathBuf>,
    #[serde(default = "default_read_retries")]
    pub read_retries: u32,
    #[serde(default = "default_read_retry_delay_ms")]
    pub read_retry_delay_ms: u64,
    #[serde(default = "default_buffer_capacity_bytes")]
    pub buffer_capacity_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoreConfig {
    /// Overrides the data directory derived from the base path.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_json_logging")]
    pub json: bool,
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_max_active_fetches() -> usize {
    1
}

fn default_target_fetches_per_minute() -> u32 {
    500
}

fn default_max_attempts() -> u32 {
    3
}

fn default_rate_poll_interval_ms() -> u64 {
    100
}

fn default_too_many_requests_backoff_secs() -> u64 {
    60
}

fn default_server_error_backoff_secs() -> u64 {
    120
}

fn default_user_agent() -> String {
    format!("starsdb/{}", env!("CARGO_PKG_VERSION"))
}

fn default_read_retries() -> u32 {
    3
}

fn default_read_retry_delay_ms() -> u64 {
    250
}

fn default_buffer_capacity_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_json_logging() -> bool {
    use std::io::IsTerminal;
    !std::io::stdout().is_terminal()
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_active_fetches: default_max_active_fetches(),
            target_fetches_per_minute: default_target_fetches_per_minute(),
            max_attempts: default_max_attempts(),
            rate_poll_interval_ms: default_rate_poll_interval_ms(),
            too_many_requests_backoff_secs: default_too_many_requests_backoff_secs(),
            server_error_backoff_secs: default_server_error_backoff_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root: None,
            read_retries: default_read_retries(),
            read_retry_delay_ms: default_read_retry_delay_ms(),
            buffer_capacity_bytes: default_buffer_capacity_bytes(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: default_json_logging(),
            file: None,
        }
    }
}

impl Config {
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load the file if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from_file(path)
    }

    pub fn save_to_file(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.fetch.max_active_fetches == 0 {
            return Err(anyhow::anyhow!("fetch.max_active_fetches must be at least 1"));
        }
        if self.fetch.target_fetches_per_minute == 0 {
            return Err(anyhow::anyhow!("fetch.target_fetches_per_minute must be at least 1"));
        }
        if self.fetch.max_attempts == 0 {
            return Err(anyhow::anyhow!("fetch.max_attempts must be at least 1"));
        }
        if self.fetch.user_agent.trim().is_empty() {
            return Err(anyhow::anyhow!("fetch.user_agent cannot be empty"));
        }
        if self.cache.buffer_capacity_bytes == 0 {
            return Err(anyhow::anyhow!("cache.buffer_capacity_bytes must be non-zero"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_load_and_save() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.fetch.max_active_fetches = 4;
        config.fetch.target_fetches_per_minute = 120;
        config.cache.root = Some(PathBuf::from("/tmp/starsdb-cache"));
        config.save_to_file(&path).unwrap();

        let loaded = Config::load_from_file(&path).unwrap();
        assert_eq!(loaded.fetch.max_active_fetches, 4);
        assert_eq!(loaded.fetch.target_fetches_per_minute, 120);
        assert_eq!(loaded.cache.root, Some(PathBuf::from("/tmp/starsdb-cache")));
        assert_eq!(loaded.fetch.max_attempts, 3);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [fetch]
            target_fetches_per_minute = 60
            "#,
        )
        .unwrap();

        assert_eq!(config.fetch.target_fetches_per_minute, 60);
        assert_eq!(config.fetch.max_active_fetches, 1);
        assert_eq!(config.fetch.too_many_requests_backoff_secs, 60);
        assert_eq!(config.fetch.server_error_backoff_secs, 120);
        assert_eq!(config.cache.read_retries, 3);
        assert!(config.store.data_dir.is_none());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.fetch.rate_poll_interval_ms, 100);
    }

    #[test]
    fn test_config_validate() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.fetch.max_active_fetches = 0;
        assert!(config.validate().is_err());

        config.fetch.max_active_fetches = 2;
        config.fetch.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }
}
