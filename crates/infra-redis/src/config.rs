// Redis adapter configuration

use std::time::Duration;

const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
const DEFAULT_KEY_PREFIX: &str = "loner";

/// Redis connection settings
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis connection URL (redis://host:port/db)
    pub url: String,
    /// Prefix of every lock key
    pub key_prefix: String,
    /// Time allowed to establish the connection
    pub connection_timeout: Duration,
    /// Time allowed for a single command round trip
    pub command_timeout: Duration,
    /// Keys fetched per SCAN step during bulk release
    pub scan_count: usize,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_REDIS_URL.to_string(),
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            connection_timeout: Duration::from_secs(5),
            command_timeout: Duration::from_secs(2),
            scan_count: 200,
        }
    }
}

impl RedisConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the Redis connection URL
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set the key prefix
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }
}
