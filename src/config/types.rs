use serde::Deserialize;

/// Main configuration structure for Bookcover-Finder
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub request: RequestConfig,
}

/// Cache store configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Prefix prepended to every cache key (`prefix:page_url`)
    #[serde(rename = "key-prefix")]
    pub key_prefix: String,

    /// Time-to-live of Redis entries, in seconds
    #[serde(rename = "timeout")]
    pub timeout_secs: u64,

    /// Redis connection string; the file backend is used when absent or unreachable
    #[serde(rename = "redis-url")]
    pub redis_url: Option<String>,

    /// Path of the file backend's serialized map
    #[serde(rename = "file-path")]
    pub file_path: String,
}

/// Outbound request configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RequestConfig {
    /// Connect timeout in seconds
    #[serde(rename = "connect-timeout")]
    pub connect_timeout_secs: f64,

    /// Read timeout in seconds
    #[serde(rename = "read-timeout")]
    pub read_timeout_secs: f64,

    /// Retries on 5xx responses and transient network errors
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Base delay of the exponential backoff, in seconds
    #[serde(rename = "backoff-factor")]
    pub backoff_factor_secs: f64,

    /// User agents picked at random for each request
    #[serde(rename = "user-agents")]
    pub user_agents: Vec<String>,
}

pub const ONE_MINUTE: u64 = 60;
pub const ONE_HOUR: u64 = 3_600;
pub const ONE_DAY: u64 = 86_400;
pub const ONE_YEAR: u64 = 31_536_000;

pub const DEFAULT_KEY_PREFIX: &str = "amazon_book_image";
pub const DEFAULT_REDIS_URL: &str = "redis://localhost:6379/0";
pub const DEFAULT_CACHE_FILE: &str = "book_image_cache.bin";

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            timeout_secs: ONE_YEAR,
            redis_url: Some(DEFAULT_REDIS_URL.to_string()),
            file_path: DEFAULT_CACHE_FILE.to_string(),
        }
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 3.05,
            read_timeout_secs: 6.05,
            max_retries: 3,
            backoff_factor_secs: 0.5,
            user_agents: vec![
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36".to_string(),
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/115.0.0.0 Safari/537.36".to_string(),
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.5 Safari/605.1.15".to_string(),
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36 Edg/114.0.1823.58".to_string(),
            ],
        }
    }
}
