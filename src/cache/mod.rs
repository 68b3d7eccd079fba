//! Cache store for resolved cover images
//!
//! Two interchangeable backends sit behind one [`CacheStore`]:
//! - Redis, with per-entry expiry enforced by the server
//! - A local file holding the whole map, serialized under one lock
//!
//! The backend is chosen once, in [`CacheStore::connect`], and never
//! changes for the lifetime of the store.

mod file_store;
mod redis_store;

pub use file_store::FileCache;
pub use redis_store::{RedisCache, PROBE_TIMEOUT};

use crate::config::{CacheConfig, ONE_DAY, ONE_HOUR, ONE_MINUTE};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Redis unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode cache file: {0}")]
    Encode(#[from] bincode::Error),

    #[error("Cache task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Which backend a store ended up with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Redis,
    File,
}

impl CacheBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Redis => "redis",
            Self::File => "file",
        }
    }
}

impl std::fmt::Display for CacheBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
enum Backend {
    Redis(RedisCache),
    File(Arc<FileCache>),
}

/// Key-value cache mapping page URLs to image URLs
#[derive(Debug)]
pub struct CacheStore {
    key_prefix: String,
    backend: Backend,
}

/// Builds the cache key for a page URL
///
/// The page URL is used verbatim; no normalization is performed.
///
/// # Examples
///
/// ```
/// use bookcover_finder::cache::cache_key;
///
/// assert_eq!(
///     cache_key("amazon_book_image", "https://www.amazon.com/dp/1"),
///     "amazon_book_image:https://www.amazon.com/dp/1"
/// );
/// ```
pub fn cache_key(prefix: &str, page_url: &str) -> String {
    format!("{}:{}", prefix, page_url)
}

/// Human-readable form of a TTL, e.g. `1.5 hours (5400 seconds)`
pub fn describe_ttl(secs: u64) -> String {
    let scaled = |unit: u64, name: &str| format!("{:.1} {} ({} seconds)", secs as f64 / unit as f64, name, secs);

    if secs >= ONE_DAY {
        scaled(ONE_DAY, "days")
    } else if secs >= ONE_HOUR {
        scaled(ONE_HOUR, "hours")
    } else if secs >= ONE_MINUTE {
        scaled(ONE_MINUTE, "minutes")
    } else {
        format!("{} seconds", secs)
    }
}

impl CacheStore {
    /// Creates the store, preferring Redis when it is configured and alive
    ///
    /// Falls back to the file backend when no `redis://` URL is configured
    /// or the liveness probe fails. The fallback is logged, never returned
    /// as an error.
    pub async fn connect(config: &CacheConfig) -> Self {
        tracing::info!(ttl = %describe_ttl(config.timeout_secs), "Using cache timeout");

        match config
            .redis_url
            .as_deref()
            .filter(|url| url.starts_with("redis://"))
        {
            Some(url) => match RedisCache::connect(url, config.timeout_secs).await {
                Ok(redis) => {
                    tracing::info!(redis_url = url, "Redis connection successful, using Redis for caching");
                    return Self {
                        key_prefix: config.key_prefix.clone(),
                        backend: Backend::Redis(redis),
                    };
                }
                Err(e) => {
                    tracing::error!(
                        redis_url = url,
                        error = %e,
                        "Redis connection failed, falling back to file-based caching"
                    );
                }
            },
            None => {
                tracing::warn!("Redis not configured, using file-based caching");
            }
        }

        Self::file(&config.key_prefix, &config.file_path)
    }

    /// Creates a store on the file backend directly
    pub fn file(key_prefix: &str, path: impl Into<PathBuf>) -> Self {
        let cache = FileCache::new(path);
        tracing::info!(path = %cache.path().display(), "Using file cache");
        Self {
            key_prefix: key_prefix.to_string(),
            backend: Backend::File(Arc::new(cache)),
        }
    }

    /// Backend descriptor, for diagnostics
    pub fn backend(&self) -> CacheBackend {
        match self.backend {
            Backend::Redis(_) => CacheBackend::Redis,
            Backend::File(_) => CacheBackend::File,
        }
    }

    pub fn key_for(&self, page_url: &str) -> String {
        cache_key(&self.key_prefix, page_url)
    }

    /// Looks up the image URL cached for a page
    pub async fn get(&self, page_url: &str) -> CacheResult<Option<String>> {
        let key = self.key_for(page_url);

        let value = match &self.backend {
            Backend::Redis(redis) => redis.get(&key).await?,
            Backend::File(file) => {
                let file = Arc::clone(file);
                let lookup = key.clone();
                tokio::task::spawn_blocking(move || file.get(&lookup)).await??
            }
        };

        if value.is_some() {
            tracing::debug!(backend = %self.backend(), key = %key, "Cache hit");
        } else {
            tracing::debug!(backend = %self.backend(), key = %key, "Cache miss");
        }

        Ok(value)
    }

    /// Stores the image URL for a page, replacing any previous entry
    pub async fn set(&self, page_url: &str, image_url: &str) -> CacheResult<()> {
        let key = self.key_for(page_url);
        tracing::debug!(backend = %self.backend(), key = %key, "Cache set");

        match &self.backend {
            Backend::Redis(redis) => redis.set(&key, image_url).await,
            Backend::File(file) => {
                let file = Arc::clone(file);
                let value = image_url.to_string();
                tokio::task::spawn_blocking(move || file.set(&key, &value)).await?
            }
        }
    }
}
