//! Configuration module for Bookcover-Finder
//!
//! This module handles loading, parsing, and validating TOML configuration files,
//! with environment variable overrides for the cache and request settings.
//!
//! # Example
//!
//! ```no_run
//! use bookcover_finder::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Cache entries live for {}s", config.cache.timeout_secs);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    CacheConfig, Config, RequestConfig, DEFAULT_CACHE_FILE, DEFAULT_KEY_PREFIX,
    DEFAULT_REDIS_URL, ONE_DAY, ONE_HOUR, ONE_MINUTE, ONE_YEAR,
};

// Re-export parser functions
pub use parser::{
    apply_env_overrides, apply_overrides_from, compute_config_hash, load_config,
    load_config_with_hash, load_default_config,
};
pub use validation::validate;
