//! Bookcover-Finder: locates the cover image of an Amazon book page
//!
//! This crate fetches a product page, runs an ordered chain of extraction
//! strategies over the parsed markup, and memoizes the resulting image URL
//! behind a Redis or file-backed cache.

pub mod cache;
pub mod config;
pub mod engine;
pub mod extract;
pub mod fetch;
pub mod service;

use thiserror::Error;

/// Main error type for Bookcover-Finder operations
#[derive(Debug, Error)]
pub enum CoverError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cache error: {0}")]
    Cache(#[from] cache::CacheError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] fetch::FetchError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid environment override {name}: {value}")]
    InvalidEnv { name: String, value: String },
}

/// Result type alias for Bookcover-Finder operations
pub type Result<T> = std::result::Result<T, CoverError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use cache::{CacheBackend, CacheStore};
pub use config::Config;
pub use engine::{ResolutionEngine, ResolveOptions};
pub use extract::{is_valid_image_url, Document, ExtractionResult, StrategyChain};
pub use service::{LookupResponse, LookupService};
