use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// Environment overrides are applied after the file is parsed, then the
/// merged configuration is validated.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use bookcover_finder::config::load_config;
///
/// let config = load_config(Path::new("config.toml")).unwrap();
/// println!("Cache prefix: {}", config.cache.key_prefix);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut config: Config = toml::from_str(&content)?;

    apply_env_overrides(&mut config)?;
    validate(&config)?;

    Ok(config)
}

/// Builds the default configuration with environment overrides applied
pub fn load_default_config() -> Result<Config, ConfigError> {
    let mut config = Config::default();
    apply_env_overrides(&mut config)?;
    validate(&config)?;
    Ok(config)
}

/// Applies overrides from the process environment
///
/// Recognized variables: `CACHE_REDIS_URL`, `CACHE_TIMEOUT`,
/// `CACHE_KEY_PREFIX`, `REQUEST_CONNECT_TIMEOUT`, `REQUEST_READ_TIMEOUT`.
pub fn apply_env_overrides(config: &mut Config) -> Result<(), ConfigError> {
    apply_overrides_from(config, |name| std::env::var(name).ok())
}

/// Applies overrides read through `lookup`
///
/// An empty `CACHE_REDIS_URL` disables the Redis backend.
pub fn apply_overrides_from<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup("CACHE_REDIS_URL") {
        let url = url.trim().to_string();
        config.cache.redis_url = if url.is_empty() { None } else { Some(url) };
    }

    if let Some(prefix) = lookup("CACHE_KEY_PREFIX") {
        config.cache.key_prefix = prefix;
    }

    if let Some(value) = lookup("CACHE_TIMEOUT") {
        config.cache.timeout_secs = parse_env("CACHE_TIMEOUT", &value)?;
    }

    if let Some(value) = lookup("REQUEST_CONNECT_TIMEOUT") {
        config.request.connect_timeout_secs = parse_env("REQUEST_CONNECT_TIMEOUT", &value)?;
    }

    if let Some(value) = lookup("REQUEST_READ_TIMEOUT") {
        config.request.read_timeout_secs = parse_env("REQUEST_READ_TIMEOUT", &value)?;
    }

    Ok(())
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        name: name.to_string(),
        value: value.to_string(),
    })
}

/// Computes a SHA-256 hash of the configuration file content
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}
