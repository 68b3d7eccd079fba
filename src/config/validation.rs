use crate::config::types::{CacheConfig, Config, RequestConfig};
use crate::ConfigError;

/// Upper bound on each request timeout, in seconds
pub const MAX_TIMEOUT_SECS: f64 = 300.0;

/// Upper bound on the backoff base delay, in seconds
pub const MAX_BACKOFF_SECS: f64 = 60.0;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_cache_config(&config.cache)?;
    validate_request_config(&config.request)?;
    Ok(())
}

/// Validates cache configuration
fn validate_cache_config(config: &CacheConfig) -> Result<(), ConfigError> {
    if config.key_prefix.is_empty() {
        return Err(ConfigError::Validation(
            "key_prefix cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "cache timeout must be at least 1 second".to_string(),
        ));
    }

    if config.file_path.is_empty() {
        return Err(ConfigError::Validation(
            "file_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates outbound request configuration
fn validate_request_config(config: &RequestConfig) -> Result<(), ConfigError> {
    for (name, value) in [
        ("connect_timeout", config.connect_timeout_secs),
        ("read_timeout", config.read_timeout_secs),
    ] {
        if !value.is_finite() || value <= 0.0 || value > MAX_TIMEOUT_SECS {
            return Err(ConfigError::Validation(format!(
                "{} must be in (0, {}] seconds, got {}",
                name, MAX_TIMEOUT_SECS, value
            )));
        }
    }

    let backoff = config.backoff_factor_secs;
    if !backoff.is_finite() || backoff < 0.0 || backoff > MAX_BACKOFF_SECS {
        return Err(ConfigError::Validation(format!(
            "backoff_factor must be in [0, {}] seconds, got {}",
            MAX_BACKOFF_SECS, backoff
        )));
    }

    if config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be between 0 and 10, got {}",
            config.max_retries
        )));
    }

    if config.user_agents.iter().all(|ua| ua.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "user_agents must contain at least one non-empty entry".to_string(),
        ));
    }

    Ok(())
}
