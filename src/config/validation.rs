use crate::config::types::{
    AttemptSection, Config, PoolSection, RetrySection, SourceConfig, UserAgentConfig,
};
use crate::ConfigError;
use url::Url;

/// Upper bound on the pool's concurrency ceiling
const MAX_CONCURRENCY_LIMIT: u32 = 256;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_source_config(&config.source)?;
    validate_pool_config(&config.pool)?;
    validate_retry_config(&config.retry)?;
    validate_attempt_config(&config.attempt)?;
    validate_user_agent_config(&config.user_agent)?;
    Ok(())
}

fn validate_source_config(config: &SourceConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.page_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid page-url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "page-url '{}' must use http or https",
            config.page_url
        )));
    }

    if config.destination_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "destination-dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_pool_config(config: &PoolSection) -> Result<(), ConfigError> {
    if config.max_concurrency < 1 || config.max_concurrency > MAX_CONCURRENCY_LIMIT {
        return Err(ConfigError::Validation(format!(
            "max-concurrency must be between 1 and {}, got {}",
            MAX_CONCURRENCY_LIMIT, config.max_concurrency
        )));
    }

    Ok(())
}

fn validate_retry_config(config: &RetrySection) -> Result<(), ConfigError> {
    if config.min_interval_ms > config.max_interval_ms {
        return Err(ConfigError::Validation(format!(
            "min-interval-ms ({}) must not exceed max-interval-ms ({})",
            config.min_interval_ms, config.max_interval_ms
        )));
    }

    if !(0.0..=1.0).contains(&config.jitter_factor) {
        return Err(ConfigError::Validation(format!(
            "jitter-factor must be between 0 and 1, got {}",
            config.jitter_factor
        )));
    }

    Ok(())
}

fn validate_attempt_config(config: &AttemptSection) -> Result<(), ConfigError> {
    if config.timeout_ms < 1 {
        return Err(ConfigError::Validation(
            "timeout-ms must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.name.is_empty() {
        return Err(ConfigError::Validation(
            "user-agent name cannot be empty".to_string(),
        ));
    }

    if config.name.chars().any(char::is_whitespace) {
        return Err(ConfigError::Validation(format!(
            "user-agent name must not contain whitespace, got '{}'",
            config.name
        )));
    }

    Ok(())
}
