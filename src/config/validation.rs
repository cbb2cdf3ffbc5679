use crate::adapter::SelectorAdapter;
use crate::config::types::{Config, OutputConfig, RetailerConfig, RunnerConfig, UserAgentConfig};
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_runner_config(&config.runner)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    validate_retailers(&config.retailers)?;
    Ok(())
}

/// Validates batch runner configuration
fn validate_runner_config(config: &RunnerConfig) -> Result<(), ConfigError> {
    if config.batch_size < 1 || config.batch_size > 100 {
        return Err(ConfigError::Validation(format!(
            "batch_size must be between 1 and 100, got {}",
            config.batch_size
        )));
    }

    validate_max_attempts(config.max_attempts)?;
    validate_retry_delay(config.retry_delay_ms)?;

    if config.request_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_ms must be >= 100ms, got {}ms",
            config.request_timeout_ms
        )));
    }

    if config.connect_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "connect_timeout_ms must be >= 100ms, got {}ms",
            config.connect_timeout_ms
        )));
    }

    if config.batch_retry_delay_ms > 60_000 {
        return Err(ConfigError::Validation(format!(
            "batch_retry_delay_ms must be <= 60000ms, got {}ms",
            config.batch_retry_delay_ms
        )));
    }

    Ok(())
}

fn validate_max_attempts(max_attempts: u32) -> Result<(), ConfigError> {
    if max_attempts < 1 || max_attempts > 100 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be between 1 and 100, got {}",
            max_attempts
        )));
    }
    Ok(())
}

fn validate_retry_delay(retry_delay_ms: u64) -> Result<(), ConfigError> {
    if retry_delay_ms > 60_000 {
        return Err(ConfigError::Validation(format!(
            "retry_delay_ms must be <= 60000ms, got {}ms",
            retry_delay_ms
        )));
    }
    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    if let Some(contact_url) = &config.contact_url {
        Url::parse(contact_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_none() && config.csv_dir.is_none() {
        return Err(ConfigError::Validation(
            "at least one of database_path or csv_dir must be set".to_string(),
        ));
    }

    if matches!(config.database_path.as_deref(), Some("")) {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if matches!(config.csv_dir.as_deref(), Some("")) {
        return Err(ConfigError::Validation("csv_dir cannot be empty".to_string()));
    }

    Ok(())
}

/// Validates retailer entries
fn validate_retailers(retailers: &[RetailerConfig]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for retailer in retailers {
        validate_retailer_name(&retailer.name)?;

        if !seen.insert(retailer.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Retailer '{}' is configured more than once",
                retailer.name
            )));
        }

        if retailer.input.is_empty() {
            return Err(ConfigError::Validation(format!(
                "Retailer '{}' must name an input file",
                retailer.name
            )));
        }

        if retailer.id_column.is_empty() {
            return Err(ConfigError::Validation(format!(
                "Retailer '{}' must name an id column",
                retailer.name
            )));
        }

        if let Some(max_attempts) = retailer.max_attempts {
            validate_max_attempts(max_attempts)?;
        }

        if let Some(retry_delay_ms) = retailer.retry_delay_ms {
            validate_retry_delay(retry_delay_ms)?;
        }

        // Compiling the adapter checks the profile name, selectors and URL pattern
        SelectorAdapter::from_retailer(retailer)?;
    }

    Ok(())
}

/// Retailer names end up in file names, so keep them simple
fn validate_retailer_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::Validation(
            "Retailer name cannot be empty".to_string(),
        ));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "Retailer name '{}' must contain only ASCII letters, digits, '-' and '_'",
            name
        )));
    }

    Ok(())
}
