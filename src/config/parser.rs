use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
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
/// use price_sweep::config::load_config;
///
/// let config = load_config(Path::new("sweep.toml")).unwrap();
/// println!("Batch size: {}", config.runner.batch_size);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Recorded with every run so observations can be traced back to the selectors that produced them.
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::{PriceSelector, StockConfig};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    const VALID_CONFIG: &str = r#"
[runner]
batch-size = 5
max-attempts = 3
retry-delay-ms = 250
batch-retry-pass = true

[user-agent]
crawler-name = "PriceSweep"
crawler-version = "1.0"
contact-url = "https://example.com/about"

[output]
database-path = "./sweep.db"
csv-dir = "./out"

[[retailer]]
name = "home-depot"
profile = "home-depot"
input = "csvs/hd.csv"
id-column = "SKU"
metadata-columns = ["Parent Sku", "Marketplace SKU"]

[[retailer]]
name = "acme"
input = "csvs/acme.csv"
id-column = "Item"
url-column = "PDP Link"
url-pattern = "https://acme.example/p/{id}"
terminal-statuses = [500]

[retailer.selectors]
title = "h1.name"
price = { dollars = ".price .d", cents = ".price .c" }
not-found = [{ selector = "h1.error", contains = "not found" }]
stock = { out-of-stock-markers = [{ selector = ".oos" }] }
"#;

    #[test]
    fn test_load_valid_config() {
        let file = create_temp_config(VALID_CONFIG);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.runner.batch_size, 5);
        assert_eq!(config.runner.max_attempts, 3);
        assert_eq!(config.runner.retry_delay_ms, 250);
        assert!(config.runner.batch_retry_pass);
        // Unset keys fall back to defaults
        assert_eq!(config.runner.request_timeout_ms, 30_000);
        assert_eq!(config.user_agent.crawler_name, "PriceSweep");
        assert_eq!(config.retailers.len(), 2);
        assert_eq!(config.retailers[0].metadata_columns.len(), 2);

        let acme = config.retailer("acme").unwrap();
        let selectors = acme.selectors.as_ref().unwrap();
        assert!(matches!(selectors.price, PriceSelector::Split { ref separator, .. } if separator == "."));
        assert!(matches!(selectors.stock, StockConfig::OutOfStockMarkers(ref m) if m.len() == 1));
        assert_eq!(selectors.not_found[0].contains.as_deref(), Some("not found"));
        assert_eq!(acme.terminal_statuses, Some(vec![500]));
    }

    #[test]
    fn test_runner_section_is_optional() {
        let config = parse_config(
            r#"
[user-agent]
crawler-name = "PriceSweep"
crawler-version = "1.0"

[output]
csv-dir = "./out"
"#,
        )
        .unwrap();

        assert_eq!(config.runner.batch_size, 10);
        assert_eq!(config.runner.max_attempts, 10);
        assert!(!config.runner.batch_retry_pass);
        assert!(config.retailers.is_empty());
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/sweep.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let file = create_temp_config(&VALID_CONFIG.replace("batch-size = 5", "batch-size = 0"));
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_load_config_with_bad_selector() {
        let file = create_temp_config(&VALID_CONFIG.replace("h1.name", "h1[[["));
        let result = load_config(file.path());
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InvalidSelector { .. }
        ));
    }

    #[test]
    fn test_compute_config_hash() {
        let file = create_temp_config("test content");

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_different_content_different_hash() {
        let file1 = create_temp_config("content 1");
        let file2 = create_temp_config("content 2");

        let hash1 = compute_config_hash(file1.path()).unwrap();
        let hash2 = compute_config_hash(file2.path()).unwrap();

        assert_ne!(hash1, hash2);
    }
}
