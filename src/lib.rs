//! Price-Sweep: batched retailer price and stock tracking
//!
//! This crate fetches product pages for a list of retailer identifiers, classifies each page
//! through a per-retailer site adapter, and persists the outcomes in fixed-size batches so that
//! partial progress survives a crash.

pub mod adapter;
pub mod config;
pub mod output;
pub mod runner;
pub mod sink;
pub mod source;
pub mod state;

use thiserror::Error;

/// Main error type for Price-Sweep operations
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Identifier source error: {0}")]
    Source(#[from] SourceError),

    #[error("Sink error: {0}")]
    Sink(#[from] sink::SinkError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown retailer: {0}")]
    UnknownRetailer(String),
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

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid CSS selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    #[error("Unknown selector profile: {0}")]
    UnknownProfile(String),
}

/// Errors raised while loading an identifier source
///
/// These are the only errors that abort a retailer run: without identifiers there is nothing to do.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Failed to open identifier source {path}: {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to read identifier source: {0}")]
    Csv(#[from] csv::Error),

    #[error("Identifier source {path} has no column named '{column}'")]
    MissingColumn { path: String, column: String },
}

/// Result type alias for Price-Sweep operations
pub type Result<T> = std::result::Result<T, SweepError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for identifier source operations
pub type SourceResult<T> = std::result::Result<T, SourceError>;

// Re-export commonly used types
pub use adapter::{Classification, SelectorAdapter, SiteAdapter};
pub use config::Config;
pub use runner::{run_once, BatchRunner, Fetcher, RunSummary};
pub use source::{load_items, ItemRecord, Metadata};
pub use state::{FetchOutcome, OutcomeKind, OutcomeRecord, RunState, StockState};
