//! Configuration module for Price-Sweep
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use price_sweep::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("sweep.toml")).unwrap();
//! for retailer in &config.retailers {
//!     println!("{} reads identifiers from {}", retailer.name, retailer.input);
//! }
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, MarkerConfig, OutputConfig, PriceSelector, RetailerConfig, RunnerConfig,
    SelectorConfig, StockConfig, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
