//! Output module for reports over stored runs
//!
//! This module handles:
//! - Printing per-retailer statistics of the latest runs
//! - Exporting one day's observations to CSV

mod export;
pub mod stats;

pub use export::{export_observations, export_path, EXPORT_HEADER};
pub use stats::{load_statistics, print_statistics, RetailerStatistics};
