//! Runner module for fetching and batch orchestration
//!
//! This module contains the core run logic, including:
//! - HTTP fetching with a bounded, fixed-delay retry policy
//! - Concurrent fetching within a batch, sequential across batches
//! - Handing each finished batch to a sink
//! - Wiring one configured retailer into a complete run

mod batch_runner;
mod fetcher;

pub use batch_runner::{run_once, BatchRunner, RunSummary};
pub use fetcher::{build_http_client, FetchError, FetchFailure, Fetched, Fetcher, RetryPolicy};

use crate::adapter::SelectorAdapter;
use crate::config::{Config, RetailerConfig};
use crate::sink::{CsvSink, Database, FanOutSink, SqliteSink};
use crate::source::{load_items, SourceColumns};
use crate::Result;
use reqwest::Client;
use std::path::Path;

/// Builds the sinks configured in `[output]` for one retailer run
///
/// Opening the database also creates the run row, so this is called once per run.
pub fn build_sink(config: &Config, config_hash: &str, retailer: &RetailerConfig) -> Result<FanOutSink> {
    let mut sink = FanOutSink::new();

    if let Some(path) = &config.output.database_path {
        let db = Database::open(Path::new(path))?;
        let sqlite = SqliteSink::new(db, &retailer.name, config_hash)?;
        tracing::info!("[{}] Recording run {} in {}", retailer.name, sqlite.run_id(), path);
        sink.push(Box::new(sqlite));
    }

    if let Some(dir) = &config.output.csv_dir {
        let csv = CsvSink::for_retailer(Path::new(dir), &retailer.name, retailer.metadata_columns.clone());
        tracing::info!("[{}] Appending rows to {}", retailer.name, csv.path().display());
        sink.push(Box::new(csv));
    }

    Ok(sink)
}

/// Runs one configured retailer end to end
///
/// # Errors
///
/// Fails only on setup: an invalid adapter definition, an unreadable identifier source, or sinks
/// that cannot be opened. Everything that happens per item is reported in the summary instead.
pub async fn run_retailer(
    config: &Config,
    config_hash: &str,
    retailer: &RetailerConfig,
    client: &Client,
    limit: Option<usize>,
) -> Result<RunSummary> {
    let adapter = SelectorAdapter::from_retailer(retailer)?;

    let mut items = load_items(
        Path::new(&retailer.input),
        &SourceColumns::from_retailer(retailer),
    )?;
    if let Some(limit) = limit {
        if items.len() > limit {
            tracing::info!("[{}] Limiting run to the first {} identifiers", retailer.name, limit);
            items.truncate(limit);
        }
    }

    let fetcher = Fetcher::new(
        client.clone(),
        RetryPolicy::for_retailer(&config.runner, retailer),
    );
    let mut sink = build_sink(config, config_hash, retailer)?;

    let summary = BatchRunner::from_config(&config.runner)
        .run(&items, &adapter, &fetcher, &mut sink)
        .await;

    Ok(summary)
}
