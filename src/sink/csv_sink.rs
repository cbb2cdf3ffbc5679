//! Append-only CSV sink
//!
//! One file per retailer. The header is written when the file is new or empty; every batch is
//! appended and flushed before `write_batch` returns.

use crate::sink::traits::{Sink, SinkResult};
use crate::state::{FetchOutcome, OutcomeRecord};
use chrono::Utc;
use csv::WriterBuilder;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

/// Cell text for items the retailer reported as missing
pub const NOT_FOUND: &str = "Not Found";

/// Cell text for items that ran out of attempts
pub const UNSUCCESSFUL: &str = "Unsuccessful";

/// Cell text for items that had no request target
pub const NO_TARGET: &str = "n/a";

/// Format of the `Date` column
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Sink that appends rows to a CSV file
#[derive(Debug, Clone)]
pub struct CsvSink {
    path: PathBuf,
    metadata_columns: Vec<String>,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>, metadata_columns: Vec<String>) -> Self {
        Self {
            path: path.into(),
            metadata_columns,
        }
    }

    /// Sink writing `scraped_data_<retailer>.csv` inside `dir`
    pub fn for_retailer(dir: &Path, retailer: &str, metadata_columns: Vec<String>) -> Self {
        Self::new(
            dir.join(format!("scraped_data_{}.csv", retailer)),
            metadata_columns,
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Sink for CsvSink {
    fn name(&self) -> &str {
        "csv"
    }

    fn write_batch(&mut self, records: &[OutcomeRecord]) -> SinkResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let is_new = file.metadata()?.len() == 0;

        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);

        if is_new {
            writer.write_record(header(&self.metadata_columns))?;
        }

        let date = Utc::now().format(DATE_FORMAT).to_string();
        for record in records {
            let metadata = self
                .metadata_columns
                .iter()
                .map(|column| record.metadata.get(column).unwrap_or(""));
            let (title, price, stock) = outcome_cells(&record.outcome);

            let mut row: Vec<&str> = vec![date.as_str(), record.identifier.as_str()];
            row.extend(metadata);
            row.extend([
                title.as_str(),
                price.as_str(),
                stock.as_str(),
                outcome_label(&record.outcome),
                record.target.as_deref().unwrap_or(NO_TARGET),
            ]);
            writer.write_record(&row)?;
        }

        writer.flush()?;
        Ok(())
    }
}

/// Header row: `Date, ItemId, <metadata columns>, ProductTitle, Price, StockAvailability, Outcome, URL`
pub fn header(metadata_columns: &[String]) -> Vec<String> {
    let mut header = vec!["Date".to_string(), "ItemId".to_string()];
    header.extend(metadata_columns.iter().cloned());
    header.extend(
        ["ProductTitle", "Price", "StockAvailability", "Outcome", "URL"]
            .iter()
            .map(|s| s.to_string()),
    );
    header
}

/// Title, price and stock cells for an outcome, with sentinels for non-successes
pub fn outcome_cells(outcome: &FetchOutcome) -> (String, String, String) {
    match outcome {
        FetchOutcome::Success {
            title,
            price,
            stock,
        } => (
            title.clone().unwrap_or_default(),
            price.clone().unwrap_or_default(),
            stock_label(stock.is_available()).to_string(),
        ),
        FetchOutcome::NotFound => sentinel(NOT_FOUND),
        FetchOutcome::TransientFailure { .. } => sentinel(UNSUCCESSFUL),
        FetchOutcome::MissingTarget => sentinel(NO_TARGET),
    }
}

pub fn stock_label(available: bool) -> &'static str {
    if available {
        "In Stock"
    } else {
        "Out of Stock"
    }
}

fn outcome_label(outcome: &FetchOutcome) -> &'static str {
    outcome.kind().to_db_string()
}

fn sentinel(text: &str) -> (String, String, String) {
    (text.to_string(), text.to_string(), text.to_string())
}
