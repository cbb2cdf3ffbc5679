//! Sink trait and error types
//!
//! A sink receives one batch of outcome records at a time. The batch runner logs a failed write and
//! moves on, so a sink that needs stronger guarantees must provide them itself (the SQLite sink
//! wraps each batch in a transaction).

use crate::state::{OutcomeRecord, RunState};
use thiserror::Error;

/// Errors that can occur while persisting outcomes
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Sink is closed")]
    Closed,

    #[error("{failed} of {total} sinks failed: {messages}")]
    Partial {
        failed: usize,
        total: usize,
        messages: String,
    },
}

/// Result type for sink operations
pub type SinkResult<T> = Result<T, SinkError>;

/// Trait for outcome destinations
pub trait Sink {
    /// Short name used in log lines
    fn name(&self) -> &str;

    /// Persists one batch of records, in the order given
    fn write_batch(&mut self, records: &[OutcomeRecord]) -> SinkResult<()>;

    /// Called once after the last batch of a run
    fn finish(&mut self, _state: &RunState) -> SinkResult<()> {
        Ok(())
    }
}
