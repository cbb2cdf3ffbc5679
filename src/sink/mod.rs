//! Sink module for persisting outcomes
//!
//! This module handles every destination a batch can be written to:
//! - Append-only CSV files, one per retailer
//! - A SQLite database with run tracking and per-run observation upserts
//! - A fan-out sink that writes to several of the above

mod csv_sink;
mod fan_out;
mod schema;
mod sqlite;
mod traits;

pub use csv_sink::{header, outcome_cells, stock_label, CsvSink, NOT_FOUND, NO_TARGET, UNSUCCESSFUL};
pub use fan_out::FanOutSink;
pub use sqlite::{parse_price, Database, SqliteSink};
pub use traits::{Sink, SinkError, SinkResult};

use crate::state::OutcomeKind;

/// Represents a retailer run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub retailer: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
}

/// Represents one stored observation
#[derive(Debug, Clone)]
pub struct ObservationRecord {
    pub run_id: i64,
    pub retailer: String,
    pub identifier: String,
    pub observed_at: String,
    pub target: Option<String>,
    pub title: Option<String>,
    pub price_text: Option<String>,
    pub price: Option<f64>,
    pub in_stock: Option<bool>,
    pub outcome: OutcomeKind,
    pub last_error: Option<String>,
    pub attempts: u32,

    /// Passthrough metadata as a JSON object
    pub metadata: String,
}

/// Status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}
