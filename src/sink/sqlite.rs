//! SQLite store and sink
//!
//! `Database` owns the connection and every query; `SqliteSink` binds it to one run of one
//! retailer and implements [`Sink`].

use crate::sink::schema::initialize_schema;
use crate::sink::traits::{Sink, SinkResult};
use crate::sink::{ObservationRecord, RunRecord, RunStatus};
use crate::state::{FetchOutcome, OutcomeKind, OutcomeRecord, RunState};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;
use std::path::Path;

/// SQLite-backed store for runs and observations
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens (or creates) a database file and applies the schema
    pub fn open(path: &Path) -> SinkResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn open_in_memory() -> SinkResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    // ===== Run Management =====

    /// Creates a new run and returns its ID
    pub fn create_run(&mut self, retailer: &str, config_hash: &str) -> SinkResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (retailer, started_at, config_hash, status) VALUES (?1, ?2, ?3, ?4)",
            params![retailer, now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Marks a run as completed and stores its final counts
    pub fn complete_run(&mut self, run_id: i64, state: &RunState) -> SinkResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, total = ?3, success = ?4,
                 not_found = ?5, failed = ?6, missing_target = ?7
             WHERE id = ?8",
            params![
                RunStatus::Completed.to_db_string(),
                now,
                state.total() as i64,
                state.count(OutcomeKind::Success) as i64,
                state.count(OutcomeKind::NotFound) as i64,
                state.count(OutcomeKind::TransientFailure) as i64,
                state.count(OutcomeKind::MissingTarget) as i64,
                run_id
            ],
        )?;
        Ok(())
    }

    /// Gets a run by ID
    pub fn get_run(&self, run_id: i64) -> SinkResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, retailer, started_at, finished_at, config_hash, status
                 FROM runs WHERE id = ?1",
                params![run_id],
                run_from_row,
            )
            .optional()?;
        Ok(run)
    }

    /// Gets the most recent run of every retailer, ordered by retailer name
    pub fn latest_runs(&self) -> SinkResult<Vec<RunRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, retailer, started_at, finished_at, config_hash, status
             FROM runs
             WHERE id IN (SELECT MAX(id) FROM runs GROUP BY retailer)
             ORDER BY retailer",
        )?;

        let runs = stmt
            .query_map([], run_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(runs)
    }

    // ===== Observations =====

    /// Upserts a batch of outcomes in one transaction
    ///
    /// A repeated identifier within a run replaces the earlier row.
    pub fn upsert_observations(
        &mut self,
        run_id: i64,
        retailer: &str,
        records: &[OutcomeRecord],
        observed_at: DateTime<Utc>,
    ) -> SinkResult<usize> {
        let observed_at_text = observed_at.to_rfc3339();
        let observed_date = observed_at.date_naive().format("%Y-%m-%d").to_string();

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO observations (run_id, retailer, identifier, observed_at, observed_date,
                     target, title, price_text, price, in_stock, outcome, last_error, attempts, metadata)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
                 ON CONFLICT(run_id, identifier) DO UPDATE SET
                     observed_at = excluded.observed_at,
                     observed_date = excluded.observed_date,
                     target = excluded.target,
                     title = excluded.title,
                     price_text = excluded.price_text,
                     price = excluded.price,
                     in_stock = excluded.in_stock,
                     outcome = excluded.outcome,
                     last_error = excluded.last_error,
                     attempts = excluded.attempts,
                     metadata = excluded.metadata",
            )?;

            for record in records {
                let (title, price_text, in_stock, last_error) = match &record.outcome {
                    FetchOutcome::Success {
                        title,
                        price,
                        stock,
                    } => (
                        title.as_deref(),
                        price.as_deref(),
                        Some(stock.is_available()),
                        None,
                    ),
                    FetchOutcome::TransientFailure { last_error } => {
                        (None, None, None, Some(last_error.as_str()))
                    }
                    FetchOutcome::NotFound | FetchOutcome::MissingTarget => (None, None, None, None),
                };

                stmt.execute(params![
                    run_id,
                    retailer,
                    record.identifier,
                    observed_at_text,
                    observed_date,
                    record.target,
                    title,
                    price_text,
                    price_text.and_then(parse_price),
                    in_stock,
                    record.kind().to_db_string(),
                    last_error,
                    record.attempts,
                    record.metadata.to_json(),
                ])?;
            }
        }
        tx.commit()?;

        Ok(records.len())
    }

    /// Counts the observations of one run by outcome
    pub fn outcome_counts(&self, run_id: i64) -> SinkResult<BTreeMap<OutcomeKind, u64>> {
        let mut stmt = self.conn.prepare(
            "SELECT outcome, COUNT(*) FROM observations WHERE run_id = ?1 GROUP BY outcome",
        )?;

        let rows = stmt.query_map(params![run_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut counts = BTreeMap::new();
        for row in rows {
            let (outcome, count) = row?;
            if let Some(kind) = OutcomeKind::from_db_string(&outcome) {
                counts.insert(kind, count as u64);
            }
        }
        Ok(counts)
    }

    /// Gets every observation recorded on a UTC calendar date
    pub fn observations_on(&self, date: NaiveDate) -> SinkResult<Vec<ObservationRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT run_id, retailer, identifier, observed_at, target, title, price_text, price,
                    in_stock, outcome, last_error, attempts, metadata
             FROM observations
             WHERE observed_date = ?1
             ORDER BY retailer, run_id, id",
        )?;

        let observations = stmt
            .query_map(params![date.format("%Y-%m-%d").to_string()], |row| {
                Ok(ObservationRecord {
                    run_id: row.get(0)?,
                    retailer: row.get(1)?,
                    identifier: row.get(2)?,
                    observed_at: row.get(3)?,
                    target: row.get(4)?,
                    title: row.get(5)?,
                    price_text: row.get(6)?,
                    price: row.get(7)?,
                    in_stock: row.get(8)?,
                    outcome: OutcomeKind::from_db_string(&row.get::<_, String>(9)?)
                        .unwrap_or(OutcomeKind::TransientFailure),
                    last_error: row.get(10)?,
                    attempts: row.get(11)?,
                    metadata: row.get(12)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(observations)
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        retailer: row.get(1)?,
        started_at: row.get(2)?,
        finished_at: row.get(3)?,
        config_hash: row.get(4)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(5)?).unwrap_or(RunStatus::Running),
    })
}

/// Extracts a number from price text by dropping everything but digits, `.` and `-`
///
/// `"$1,299.99"` becomes `1299.99`. Text with no parsable number yields `None`.
pub fn parse_price(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    cleaned.parse().ok()
}

/// Sink that records one run of one retailer in SQLite
pub struct SqliteSink {
    db: Database,
    retailer: String,
    run_id: i64,
}

impl SqliteSink {
    /// Starts a new run in the database
    pub fn new(mut db: Database, retailer: &str, config_hash: &str) -> SinkResult<Self> {
        let run_id = db.create_run(retailer, config_hash)?;
        tracing::debug!("Created run {} for {}", run_id, retailer);
        Ok(Self {
            db,
            retailer: retailer.to_string(),
            run_id,
        })
    }

    pub fn run_id(&self) -> i64 {
        self.run_id
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

impl Sink for SqliteSink {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn write_batch(&mut self, records: &[OutcomeRecord]) -> SinkResult<()> {
        let written = self
            .db
            .upsert_observations(self.run_id, &self.retailer, records, Utc::now())?;
        tracing::debug!("Stored {} observations for run {}", written, self.run_id);
        Ok(())
    }

    fn finish(&mut self, state: &RunState) -> SinkResult<()> {
        self.db.complete_run(self.run_id, state)
    }
}
