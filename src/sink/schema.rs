//! Database schema definitions
//!
//! This module contains the SQL schema for the Price-Sweep database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per retailer run
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    retailer TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    total INTEGER,
    success INTEGER,
    not_found INTEGER,
    failed INTEGER,
    missing_target INTEGER
);

CREATE INDEX IF NOT EXISTS idx_runs_retailer ON runs(retailer);

-- One row per identifier per run
CREATE TABLE IF NOT EXISTS observations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    retailer TEXT NOT NULL,
    identifier TEXT NOT NULL,
    observed_at TEXT NOT NULL,
    observed_date TEXT NOT NULL,
    target TEXT,
    title TEXT,
    price_text TEXT,
    price REAL,
    in_stock INTEGER,
    outcome TEXT NOT NULL,
    last_error TEXT,
    attempts INTEGER NOT NULL,
    metadata TEXT NOT NULL,
    UNIQUE(run_id, identifier)
);

CREATE INDEX IF NOT EXISTS idx_observations_date ON observations(observed_date);
CREATE INDEX IF NOT EXISTS idx_observations_identifier ON observations(retailer, identifier);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
