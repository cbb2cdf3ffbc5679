//! Statistics generation from the observations database
//!
//! This module reports the latest run of every retailer with its outcome counts.

use crate::sink::{Database, RunRecord, RunStatus, SinkResult};
use crate::state::OutcomeKind;
use std::collections::BTreeMap;

/// Outcome counts for one retailer's latest run
#[derive(Debug, Clone)]
pub struct RetailerStatistics {
    pub run: RunRecord,

    /// Observation counts by outcome kind
    pub counts: BTreeMap<OutcomeKind, u64>,
}

impl RetailerStatistics {
    pub fn count(&self, kind: OutcomeKind) -> u64 {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Share of observations that produced a product page, in percent
    pub fn success_rate(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            self.count(OutcomeKind::Success) as f64 / total as f64 * 100.0
        }
    }
}

/// Loads statistics for the latest run of every retailer
pub fn load_statistics(db: &Database) -> SinkResult<Vec<RetailerStatistics>> {
    db.latest_runs()?
        .into_iter()
        .map(|run| {
            let counts = db.outcome_counts(run.id)?;
            Ok(RetailerStatistics { run, counts })
        })
        .collect()
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &[RetailerStatistics]) {
    println!("=== Price-Sweep Statistics ===\n");

    if stats.is_empty() {
        println!("No runs recorded yet.");
        return;
    }

    for entry in stats {
        let status = match entry.run.status {
            RunStatus::Completed => "completed",
            RunStatus::Running => "running or interrupted",
        };
        println!("{} (run {}, {})", entry.run.retailer, entry.run.id, status);
        println!("  Started: {}", entry.run.started_at);
        if let Some(finished) = &entry.run.finished_at {
            println!("  Finished: {}", finished);
        }
        for kind in OutcomeKind::ALL {
            println!("  {}: {}", kind, entry.count(kind));
        }
        println!(
            "  Success Rate: {:.1}% ({} / {} identifiers)",
            entry.success_rate(),
            entry.count(OutcomeKind::Success),
            entry.total()
        );
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Metadata;
    use crate::state::{FetchOutcome, OutcomeRecord, StockState};
    use chrono::Utc;

    fn record(id: &str, outcome: FetchOutcome) -> OutcomeRecord {
        OutcomeRecord {
            identifier: id.to_string(),
            target: None,
            metadata: Metadata::new(),
            outcome,
            attempts: 1,
        }
    }

    #[test]
    fn test_load_statistics_uses_latest_run() {
        let mut db = Database::open_in_memory().unwrap();
        let old = db.create_run("acme", "h").unwrap();
        db.upsert_observations(old, "acme", &[record("A", FetchOutcome::NotFound)], Utc::now())
            .unwrap();

        let new = db.create_run("acme", "h").unwrap();
        db.upsert_observations(
            new,
            "acme",
            &[
                record(
                    "A",
                    FetchOutcome::Success {
                        title: None,
                        price: None,
                        stock: StockState::InStock,
                    },
                ),
                record("B", FetchOutcome::MissingTarget),
            ],
            Utc::now(),
        )
        .unwrap();

        let stats = load_statistics(&db).unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].run.id, new);
        assert_eq!(stats[0].total(), 2);
        assert_eq!(stats[0].count(OutcomeKind::NotFound), 0);
        assert!((stats[0].success_rate() - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_database() {
        let db = Database::open_in_memory().unwrap();
        assert!(load_statistics(&db).unwrap().is_empty());
    }
}
