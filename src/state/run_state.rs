//! Per-run bookkeeping
//!
//! One `RunState` is created per run and threaded through the batch loop. It is only used for
//! reporting and for keeping terminal identifiers out of retry passes; the sink's records remain the
//! authoritative result.

use crate::state::{OutcomeKind, OutcomeRecord};
use std::collections::{BTreeMap, HashSet};

/// Running counts and identifier lists for a single run
#[derive(Debug, Clone, Default)]
pub struct RunState {
    counts: BTreeMap<OutcomeKind, u64>,

    /// Identifiers that reached a terminal NotFound; never attempted again this run
    terminal: HashSet<String>,

    /// Identifiers that ended as transient failures, in processing order
    pub failed_ids: Vec<String>,

    /// Identifiers without a request target, in processing order
    pub missing_ids: Vec<String>,

    pub batches_dispatched: usize,
    pub batches_persisted: usize,
    pub sink_failures: usize,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the final outcome of one identifier
    pub fn record(&mut self, record: &OutcomeRecord) {
        let kind = record.kind();
        *self.counts.entry(kind).or_insert(0) += 1;

        match kind {
            OutcomeKind::NotFound => {
                self.terminal.insert(record.identifier.clone());
            }
            OutcomeKind::TransientFailure => self.failed_ids.push(record.identifier.clone()),
            OutcomeKind::MissingTarget => self.missing_ids.push(record.identifier.clone()),
            OutcomeKind::Success => {}
        }
    }

    /// Returns true if the identifier already reached a terminal outcome this run
    pub fn is_terminal(&self, identifier: &str) -> bool {
        self.terminal.contains(identifier)
    }

    /// Returns the count for one outcome kind
    pub fn count(&self, kind: OutcomeKind) -> u64 {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    /// Total number of identifiers with a recorded outcome
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Marks a batch as dispatched to the fetcher
    pub fn batch_dispatched(&mut self) {
        self.batches_dispatched += 1;
    }

    /// Marks the outcome of handing a batch to the sink
    pub fn batch_persisted(&mut self, ok: bool) {
        if ok {
            self.batches_persisted += 1;
        } else {
            self.sink_failures += 1;
        }
    }
}
