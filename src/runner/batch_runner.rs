//! Batch runner - the per-run orchestration loop
//!
//! Items are split into fixed-size batches. Items within a batch are fetched concurrently; batches
//! run one after another. Each batch is handed to the sink as soon as every item in it has a final
//! outcome, so a crash loses at most the batch in flight.

use crate::adapter::SiteAdapter;
use crate::config::RunnerConfig;
use crate::runner::fetcher::Fetcher;
use crate::sink::Sink;
use crate::source::ItemRecord;
use crate::state::{FetchOutcome, OutcomeKind, OutcomeRecord, RunState};
use futures::future::join_all;
use scraper::Html;
use std::time::{Duration, Instant};

/// Result of one complete run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub state: RunState,
    pub elapsed: Duration,
}

/// Drives a run over a list of items
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchRunner {
    batch_size: usize,

    /// Delay before one extra pass over a batch's retryable failures, if enabled
    retry_pass: Option<Duration>,
}

impl Default for BatchRunner {
    fn default() -> Self {
        Self::from_config(&RunnerConfig::default())
    }
}

impl BatchRunner {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
            retry_pass: None,
        }
    }

    /// Enables one extra pass over each batch's transient failures
    pub fn with_retry_pass(mut self, delay: Duration) -> Self {
        self.retry_pass = Some(delay);
        self
    }

    pub fn from_config(config: &RunnerConfig) -> Self {
        let runner = Self::new(config.batch_size);
        if config.batch_retry_pass {
            runner.with_retry_pass(Duration::from_millis(config.batch_retry_delay_ms))
        } else {
            runner
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Runs every item through fetch, classification and persistence
    ///
    /// Per-item failures never escape this function: they end up as outcomes. A failed sink write
    /// is logged and counted, and the next batch proceeds as usual.
    pub async fn run(
        &self,
        items: &[ItemRecord],
        adapter: &dyn SiteAdapter,
        fetcher: &Fetcher,
        sink: &mut dyn Sink,
    ) -> RunSummary {
        let start_time = Instant::now();
        let mut state = RunState::new();
        let total_batches = items.len().div_ceil(self.batch_size);

        tracing::info!(
            "[{}] Starting run: {} identifiers in {} batches of up to {}",
            adapter.name(),
            items.len(),
            total_batches,
            self.batch_size
        );

        for (index, batch) in items.chunks(self.batch_size).enumerate() {
            state.batch_dispatched();

            let mut slots = join_all(batch.iter().map(|item| process_item(item, adapter, fetcher))).await;

            if let Some(delay) = self.retry_pass {
                self.retry_failures(&mut slots, batch, adapter, fetcher, &state, delay)
                    .await;
            }

            let records: Vec<OutcomeRecord> = slots.into_iter().map(|slot| slot.record).collect();
            for record in &records {
                state.record(record);
            }

            let persisted = match sink.write_batch(&records) {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(
                        "[{}] Sink {} failed to persist batch {}/{}: {}",
                        adapter.name(),
                        sink.name(),
                        index + 1,
                        total_batches,
                        e
                    );
                    false
                }
            };
            state.batch_persisted(persisted);

            tracing::info!(
                "[{}] Batch {}/{} done: {} ok, {} not found, {} failed, {} missing target",
                adapter.name(),
                index + 1,
                total_batches,
                count(&records, OutcomeKind::Success),
                count(&records, OutcomeKind::NotFound),
                count(&records, OutcomeKind::TransientFailure),
                count(&records, OutcomeKind::MissingTarget)
            );
        }

        if let Err(e) = sink.finish(&state) {
            tracing::warn!("[{}] Sink {} failed to finish: {}", adapter.name(), sink.name(), e);
        }

        let elapsed = start_time.elapsed();
        tracing::info!(
            "[{}] Run complete in {:.1}s: {} identifiers, {} success, {} not found, {} failed, {} missing target, {} sink failures",
            adapter.name(),
            elapsed.as_secs_f64(),
            state.total(),
            state.count(OutcomeKind::Success),
            state.count(OutcomeKind::NotFound),
            state.count(OutcomeKind::TransientFailure),
            state.count(OutcomeKind::MissingTarget),
            state.sink_failures
        );
        if !state.failed_ids.is_empty() {
            tracing::info!(
                "[{}] Failed identifiers: {}",
                adapter.name(),
                state.failed_ids.join(", ")
            );
        }

        RunSummary { state, elapsed }
    }

    /// Re-fetches the retryable failures of one batch, once
    async fn retry_failures(
        &self,
        slots: &mut [Slot],
        batch: &[ItemRecord],
        adapter: &dyn SiteAdapter,
        fetcher: &Fetcher,
        state: &RunState,
        delay: Duration,
    ) {
        let retry: Vec<usize> = slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.retryable && !state.is_terminal(&slot.record.identifier))
            .map(|(i, _)| i)
            .collect();

        if retry.is_empty() {
            return;
        }

        tracing::info!(
            "[{}] Retrying {} failed identifier(s) in {}ms",
            adapter.name(),
            retry.len(),
            delay.as_millis()
        );
        tokio::time::sleep(delay).await;

        let retried = join_all(
            retry
                .iter()
                .map(|&i| process_item(&batch[i], adapter, fetcher)),
        )
        .await;

        for (i, mut slot) in retry.into_iter().zip(retried) {
            slot.record.attempts += slots[i].record.attempts;
            slots[i] = slot;
        }
    }
}

/// Runs items with the default batch size and no retry pass
pub async fn run_once(
    items: &[ItemRecord],
    adapter: &dyn SiteAdapter,
    fetcher: &Fetcher,
    sink: &mut dyn Sink,
) -> RunSummary {
    BatchRunner::default().run(items, adapter, fetcher, sink).await
}

/// Final outcome of one item plus whether a retry pass may revisit it
struct Slot {
    record: OutcomeRecord,
    retryable: bool,
}

async fn process_item(item: &ItemRecord, adapter: &dyn SiteAdapter, fetcher: &Fetcher) -> Slot {
    let Some(url) = adapter.build_target(item) else {
        tracing::debug!("[{}] No target for {}", adapter.name(), item.identifier);
        return Slot {
            record: record(item, None, FetchOutcome::MissingTarget, 0),
            retryable: false,
        };
    };

    match fetcher.fetch(&url, adapter).await {
        Ok(fetched) => {
            let outcome = classify_body(adapter, &fetched.body);
            tracing::debug!(
                "[{}] {} -> {}",
                adapter.name(),
                item.identifier,
                outcome.kind()
            );
            Slot {
                record: record(item, Some(url.to_string()), outcome, fetched.attempts),
                retryable: false,
            }
        }
        Err(e) => Slot {
            record: record(
                item,
                Some(url.to_string()),
                FetchOutcome::TransientFailure {
                    last_error: e.last_error.to_string(),
                },
                e.attempts,
            ),
            retryable: !e.terminal,
        },
    }
}

fn classify_body(adapter: &dyn SiteAdapter, body: &str) -> FetchOutcome {
    let document = Html::parse_document(body);
    adapter.classify(&document).into()
}

fn record(item: &ItemRecord, target: Option<String>, outcome: FetchOutcome, attempts: u32) -> OutcomeRecord {
    OutcomeRecord {
        identifier: item.identifier.clone(),
        target,
        metadata: item.metadata.clone(),
        outcome,
        attempts,
    }
}

fn count(records: &[OutcomeRecord], kind: OutcomeKind) -> usize {
    records.iter().filter(|r| r.kind() == kind).count()
}
