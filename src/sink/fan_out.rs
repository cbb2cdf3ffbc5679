//! Sink that forwards every batch to several sinks

use crate::sink::traits::{Sink, SinkError, SinkResult};
use crate::state::{OutcomeRecord, RunState};

/// Writes each batch to every inner sink
///
/// All sinks are attempted even if an earlier one fails; the batch is reported as failed if any
/// of them failed.
#[derive(Default)]
pub struct FanOutSink {
    sinks: Vec<Box<dyn Sink + Send>>,
}

impl FanOutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sink: Box<dyn Sink + Send>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    fn for_each(
        &mut self,
        mut op: impl FnMut(&mut (dyn Sink + Send)) -> SinkResult<()>,
    ) -> SinkResult<()> {
        let total = self.sinks.len();
        let errors: Vec<String> = self
            .sinks
            .iter_mut()
            .filter_map(|sink| match op(sink.as_mut()) {
                Ok(()) => None,
                Err(e) => Some(format!("{}: {}", sink.name(), e)),
            })
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(SinkError::Partial {
                failed: errors.len(),
                total,
                messages: errors.join("; "),
            })
        }
    }
}

impl Sink for FanOutSink {
    fn name(&self) -> &str {
        "fan-out"
    }

    fn write_batch(&mut self, records: &[OutcomeRecord]) -> SinkResult<()> {
        self.for_each(|sink| sink.write_batch(records))
    }

    fn finish(&mut self, state: &RunState) -> SinkResult<()> {
        self.for_each(|sink| sink.finish(state))
    }
}
