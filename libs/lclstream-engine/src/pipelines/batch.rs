use std::iter::FusedIterator;
use std::num::NonZeroUsize;

use lclstream_api::{PipelineError, ProcessingPipeline, Record, RecordStream};

use crate::accumulator::Accumulator;
use crate::config::BatchPipelineParameters;

/// Groups events into batches of `batch_size`.
///
/// Every emitted batch holds exactly `batch_size` events except possibly the
/// last one, which carries whatever was pending when the input ended.
#[derive(Debug, Clone)]
pub struct BatchPipeline {
    batch_size: NonZeroUsize,
}

impl BatchPipeline {
    pub fn new(parameters: BatchPipelineParameters) -> Result<Self, PipelineError> {
        let batch_size = usize::try_from(parameters.batch_size)
            .ok()
            .and_then(NonZeroUsize::new)
            .ok_or_else(|| {
                PipelineError::config(format!(
                    "batch_size must be a positive integer, got {}",
                    parameters.batch_size
                ))
            })?;
        Ok(Self { batch_size })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size.get()
    }
}

impl ProcessingPipeline for BatchPipeline {
    fn name(&self) -> &'static str {
        "batch"
    }

    fn transform<'a>(&'a self, input: RecordStream<'a>) -> RecordStream<'a> {
        Box::new(Batches {
            input,
            accumulator: Accumulator::new(),
            batch_size: self.batch_size.get(),
            emitted: 0,
            done: false,
        })
    }
}

/// Output stream of one `BatchPipeline::transform` call. Owns the accumulator;
/// dropping it discards pending events.
struct Batches<'a> {
    input: RecordStream<'a>,
    accumulator: Accumulator,
    batch_size: usize,
    emitted: usize,
    done: bool,
}

impl Batches<'_> {
    fn flush(&mut self) -> Option<Record> {
        let events = self.accumulator.size();
        let batch = self.accumulator.take()?;
        self.emitted += 1;
        tracing::debug!(
            batch = self.emitted,
            events,
            full = events >= self.batch_size,
            "emitting batch"
        );
        Some(batch)
    }

    fn fail(&mut self, err: PipelineError) -> Option<Result<Record, PipelineError>> {
        self.done = true;
        let discarded = self.accumulator.size();
        self.accumulator.clear();
        tracing::warn!(error = %err, discarded, "batch stream failed");
        Some(Err(err))
    }
}

impl Iterator for Batches<'_> {
    type Item = Result<Record, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            match self.input.next() {
                Some(Ok(event)) => {
                    if let Err(err) = self.accumulator.add(event) {
                        return self.fail(err);
                    }
                    if self.accumulator.size() >= self.batch_size {
                        return self.flush().map(Ok);
                    }
                }
                Some(Err(err)) => return self.fail(err),
                None => {
                    self.done = true;
                    return self.flush().map(Ok);
                }
            }
        }
    }
}

impl FusedIterator for Batches<'_> {}
