use std::iter::FusedIterator;

use lclstream_api::{PipelineError, ProcessingPipeline, Record, RecordStream};

use crate::config::NoOpPipelineParameters;

/// Forwards every event unchanged except for shape: each value gains a
/// leading batch dimension of size 1, so the serializer always sees batches.
#[derive(Debug, Default, Clone)]
pub struct NoOpPipeline;

impl NoOpPipeline {
    pub fn new(_parameters: NoOpPipelineParameters) -> Self {
        Self
    }
}

impl ProcessingPipeline for NoOpPipeline {
    fn name(&self) -> &'static str {
        "noop"
    }

    fn transform<'a>(&'a self, input: RecordStream<'a>) -> RecordStream<'a> {
        Box::new(Promoted { input, done: false })
    }
}

/// Output stream of `NoOpPipeline::transform`: one record per input, ending
/// after the first error.
struct Promoted<'a> {
    input: RecordStream<'a>,
    done: bool,
}

impl Iterator for Promoted<'_> {
    type Item = Result<Record, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.input.next() {
            Some(Ok(event)) => Some(Ok(event.batched())),
            Some(Err(err)) => {
                self.done = true;
                tracing::warn!(error = %err, "no-op stream failed");
                Some(Err(err))
            }
            None => {
                self.done = true;
                None
            }
        }
    }
}

impl FusedIterator for Promoted<'_> {}
