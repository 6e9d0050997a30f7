use crate::error::PipelineError;
use crate::record::Record;

/// Lazy, single-pass sequence of records.
///
/// Errors travel in-band. A stream that yields an error yields nothing after it.
pub type RecordStream<'a> = Box<dyn Iterator<Item = Result<Record, PipelineError>> + 'a>;

/// Processing pipeline: transforms a stream of event records into a stream
/// of output records for the serializer.
///
/// Evaluation is pull-based: `transform` does no work by itself, each output
/// record is produced when the consumer asks for it. At most one traversal of
/// the returned stream is active at a time and any per-traversal state (such
/// as a batch being filled) belongs to that stream.
///
/// Implementations:
/// - `NoOpPipeline`: one output per event, every value gains a unit batch dimension
/// - `BatchPipeline`: groups events into fixed-size batches
pub trait ProcessingPipeline {
    /// Short name for logs (e.g. `"batch"`).
    fn name(&self) -> &'static str;

    fn transform<'a>(&'a self, input: RecordStream<'a>) -> RecordStream<'a>;
}

impl<P: ProcessingPipeline + ?Sized> ProcessingPipeline for Box<P> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn transform<'a>(&'a self, input: RecordStream<'a>) -> RecordStream<'a> {
        (**self).transform(input)
    }
}
