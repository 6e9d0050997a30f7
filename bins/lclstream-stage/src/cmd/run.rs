use std::cell::Cell;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};

use lclstream_api::{ProcessingPipeline, RecordStream};
use lclstream_engine::build_pipeline;
use lclstream_io::{NdjsonSink, NdjsonSource};

use crate::config::RunArgs;
use crate::error::StageError;

/// Event and output record counts of one stage run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub events: usize,
    pub records: usize,
}

pub fn run(args: RunArgs) -> Result<(), StageError> {
    let config = args.stage_config()?;
    let pipeline = build_pipeline(&config.pipeline)?;

    let input = open_input(&args.input)?;
    let output = open_output(&args.output)?;

    tracing::info!(
        pipeline = pipeline.name(),
        input = %args.input,
        output = %args.output,
        "stage started"
    );
    let summary = process(pipeline.as_ref(), input, output, args.max_line_length)?;
    tracing::info!(
        events = summary.events,
        records = summary.records,
        "processed {} events -> {} records",
        summary.events,
        summary.records
    );
    Ok(())
}

/// Pull every event from `input` through `pipeline` and write the results.
///
/// Stops at the first error; records written before it stay in `output`.
pub fn process<R: BufRead, W: Write>(
    pipeline: &dyn ProcessingPipeline,
    input: R,
    output: W,
    max_line_length: usize,
) -> Result<Summary, StageError> {
    let events = Cell::new(0_usize);
    let source: RecordStream<'_> = Box::new(
        NdjsonSource::new(input)
            .with_max_length(max_line_length)
            .inspect(|item| {
                if item.is_ok() {
                    events.set(events.get() + 1);
                }
            }),
    );

    let mut sink = NdjsonSink::new(output);
    for record in pipeline.transform(source) {
        sink.write(&record?)?;
    }
    let records = sink.written();
    sink.finish()?;

    Ok(Summary {
        events: events.get(),
        records,
    })
}

fn open_input(path: &str) -> Result<Box<dyn BufRead>, StageError> {
    if path == "-" {
        return Ok(Box::new(io::stdin().lock()));
    }
    let file = File::open(path).map_err(|source| StageError::Open {
        context: "input",
        path: path.to_string(),
        source,
    })?;
    Ok(Box::new(BufReader::new(file)))
}

fn open_output(path: &str) -> Result<Box<dyn Write>, StageError> {
    if path == "-" {
        return Ok(Box::new(BufWriter::new(io::stdout().lock())));
    }
    let file = File::create(path).map_err(|source| StageError::Open {
        context: "output",
        path: path.to_string(),
        source,
    })?;
    Ok(Box::new(BufWriter::new(file)))
}
