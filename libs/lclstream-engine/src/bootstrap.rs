use lclstream_api::{PipelineError, ProcessingPipeline};

use crate::config::PipelineConfig;
use crate::pipelines::{BatchPipeline, NoOpPipeline};

/// Create the processing pipeline described by `config`.
///
/// Parameters are validated here, so an invalid configuration fails before
/// any record is read.
pub fn build_pipeline(
    config: &PipelineConfig,
) -> Result<Box<dyn ProcessingPipeline>, PipelineError> {
    let pipeline: Box<dyn ProcessingPipeline> = match config {
        PipelineConfig::NoOp(params) => {
            tracing::info!("created no-op pipeline");
            Box::new(NoOpPipeline::new(params.clone()))
        }
        PipelineConfig::Batch(params) => {
            let pipeline = BatchPipeline::new(params.clone())
                .map_err(|e| e.with_context("batch pipeline"))?;
            tracing::info!(batch_size = pipeline.batch_size(), "created batch pipeline");
            Box::new(pipeline)
        }
    };
    Ok(pipeline)
}
