pub mod accumulator;
pub mod bootstrap;
pub mod config;
pub mod pipelines;

pub use accumulator::Accumulator;
pub use bootstrap::build_pipeline;
pub use config::{BatchPipelineParameters, NoOpPipelineParameters, PipelineConfig, StageConfig};
pub use pipelines::{BatchPipeline, NoOpPipeline};
