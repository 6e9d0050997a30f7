use serde::{Deserialize, Serialize};

use lclstream_api::PipelineError;

/// Parameters of the no-op pipeline. It takes none.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NoOpPipelineParameters {}

/// Parameters of the batching pipeline.
///
/// `batch_size` is kept signed so that zero and negative values reach
/// `BatchPipeline::new` and are rejected with a config error there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatchPipelineParameters {
    pub batch_size: i64,
}

/// Which processing pipeline to run, with its parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineConfig {
    #[serde(alias = "noop")]
    NoOp(NoOpPipelineParameters),
    Batch(BatchPipelineParameters),
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig::NoOp(NoOpPipelineParameters::default())
    }
}

/// Root configuration of a processing stage, parsed from TOML.
///
/// ```toml
/// [pipeline]
/// type = "batch"
/// batch_size = 32
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StageConfig {
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl StageConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self, PipelineError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::config(format!("{path}: {e}")))?;
        Self::parse(&content).map_err(|e| e.with_context(path))
    }

    /// Parse configuration from a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, PipelineError> {
        toml::from_str(toml_str).map_err(|e| PipelineError::config(e.to_string()))
    }
}
