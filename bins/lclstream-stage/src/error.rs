use lclstream_api::PipelineError;

#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("open {context} '{path}': {source}")]
    Open {
        context: &'static str,
        path: String,
        source: std::io::Error,
    },

    #[error("{0}")]
    Pipeline(#[from] PipelineError),
}
