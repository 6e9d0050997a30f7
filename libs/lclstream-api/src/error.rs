use std::fmt;

use crate::value::FieldSignature;

/// Error kind for pipeline errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid pipeline parameters. Permanent; fails at construction.
    Config,
    /// Events that cannot be combined into one batch.
    Shape,
    /// Data that does not map onto the record model.
    Format,
    /// Source or sink I/O.
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Config => f.write_str("config"),
            ErrorKind::Shape => f.write_str("shape"),
            ErrorKind::Format => f.write_str("format"),
            ErrorKind::Io => f.write_str("io"),
        }
    }
}

/// Error carried by record streams and returned by pipeline constructors.
///
/// `event` fields are zero-based positions inside the batch being filled.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("config error: {0}")]
    Config(String),

    #[error(
        "field set mismatch at event {event}: missing [{}], unexpected [{}]",
        .missing.join(", "),
        .unexpected.join(", ")
    )]
    FieldSetMismatch {
        event: usize,
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    #[error("shape mismatch at event {event}, field '{field}': expected {expected}, found {found}")]
    ShapeMismatch {
        event: usize,
        field: String,
        expected: FieldSignature,
        found: FieldSignature,
    },

    #[error("malformed value: {0}")]
    MalformedValue(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<PipelineError>,
    },
}

impl PipelineError {
    pub fn config(msg: impl Into<String>) -> Self {
        PipelineError::Config(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        PipelineError::MalformedValue(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Config(_) => ErrorKind::Config,
            PipelineError::FieldSetMismatch { .. } | PipelineError::ShapeMismatch { .. } => {
                ErrorKind::Shape
            }
            PipelineError::MalformedValue(_) | PipelineError::Json(_) => ErrorKind::Format,
            PipelineError::Io(_) => ErrorKind::Io,
            PipelineError::Context { source, .. } => source.kind(),
        }
    }

    /// Add context to the error, preserving the original `ErrorKind`.
    ///
    /// Produces: `"context: original message"`.
    pub fn with_context(self, ctx: impl fmt::Display) -> Self {
        match self {
            PipelineError::Config(msg) => PipelineError::Config(format!("{ctx}: {msg}")),
            PipelineError::MalformedValue(msg) => {
                PipelineError::MalformedValue(format!("{ctx}: {msg}"))
            }
            other => PipelineError::Context {
                context: ctx.to_string(),
                source: Box::new(other),
            },
        }
    }
}
