pub mod error;
pub mod pipeline;
pub mod record;
pub mod value;

pub use error::{ErrorKind, PipelineError};
pub use pipeline::{ProcessingPipeline, RecordStream};
pub use record::Record;
pub use value::{Array, ArrayData, DType, FieldSignature, Value};
