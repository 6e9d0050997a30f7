mod batch;
mod noop;

pub use batch::BatchPipeline;
pub use noop::NoOpPipeline;
