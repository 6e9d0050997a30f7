//! Newline-delimited JSON adapters: one record per line.
//!
//! Input lines are JSON objects mapping field names to numbers, strings or
//! nested lists. Output lines use the same encoding, so a batch record is an
//! object of nested lists whose outer length is the batch size.

mod sink;
mod source;

pub use sink::NdjsonSink;
pub use source::NdjsonSource;
