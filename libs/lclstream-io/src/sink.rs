use std::io::Write;

use lclstream_api::{PipelineError, Record};

/// Writes one record per line.
pub struct NdjsonSink<W> {
    writer: W,
    written: usize,
}

impl<W: Write> NdjsonSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    pub fn write(&mut self, record: &Record) -> Result<(), PipelineError> {
        serde_json::to_writer(&mut self.writer, record)
            .map_err(|e| PipelineError::from(e).with_context(format!("record {}", self.written)))?;
        self.writer.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    /// Number of records written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Flush and hand back the writer.
    pub fn finish(mut self) -> Result<W, PipelineError> {
        self.writer.flush()?;
        tracing::debug!(records = self.written, "sink flushed");
        Ok(self.writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lclstream_api::{Array, ArrayData};

    #[test]
    fn writes_one_json_object_per_line() {
        let mut sink = NdjsonSink::new(Vec::new());
        let image = Array::new(vec![2, 1, 2], ArrayData::Int(vec![1, 2, 3, 4])).unwrap();
        sink.write(&Record::new().with("image", image).with("id", Array::from(vec![7_i64, 8])))
            .unwrap();
        sink.write(&Record::new().with("e", Array::from(vec![0.5]))).unwrap();
        assert_eq!(sink.written(), 2);

        let out = String::from_utf8(sink.finish().unwrap()).unwrap();
        assert_eq!(
            out,
            "{\"image\":[[[1,2]],[[3,4]]],\"id\":[7,8]}\n{\"e\":[0.5]}\n"
        );
    }

    #[test]
    fn output_parses_back_into_the_same_records() {
        let record = Record::new()
            .with("label", Array::from(vec!["a".to_string(), "b".to_string()]))
            .with("energy", Array::from(vec![9.25, 9.5]));
        let mut sink = NdjsonSink::new(Vec::new());
        sink.write(&record).unwrap();
        let bytes = sink.finish().unwrap();

        let parsed: Vec<Record> = crate::NdjsonSource::new(bytes.as_slice())
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(parsed, vec![record]);
    }
}
