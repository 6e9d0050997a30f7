use std::io::{BufRead, Read};

use lclstream_api::{PipelineError, Record};

/// Reads one event record per line.
///
/// Blank lines are skipped and a trailing `\r` is dropped. The first error
/// (I/O, bad JSON, unsupported value) is yielded once and ends the stream.
pub struct NdjsonSource<R> {
    reader: R,
    buf: Vec<u8>,
    line: usize,
    max_length: usize,
    done: bool,
}

impl<R: BufRead> NdjsonSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            line: 0,
            max_length: 0,
            done: false,
        }
    }

    /// Reject lines longer than `max_length` bytes (0 = unlimited).
    ///
    /// At most `max_length` plus the line terminator is buffered per line.
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    fn read_record(&mut self) -> Option<Result<Record, PipelineError>> {
        // room for the longest accepted line and its "\r\n"
        let limit = match self.max_length {
            0 => u64::MAX,
            max => (max as u64).saturating_add(2),
        };
        loop {
            self.buf.clear();
            match (&mut self.reader).take(limit).read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(_) => self.line += 1,
                Err(e) => {
                    return Some(Err(
                        PipelineError::from(e).with_context(format!("line {}", self.line + 1))
                    ));
                }
            }

            let text = self.buf.strip_suffix(b"\n").unwrap_or(&self.buf[..]);
            let text = text.strip_suffix(b"\r").unwrap_or(text);
            if text.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            if self.max_length > 0 && text.len() > self.max_length {
                return Some(Err(PipelineError::malformed(format!(
                    "line {}: line too long: more than {} bytes",
                    self.line, self.max_length
                ))));
            }

            let parsed = serde_json::from_slice::<Record>(text)
                .map_err(|e| PipelineError::from(e).with_context(format!("line {}", self.line)));
            return Some(parsed);
        }
    }
}

impl<R: BufRead> Iterator for NdjsonSource<R> {
    type Item = Result<Record, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = self.read_record();
        match &item {
            None => {
                self.done = true;
                tracing::debug!(lines = self.line, "source exhausted");
            }
            Some(Err(e)) => {
                self.done = true;
                tracing::warn!(error = %e, "source failed");
            }
            Some(Ok(_)) => {}
        }
        item
    }
}
