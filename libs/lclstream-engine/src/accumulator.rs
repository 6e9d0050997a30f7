use indexmap::IndexMap;

use lclstream_api::{Array, DType, FieldSignature, PipelineError, Record, Value};

/// One field of the batch being filled: expected per-event signature plus
/// the values stacked so far (leading dimension = number of events).
#[derive(Debug, Clone)]
struct Column {
    signature: FieldSignature,
    stacked: Array,
}

impl Column {
    /// Stack one more value, promoting the column or the value to float when
    /// integers and floats meet.
    fn push(&mut self, mut value: Value) -> Result<(), PipelineError> {
        if self.signature.dtype != value.dtype() {
            if self.signature.dtype == DType::Int {
                let stacked = std::mem::replace(&mut self.stacked, Array::from(Vec::<f64>::new()));
                self.stacked = stacked.into_float();
                self.signature.dtype = DType::Float;
                tracing::debug!(signature = %self.signature, "column promoted to float");
            } else {
                value = value.into_float();
            }
        }
        self.stacked.push_row(value)
    }
}

/// Collects event records until they are combined into one batch record.
///
/// The first event after a reset fixes the batch layout: its field names, in
/// its order, and the element type and shape of every field. Each later event
/// is validated against that layout when it is added; a rejected event leaves
/// the accumulator untouched. Integer and float values of the same shape share
/// a column, which then holds floats.
#[derive(Debug, Default)]
pub struct Accumulator {
    columns: IndexMap<String, Column>,
    count: usize,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one event record.
    pub fn add(&mut self, record: Record) -> Result<(), PipelineError> {
        if self.count == 0 {
            self.columns = record
                .into_iter()
                .map(|(name, value)| {
                    let column = Column {
                        signature: value.signature(),
                        stacked: value.batched(),
                    };
                    (name, column)
                })
                .collect();
            self.count = 1;
            tracing::trace!(fields = self.columns.len(), "batch layout fixed by first event");
            return Ok(());
        }

        self.check(&record)?;
        for (name, value) in record {
            if let Some(column) = self.columns.get_mut(&name) {
                column.push(value)?;
            }
        }
        self.count += 1;
        tracing::trace!(pending = self.count, "event accepted");
        Ok(())
    }

    fn check(&self, record: &Record) -> Result<(), PipelineError> {
        let missing: Vec<String> = self
            .columns
            .keys()
            .filter(|name| !record.contains(name))
            .cloned()
            .collect();
        let unexpected: Vec<String> = record
            .names()
            .filter(|name| !self.columns.contains_key(*name))
            .map(String::from)
            .collect();
        if !missing.is_empty() || !unexpected.is_empty() {
            return Err(PipelineError::FieldSetMismatch {
                event: self.count,
                missing,
                unexpected,
            });
        }

        for (name, value) in record.iter() {
            let Some(column) = self.columns.get(name) else {
                continue;
            };
            let found = value.signature();
            if column.signature.stack_with(&found).is_none() {
                return Err(PipelineError::ShapeMismatch {
                    event: self.count,
                    field: name.to_string(),
                    expected: column.signature.clone(),
                    found,
                });
            }
        }
        Ok(())
    }

    /// Number of pending events.
    pub fn size(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Stack the pending events into one batch record, field order taken
    /// from the first event. `None` when nothing is pending.
    pub fn combine(&self) -> Option<Record> {
        if self.is_empty() {
            return None;
        }
        Some(
            self.columns
                .iter()
                .map(|(name, column)| (name.clone(), Value::Array(column.stacked.clone())))
                .collect(),
        )
    }

    /// Combine and clear in one step, without copying the stacked values.
    pub fn take(&mut self) -> Option<Record> {
        if self.is_empty() {
            return None;
        }
        self.count = 0;
        let columns = std::mem::take(&mut self.columns);
        Some(
            columns
                .into_iter()
                .map(|(name, column)| (name, Value::Array(column.stacked)))
                .collect(),
        )
    }

    /// Drop pending events and the batch layout.
    pub fn clear(&mut self) {
        self.columns.clear();
        self.count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lclstream_api::{ArrayData, ErrorKind};

    fn event(x: i64) -> Record {
        Record::new().with("x", x)
    }

    fn field<'a>(record: &'a Record, name: &str) -> &'a Array {
        record.get(name).and_then(Value::as_array).unwrap()
    }

    #[test]
    fn combine_stacks_in_arrival_order() {
        let mut acc = Accumulator::new();
        for x in [3, 1, 2] {
            acc.add(event(x)).unwrap();
        }
        assert_eq!(acc.size(), 3);

        let batch = acc.combine().unwrap();
        let x = field(&batch, "x");
        assert_eq!(x.shape(), &[3]);
        assert_eq!(x.data(), &ArrayData::Int(vec![3, 1, 2]));
        // combine does not consume
        assert_eq!(acc.size(), 3);
        assert_eq!(acc.combine().unwrap(), batch);
    }

    #[test]
    fn stacks_arrays_along_new_leading_dimension() {
        let mut acc = Accumulator::new();
        for i in 0..4 {
            let frame = Array::new(vec![2, 2], ArrayData::Float(vec![i as f64; 4])).unwrap();
            acc.add(Record::new().with("frame", frame).with("tag", "run")).unwrap();
        }
        let batch = acc.take().unwrap();
        let frame = field(&batch, "frame");
        assert_eq!(frame.shape(), &[4, 2, 2]);
        assert_eq!(
            frame.row(3).unwrap().as_array().unwrap().data(),
            &ArrayData::Float(vec![3.0; 4])
        );
        let tag = field(&batch, "tag");
        assert_eq!(tag.shape(), &[4]);
        assert_eq!(tag.dtype(), DType::Str);
    }

    #[test]
    fn batch_field_order_follows_first_event() {
        let mut acc = Accumulator::new();
        acc.add(Record::new().with("b", 1_i64).with("a", 2_i64)).unwrap();
        acc.add(Record::new().with("a", 3_i64).with("b", 4_i64)).unwrap();
        let batch = acc.combine().unwrap();
        let names: Vec<&str> = batch.names().collect();
        assert_eq!(names, ["b", "a"]);
        assert_eq!(field(&batch, "a").data(), &ArrayData::Int(vec![2, 3]));
        assert_eq!(field(&batch, "b").data(), &ArrayData::Int(vec![1, 4]));
    }

    #[test]
    fn clear_resets_size_and_layout() {
        let mut acc = Accumulator::new();
        acc.add(event(1)).unwrap();
        acc.add(event(2)).unwrap();
        acc.clear();
        assert_eq!(acc.size(), 0);
        assert!(acc.is_empty());
        assert!(acc.combine().is_none());
        assert!(acc.take().is_none());

        // a fresh layout is accepted after a reset
        acc.add(Record::new().with("y", "s")).unwrap();
        assert_eq!(acc.size(), 1);
    }

    #[test]
    fn take_empties_accumulator() {
        let mut acc = Accumulator::new();
        acc.add(event(7)).unwrap();
        let batch = acc.take().unwrap();
        assert_eq!(field(&batch, "x").data(), &ArrayData::Int(vec![7]));
        assert!(acc.is_empty());
        assert!(acc.combine().is_none());
    }

    #[test]
    fn rejects_field_set_mismatch_eagerly() {
        let mut acc = Accumulator::new();
        acc.add(Record::new().with("x", 1_i64).with("y", 2_i64)).unwrap();
        let err = acc
            .add(Record::new().with("x", 1_i64).with("z", 2_i64))
            .unwrap_err();
        match err {
            PipelineError::FieldSetMismatch {
                event,
                missing,
                unexpected,
            } => {
                assert_eq!(event, 1);
                assert_eq!(missing, ["y"]);
                assert_eq!(unexpected, ["z"]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(acc.size(), 1);
    }

    #[test]
    fn rejects_shape_and_dtype_mismatch() {
        let mut acc = Accumulator::new();
        acc.add(Record::new().with("v", Array::from(vec![1.0, 2.0]))).unwrap();

        let err = acc
            .add(Record::new().with("v", Array::from(vec![1.0, 2.0, 3.0])))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Shape);
        assert_eq!(
            err.to_string(),
            "shape mismatch at event 1, field 'v': expected float64[2], found float64[3]"
        );

        let err = acc
            .add(Record::new().with("v", Array::from(vec!["a".to_string(), "b".to_string()])))
            .unwrap_err();
        assert!(matches!(err, PipelineError::ShapeMismatch { ref field, .. } if field == "v"));

        let err = acc.add(Record::new().with("v", 1.0)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Shape);

        assert_eq!(acc.size(), 1);
        assert_eq!(field(&acc.combine().unwrap(), "v").shape(), &[1, 2]);
    }

    #[test]
    fn int_column_is_promoted_by_a_float_event() {
        let mut acc = Accumulator::new();
        acc.add(Record::new().with("e", 1_i64)).unwrap();
        acc.add(Record::new().with("e", 1.5)).unwrap();
        acc.add(Record::new().with("e", 2_i64)).unwrap();
        let batch = acc.take().unwrap();
        assert_eq!(field(&batch, "e").data(), &ArrayData::Float(vec![1.0, 1.5, 2.0]));
    }

    #[test]
    fn int_arrays_join_a_float_column() {
        let mut acc = Accumulator::new();
        acc.add(Record::new().with("v", Array::from(vec![0.5, 1.5]))).unwrap();
        acc.add(Record::new().with("v", Array::from(vec![1_i64, 2]))).unwrap();
        let batch = acc.combine().unwrap();
        let v = field(&batch, "v");
        assert_eq!(v.shape(), &[2, 2]);
        assert_eq!(v.data(), &ArrayData::Float(vec![0.5, 1.5, 1.0, 2.0]));
    }

    #[test]
    fn promotion_does_not_loosen_shape_checks() {
        let mut acc = Accumulator::new();
        acc.add(Record::new().with("v", Array::from(vec![1_i64, 2]))).unwrap();
        let err = acc
            .add(Record::new().with("v", Array::from(vec![1.0, 2.0, 3.0])))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "shape mismatch at event 1, field 'v': expected int64[2], found float64[3]"
        );
        assert_eq!(field(&acc.combine().unwrap(), "v").dtype(), DType::Int);
    }

    #[test]
    fn rejected_event_leaves_other_columns_untouched() {
        let mut acc = Accumulator::new();
        acc.add(Record::new().with("a", 1_i64).with("b", 1_i64)).unwrap();
        assert!(acc.add(Record::new().with("a", 2_i64).with("b", "oops")).is_err());
        let batch = acc.combine().unwrap();
        assert_eq!(field(&batch, "a").data(), &ArrayData::Int(vec![1]));
    }
}
