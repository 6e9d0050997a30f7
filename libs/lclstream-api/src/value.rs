use std::fmt;

use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::PipelineError;

/// Element type of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    Int,
    Float,
    Str,
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DType::Int => f.write_str("int64"),
            DType::Float => f.write_str("float64"),
            DType::Str => f.write_str("str"),
        }
    }
}

/// Flat, homogeneous element buffer of an [`Array`].
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayData {
    Int(Vec<i64>),
    Float(Vec<f64>),
    Str(Vec<String>),
}

impl ArrayData {
    pub fn dtype(&self) -> DType {
        match self {
            ArrayData::Int(_) => DType::Int,
            ArrayData::Float(_) => DType::Float,
            ArrayData::Str(_) => DType::Str,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ArrayData::Int(v) => v.len(),
            ArrayData::Float(v) => v.len(),
            ArrayData::Str(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Convert integer elements to floats; other buffers are returned as is.
    pub fn into_float(self) -> ArrayData {
        match self {
            ArrayData::Int(v) => ArrayData::Float(v.into_iter().map(|x| x as f64).collect()),
            other => other,
        }
    }

    /// Append all elements of `other`. Both buffers must share a dtype.
    pub fn append(&mut self, other: ArrayData) -> Result<(), PipelineError> {
        match (self, other) {
            (ArrayData::Int(dst), ArrayData::Int(src)) => dst.extend(src),
            (ArrayData::Float(dst), ArrayData::Float(src)) => dst.extend(src),
            (ArrayData::Str(dst), ArrayData::Str(src)) => dst.extend(src),
            (dst, src) => {
                return Err(PipelineError::malformed(format!(
                    "cannot append {} elements to a {} buffer",
                    src.dtype(),
                    dst.dtype()
                )));
            }
        }
        Ok(())
    }

    fn slice(&self, start: usize, end: usize) -> ArrayData {
        match self {
            ArrayData::Int(v) => ArrayData::Int(v[start..end].to_vec()),
            ArrayData::Float(v) => ArrayData::Float(v[start..end].to_vec()),
            ArrayData::Str(v) => ArrayData::Str(v[start..end].to_vec()),
        }
    }

    fn scalar_at(&self, idx: usize) -> Value {
        match self {
            ArrayData::Int(v) => Value::Int(v[idx]),
            ArrayData::Float(v) => Value::Float(v[idx]),
            ArrayData::Str(v) => Value::Str(v[idx].clone()),
        }
    }

    fn serialize_element<S: Serializer>(
        &self,
        idx: usize,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match self {
            ArrayData::Int(v) => serializer.serialize_i64(v[idx]),
            ArrayData::Float(v) => serializer.serialize_f64(v[idx]),
            ArrayData::Str(v) => serializer.serialize_str(&v[idx]),
        }
    }
}

/// Row-major n-dimensional array.
///
/// Invariant: `data.len() == shape.iter().product()`.
#[derive(Debug, Clone, PartialEq)]
pub struct Array {
    shape: Vec<usize>,
    data: ArrayData,
}

impl Array {
    pub fn new(shape: Vec<usize>, data: ArrayData) -> Result<Self, PipelineError> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(PipelineError::malformed(format!(
                "shape {shape:?} needs {expected} elements, got {}",
                data.len()
            )));
        }
        Ok(Self { shape, data })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &ArrayData {
        &self.data
    }

    pub fn dtype(&self) -> DType {
        self.data.dtype()
    }

    /// Size of the leading dimension (`None` for a 0-d array).
    pub fn leading_dim(&self) -> Option<usize> {
        self.shape.first().copied()
    }

    pub fn into_float(self) -> Array {
        Array {
            shape: self.shape,
            data: self.data.into_float(),
        }
    }

    /// Append `value` as one more entry along the leading dimension.
    ///
    /// The value must match the element type and the trailing shape.
    pub fn push_row(&mut self, value: Value) -> Result<(), PipelineError> {
        if self.shape.is_empty() {
            return Err(PipelineError::malformed("cannot push a row onto a 0-d array"));
        }
        if self.shape[1..] != *value.shape() || self.data.dtype() != value.dtype() {
            let rows = FieldSignature::new(self.data.dtype(), self.shape[1..].to_vec());
            return Err(PipelineError::malformed(format!(
                "row {} does not fit rows of {rows}",
                value.signature()
            )));
        }
        self.data.append(value.into_data())?;
        self.shape[0] += 1;
        Ok(())
    }

    /// Sub-array at position `idx` of the leading dimension.
    ///
    /// A 1-d array yields scalars.
    pub fn row(&self, idx: usize) -> Option<Value> {
        let (&rows, inner) = self.shape.split_first()?;
        if idx >= rows {
            return None;
        }
        if inner.is_empty() {
            return Some(self.data.scalar_at(idx));
        }
        let stride: usize = inner.iter().product();
        let data = self.data.slice(idx * stride, (idx + 1) * stride);
        Some(Value::Array(Array {
            shape: inner.to_vec(),
            data,
        }))
    }
}

impl From<Vec<i64>> for Array {
    fn from(v: Vec<i64>) -> Self {
        Self { shape: vec![v.len()], data: ArrayData::Int(v) }
    }
}

impl From<Vec<f64>> for Array {
    fn from(v: Vec<f64>) -> Self {
        Self { shape: vec![v.len()], data: ArrayData::Float(v) }
    }
}

impl From<Vec<String>> for Array {
    fn from(v: Vec<String>) -> Self {
        Self { shape: vec![v.len()], data: ArrayData::Str(v) }
    }
}

/// What a single field of an event looks like: element type plus shape.
///
/// All events of one batch must agree on the signature of every field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldSignature {
    pub dtype: DType,
    pub shape: Vec<usize>,
}

impl FieldSignature {
    pub fn new(dtype: DType, shape: Vec<usize>) -> Self {
        Self { dtype, shape }
    }

    /// Signature of a column holding both `self` and `other` values.
    ///
    /// Shapes must be equal. Int and Float meet at Float; Str only stacks
    /// with Str. `None` if the two cannot share a column.
    pub fn stack_with(&self, other: &FieldSignature) -> Option<FieldSignature> {
        if self.shape != other.shape {
            return None;
        }
        let dtype = match (self.dtype, other.dtype) {
            (a, b) if a == b => a,
            (DType::Int, DType::Float) | (DType::Float, DType::Int) => DType::Float,
            _ => return None,
        };
        Some(FieldSignature::new(dtype, self.shape.clone()))
    }
}

impl fmt::Display for FieldSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dims: Vec<String> = self.shape.iter().map(|d| d.to_string()).collect();
        write!(f, "{}[{}]", self.dtype, dims.join(", "))
    }
}

/// Field value of a record: a scalar or an n-dimensional array.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    Array(Array),
}

impl Value {
    pub fn dtype(&self) -> DType {
        match self {
            Value::Int(_) => DType::Int,
            Value::Float(_) => DType::Float,
            Value::Str(_) => DType::Str,
            Value::Array(a) => a.dtype(),
        }
    }

    /// Shape of the value; scalars have shape `[]`.
    pub fn shape(&self) -> &[usize] {
        match self {
            Value::Array(a) => a.shape(),
            _ => &[],
        }
    }

    pub fn signature(&self) -> FieldSignature {
        FieldSignature::new(self.dtype(), self.shape().to_vec())
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Convert integer contents to floats.
    pub fn into_float(self) -> Value {
        match self {
            Value::Int(v) => Value::Float(v as f64),
            Value::Array(a) => Value::Array(a.into_float()),
            other => other,
        }
    }

    /// Flat element buffer of the value (a scalar yields one element).
    pub fn into_data(self) -> ArrayData {
        match self {
            Value::Int(v) => ArrayData::Int(vec![v]),
            Value::Float(v) => ArrayData::Float(vec![v]),
            Value::Str(v) => ArrayData::Str(vec![v]),
            Value::Array(a) => a.data,
        }
    }

    /// Promote into an array with one new leading dimension of size 1.
    pub fn batched(self) -> Array {
        let mut shape = Vec::with_capacity(self.shape().len() + 1);
        shape.push(1);
        shape.extend_from_slice(self.shape());
        Array {
            shape,
            data: self.into_data(),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Array> for Value {
    fn from(v: Array) -> Self {
        Value::Array(v)
    }
}

// ---------------------------------------------------------------------------
// JSON mapping: scalars <-> numbers/strings, arrays <-> nested lists
// ---------------------------------------------------------------------------

/// Nested-list view over part of an array's buffer.
struct Nested<'a> {
    shape: &'a [usize],
    data: &'a ArrayData,
    offset: usize,
}

impl Serialize for Nested<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let Some((&len, inner)) = self.shape.split_first() else {
            return self.data.serialize_element(self.offset, serializer);
        };
        let stride: usize = inner.iter().product();
        let mut seq = serializer.serialize_seq(Some(len))?;
        for i in 0..len {
            seq.serialize_element(&Nested {
                shape: inner,
                data: self.data,
                offset: self.offset + i * stride,
            })?;
        }
        seq.end()
    }
}

impl Serialize for Array {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Nested {
            shape: &self.shape,
            data: &self.data,
            offset: 0,
        }
        .serialize(serializer)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Int(v) => serializer.serialize_i64(*v),
            Value::Float(v) => serializer.serialize_f64(*v),
            Value::Str(v) => serializer.serialize_str(v),
            Value::Array(a) => a.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = serde_json::Value::deserialize(deserializer)?;
        Value::try_from(json).map_err(serde::de::Error::custom)
    }
}

impl TryFrom<serde_json::Value> for Value {
    type Error = PipelineError;

    fn try_from(json: serde_json::Value) -> Result<Self, Self::Error> {
        match json {
            serde_json::Value::Number(n) => Ok(number_value(&n)),
            serde_json::Value::String(s) => Ok(Value::Str(s)),
            serde_json::Value::Array(items) => parse_array(items).map(Value::Array),
            other => Err(PipelineError::malformed(format!(
                "unsupported JSON value: {other}"
            ))),
        }
    }
}

fn number_value(n: &serde_json::Number) -> Value {
    match n.as_i64() {
        Some(i) => Value::Int(i),
        // u64 beyond i64::MAX and all non-integers
        None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
    }
}

fn parse_array(items: Vec<serde_json::Value>) -> Result<Array, PipelineError> {
    let mut shape = Vec::new();
    let mut leaf_depth = None;
    let mut leaves = Vec::new();
    flatten(
        serde_json::Value::Array(items),
        0,
        &mut shape,
        &mut leaf_depth,
        &mut leaves,
    )?;

    let data = if leaves.iter().all(|v| v.is_string()) && !leaves.is_empty() {
        ArrayData::Str(
            leaves
                .into_iter()
                .filter_map(|v| match v {
                    serde_json::Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
        )
    } else if leaves.iter().all(|v| v.is_i64()) && !leaves.is_empty() {
        ArrayData::Int(leaves.iter().filter_map(|v| v.as_i64()).collect())
    } else if leaves.iter().all(|v| v.is_number()) {
        ArrayData::Float(leaves.iter().filter_map(|v| v.as_f64()).collect())
    } else {
        return Err(PipelineError::malformed(
            "array elements must be all numbers or all strings",
        ));
    };

    Array::new(shape, data)
}

/// Walk a nested list depth-first, recording its shape and collecting leaves.
///
/// Every list at the same depth must have the same length and every leaf must
/// sit at the same depth.
fn flatten(
    json: serde_json::Value,
    depth: usize,
    shape: &mut Vec<usize>,
    leaf_depth: &mut Option<usize>,
    leaves: &mut Vec<serde_json::Value>,
) -> Result<(), PipelineError> {
    match json {
        serde_json::Value::Array(items) => {
            if leaf_depth.is_some_and(|d| depth >= d) {
                return Err(PipelineError::malformed("ragged nested array"));
            }
            match shape.get(depth) {
                Some(&len) if len != items.len() => {
                    return Err(PipelineError::malformed(format!(
                        "ragged nested array: expected length {len} at depth {depth}, found {}",
                        items.len()
                    )));
                }
                Some(_) => {}
                None => shape.push(items.len()),
            }
            for item in items {
                flatten(item, depth + 1, shape, leaf_depth, leaves)?;
            }
            Ok(())
        }
        serde_json::Value::Number(_) | serde_json::Value::String(_) => {
            match *leaf_depth {
                Some(d) if d != depth => {
                    return Err(PipelineError::malformed("ragged nested array"));
                }
                Some(_) => {}
                None => {
                    if depth != shape.len() {
                        return Err(PipelineError::malformed("ragged nested array"));
                    }
                    *leaf_depth = Some(depth);
                }
            }
            leaves.push(json);
            Ok(())
        }
        other => Err(PipelineError::malformed(format!(
            "unsupported array element: {other}"
        ))),
    }
}
