use crate::types::DType;
use std::ops::Range;

/// Flat, typed storage behind a tensor.
///
/// The device a buffer lives on is tracked by the owning tensor; the
/// accelerator backend keeps its buffers in the same representation.
#[derive(Debug, Clone, PartialEq)]
pub enum Buffer {
    F32(Vec<f32>),
    F64(Vec<f64>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    Bool(Vec<bool>),
}

impl Buffer {
    pub fn dtype(&self) -> DType {
        match self {
            Buffer::F32(_) => DType::F32,
            Buffer::F64(_) => DType::F64,
            Buffer::I32(_) => DType::I32,
            Buffer::I64(_) => DType::I64,
            Buffer::Bool(_) => DType::Bool,
        }
    }

    /// Returns the number of elements in the buffer.
    pub fn len(&self) -> usize {
        match self {
            Buffer::F32(v) => v.len(),
            Buffer::F64(v) => v.len(),
            Buffer::I32(v) => v.len(),
            Buffer::I64(v) => v.len(),
            Buffer::Bool(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A buffer of `len` elements all equal to zero (or `false`).
    pub fn zeros(dtype: DType, len: usize) -> Self {
        match dtype {
            DType::F32 => Buffer::F32(vec![0.0; len]),
            DType::F64 => Buffer::F64(vec![0.0; len]),
            DType::I32 => Buffer::I32(vec![0; len]),
            DType::I64 => Buffer::I64(vec![0; len]),
            DType::Bool => Buffer::Bool(vec![false; len]),
        }
    }

    /// A buffer of `len` elements all equal to one (or `true`).
    pub fn ones(dtype: DType, len: usize) -> Self {
        match dtype {
            DType::F32 => Buffer::F32(vec![1.0; len]),
            DType::F64 => Buffer::F64(vec![1.0; len]),
            DType::I32 => Buffer::I32(vec![1; len]),
            DType::I64 => Buffer::I64(vec![1; len]),
            DType::Bool => Buffer::Bool(vec![true; len]),
        }
    }

    /// Widens the contents to `f64`. Returns `None` for boolean buffers.
    pub fn to_f64_vec(&self) -> Option<Vec<f64>> {
        match self {
            Buffer::F32(v) => Some(v.iter().map(|&x| x as f64).collect()),
            Buffer::F64(v) => Some(v.clone()),
            Buffer::I32(v) => Some(v.iter().map(|&x| x as f64).collect()),
            Buffer::I64(v) => Some(v.iter().map(|&x| x as f64).collect()),
            Buffer::Bool(_) => None,
        }
    }

    /// Builds a floating-point buffer of `dtype` from `f64` values.
    /// Returns `None` for non-float dtypes.
    pub fn from_f64_vec(dtype: DType, data: &[f64]) -> Option<Self> {
        match dtype {
            DType::F32 => Some(Buffer::F32(data.iter().map(|&x| x as f32).collect())),
            DType::F64 => Some(Buffer::F64(data.to_vec())),
            _ => None,
        }
    }

    /// Copies the elements in `range`. Returns `None` if the range is out of bounds.
    pub fn slice(&self, range: Range<usize>) -> Option<Self> {
        match self {
            Buffer::F32(v) => v.get(range).map(|s| Buffer::F32(s.to_vec())),
            Buffer::F64(v) => v.get(range).map(|s| Buffer::F64(s.to_vec())),
            Buffer::I32(v) => v.get(range).map(|s| Buffer::I32(s.to_vec())),
            Buffer::I64(v) => v.get(range).map(|s| Buffer::I64(s.to_vec())),
            Buffer::Bool(v) => v.get(range).map(|s| Buffer::Bool(s.to_vec())),
        }
    }

    /// Concatenates buffers of a single dtype. Returns `None` on a dtype
    /// mismatch or when `parts` is empty.
    pub fn concat(parts: &[&Buffer]) -> Option<Self> {
        let first = parts.first()?;
        let mut out = Buffer::zeros(first.dtype(), 0);
        for part in parts {
            match (&mut out, part) {
                (Buffer::F32(acc), Buffer::F32(v)) => acc.extend_from_slice(v),
                (Buffer::F64(acc), Buffer::F64(v)) => acc.extend_from_slice(v),
                (Buffer::I32(acc), Buffer::I32(v)) => acc.extend_from_slice(v),
                (Buffer::I64(acc), Buffer::I64(v)) => acc.extend_from_slice(v),
                (Buffer::Bool(acc), Buffer::Bool(v)) => acc.extend_from_slice(v),
                _ => return None,
            }
        }
        Some(out)
    }
}
