use crate::buffer::Buffer;
use num_traits::{Float, NumAssign};
use std::fmt::{self, Debug};

/// Defines the possible data types for Tensor elements.
///
/// This enum allows the framework to handle tensors with different
/// numerical types dynamically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    /// 32-bit floating-point type.
    F32,
    /// 64-bit floating-point type.
    F64,
    /// 32-bit integer type.
    I32,
    /// 64-bit integer type.
    I64,
    /// Boolean type (true/false values).
    Bool,
}

impl DType {
    pub fn is_float(&self) -> bool {
        matches!(self, DType::F32 | DType::F64)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DType::F32 => "float32",
            DType::F64 => "float64",
            DType::I32 => "int32",
            DType::I64 => "int64",
            DType::Bool => "bool",
        };
        f.write_str(name)
    }
}

/// A single dynamically typed value, used for construction parameters
/// whose accepted type is checked at runtime.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    F32(f32),
    F64(f64),
    I32(i32),
    I64(i64),
    Bool(bool),
}

impl Scalar {
    pub fn dtype(&self) -> DType {
        match self {
            Scalar::F32(_) => DType::F32,
            Scalar::F64(_) => DType::F64,
            Scalar::I32(_) => DType::I32,
            Scalar::I64(_) => DType::I64,
            Scalar::Bool(_) => DType::Bool,
        }
    }

    /// Returns the value widened to `f64` if this is a floating-point scalar.
    pub fn as_float(&self) -> Option<f64> {
        match *self {
            Scalar::F32(v) => Some(v as f64),
            Scalar::F64(v) => Some(v),
            _ => None,
        }
    }
}

impl From<f32> for Scalar {
    fn from(v: f32) -> Self {
        Scalar::F32(v)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::F64(v)
    }
}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Scalar::I32(v)
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::I64(v)
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

/// Rust element types that can back a tensor buffer.
pub trait Element: Copy + Debug + PartialEq + Send + Sync + 'static {
    const DTYPE: DType;

    /// Borrows the buffer contents if the buffer holds `Self`.
    fn slice(buffer: &Buffer) -> Option<&[Self]>;

    fn into_buffer(data: Vec<Self>) -> Buffer;
}

/// Floating-point element types usable by the generic kernels.
///
/// Strictly reserved for `f32` and `f64`.
pub trait FloatElement: Element + Float + NumAssign {
    fn cast_from_f64(value: f64) -> Self;
    fn as_f64(self) -> f64;
}

macro_rules! impl_element {
    ($ty:ty, $dtype:ident) => {
        impl Element for $ty {
            const DTYPE: DType = DType::$dtype;

            fn slice(buffer: &Buffer) -> Option<&[Self]> {
                match buffer {
                    Buffer::$dtype(data) => Some(data.as_slice()),
                    _ => None,
                }
            }

            fn into_buffer(data: Vec<Self>) -> Buffer {
                Buffer::$dtype(data)
            }
        }
    };
}

impl_element!(f32, F32);
impl_element!(f64, F64);
impl_element!(i32, I32);
impl_element!(i64, I64);
impl_element!(bool, Bool);

impl FloatElement for f32 {
    fn cast_from_f64(value: f64) -> Self {
        value as f32
    }

    fn as_f64(self) -> f64 {
        self as f64
    }
}

impl FloatElement for f64 {
    fn cast_from_f64(value: f64) -> Self {
        value
    }

    fn as_f64(self) -> f64 {
        self
    }
}
