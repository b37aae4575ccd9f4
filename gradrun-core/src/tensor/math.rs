use super::Tensor;
use crate::backend::{accelerator, cpu};
use crate::device::StorageDevice;
use crate::error::GradrunError;
use crate::type_check::{self, TypeInfo};
use crate::types::{DType, FloatElement};

/// Dispatches to the `f32` or `f64` instantiation of a generic kernel.
///
/// # Errors
/// `TypeContractViolation` for non-float dtypes.
pub(crate) fn dispatch_float<R>(
    operation: &str,
    dtype: DType,
    f32_kernel: impl FnOnce() -> Result<R, GradrunError>,
    f64_kernel: impl FnOnce() -> Result<R, GradrunError>,
) -> Result<R, GradrunError> {
    match dtype {
        DType::F32 => f32_kernel(),
        DType::F64 => f64_kernel(),
        other => Err(GradrunError::type_violation(
            operation,
            "dtype.kind",
            "float",
            other,
        )),
    }
}

fn zip_float<T, F>(name: &str, a: &Tensor, b: &Tensor, f: F) -> Result<Tensor, GradrunError>
where
    T: FloatElement + Default,
    F: Fn(T, T) -> T,
{
    let x = a.as_slice::<T>()?;
    let y = b.as_slice::<T>()?;
    let out = match a.device {
        StorageDevice::CPU => cpu::zip_map(x, y, &f),
        StorageDevice::Accelerator => accelerator::elementwise(name, x.len(), |i| f(x[i], y[i]))?,
    };
    Ok(Tensor::from_parts(T::into_buffer(out), a.shape.clone(), a.device))
}

fn scale_typed<T: FloatElement + Default>(t: &Tensor, factor: f64) -> Result<Tensor, GradrunError> {
    let k = T::cast_from_f64(factor);
    t.map_float::<T, _, _>("scale", |v| v * k, |x, i| x[i] * k)
}

fn sum_typed<T: FloatElement>(t: &Tensor) -> Result<Tensor, GradrunError> {
    let data = t.as_slice::<T>()?;
    let total = match t.device {
        StorageDevice::CPU => cpu::sum(data),
        StorageDevice::Accelerator => accelerator::reduce_sum("sum", data)?,
    };
    Ok(Tensor::from_parts(T::into_buffer(vec![total]), Vec::new(), t.device))
}

impl Tensor {
    /// Elementwise sum of two tensors with identical type info.
    ///
    /// This is the accumulation primitive of the backward engine.
    ///
    /// # Errors
    /// `TypeContractViolation` if dtype, shape or device differ, or if the dtype is not float.
    pub fn accumulate(&self, other: &Tensor) -> Result<Tensor, GradrunError> {
        type_check::expect_same_type(
            "accumulate",
            ("lhs", &TypeInfo::of(self)),
            ("rhs", &TypeInfo::of(other)),
        )?;
        dispatch_float(
            "accumulate",
            self.dtype(),
            || zip_float::<f32, _>("accumulate", self, other, |a, b| a + b),
            || zip_float::<f64, _>("accumulate", self, other, |a, b| a + b),
        )
    }

    /// Elementwise product of two tensors with identical type info.
    pub fn mul_elementwise(&self, other: &Tensor) -> Result<Tensor, GradrunError> {
        type_check::expect_same_type(
            "mul_elementwise",
            ("lhs", &TypeInfo::of(self)),
            ("rhs", &TypeInfo::of(other)),
        )?;
        dispatch_float(
            "mul_elementwise",
            self.dtype(),
            || zip_float::<f32, _>("mul", self, other, |a, b| a * b),
            || zip_float::<f64, _>("mul", self, other, |a, b| a * b),
        )
    }

    /// Multiplies every element by `factor` (rounded to the tensor's dtype).
    pub fn scale(&self, factor: f64) -> Result<Tensor, GradrunError> {
        dispatch_float(
            "scale",
            self.dtype(),
            || scale_typed::<f32>(self, factor),
            || scale_typed::<f64>(self, factor),
        )
    }

    /// Sum of all elements as a zero-dimensional tensor on the same device.
    pub fn sum_all(&self) -> Result<Tensor, GradrunError> {
        dispatch_float(
            "sum_all",
            self.dtype(),
            || sum_typed::<f32>(self),
            || sum_typed::<f64>(self),
        )
    }
}
