// src/tensor/mod.rs

use crate::backend::{accelerator, cpu};
use crate::buffer::Buffer;
use crate::device::StorageDevice;
use crate::error::GradrunError;
use crate::type_check::TypeInfo;
use crate::types::{DType, Element, FloatElement};
use std::sync::Arc;

pub mod create;
mod math;
mod rows;

#[cfg(test)]
mod math_test;

pub use create::{from_vec_f32, from_vec_f64, full, ones, rand_uniform, randn, zeros};
pub(crate) use math::dispatch_float;
pub use rows::stack;

/// Represents an immutable multi-dimensional array.
///
/// The buffer is shared through an `Arc`, so cloning a `Tensor` is cheap and
/// never copies data. Operators that retain their inputs for backward hold
/// such clones; the buffer is released when the last clone is dropped.
/// Tensors carry no autograd state: gradients and history live in the
/// [`Graph`](crate::autograd::Graph).
#[derive(Debug, Clone)]
pub struct Tensor {
    pub(crate) buffer: Arc<Buffer>,
    pub(crate) shape: Vec<usize>,
    pub(crate) device: StorageDevice,
}

impl PartialEq for Tensor {
    fn eq(&self, other: &Self) -> bool {
        self.shape == other.shape && self.device == other.device && self.buffer == other.buffer
    }
}

impl Tensor {
    /// Creates a new CPU tensor from a typed buffer and a shape.
    ///
    /// # Errors
    /// Returns `GradrunError::TensorCreationError` if the buffer length does not match
    /// the number of elements described by `shape`.
    pub fn new(buffer: Buffer, shape: Vec<usize>) -> Result<Self, GradrunError> {
        let numel: usize = shape.iter().product();
        if buffer.len() != numel {
            return Err(GradrunError::TensorCreationError {
                data_len: buffer.len(),
                shape,
            });
        }
        Ok(Tensor {
            buffer: Arc::new(buffer),
            shape,
            device: StorageDevice::CPU,
        })
    }

    /// Creates a new CPU tensor from a `Vec` of any supported element type.
    pub fn from_vec<T: Element>(data: Vec<T>, shape: Vec<usize>) -> Result<Self, GradrunError> {
        Tensor::new(T::into_buffer(data), shape)
    }

    /// A zero-dimensional tensor holding `value`.
    pub fn scalar<T: Element>(value: T) -> Self {
        Tensor {
            buffer: Arc::new(T::into_buffer(vec![value])),
            shape: Vec::new(),
            device: StorageDevice::CPU,
        }
    }

    /// Kernel output constructor: the caller guarantees `buffer.len()` matches `shape`.
    pub(crate) fn from_parts(buffer: Buffer, shape: Vec<usize>, device: StorageDevice) -> Self {
        debug_assert_eq!(buffer.len(), shape.iter().product::<usize>());
        Tensor {
            buffer: Arc::new(buffer),
            shape,
            device,
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of dimensions (rank).
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn numel(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn dtype(&self) -> DType {
        self.buffer.dtype()
    }

    pub fn device(&self) -> StorageDevice {
        self.device
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    /// Snapshot of the properties checked by type contracts.
    pub fn type_info(&self) -> TypeInfo {
        TypeInfo::of(self)
    }

    /// Borrows the elements as a slice of `T`.
    ///
    /// # Errors
    /// `TypeContractViolation` if the tensor's dtype is not `T::DTYPE`.
    pub fn as_slice<T: Element>(&self) -> Result<&[T], GradrunError> {
        T::slice(&self.buffer)
            .ok_or_else(|| GradrunError::type_violation("as_slice", "dtype", T::DTYPE, self.dtype()))
    }

    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>, GradrunError> {
        self.as_slice::<T>().map(<[T]>::to_vec)
    }

    /// Widens the elements to `f64` (numeric dtypes only).
    pub fn to_f64_vec(&self) -> Result<Vec<f64>, GradrunError> {
        self.buffer
            .to_f64_vec()
            .ok_or_else(|| GradrunError::type_violation("to_f64_vec", "dtype", "numeric", self.dtype()))
    }

    /// The single value of a one-element tensor, widened to `f64`.
    pub fn item(&self) -> Result<f64, GradrunError> {
        if self.numel() != 1 {
            return Err(GradrunError::type_violation(
                "item",
                "numel",
                1,
                self.numel(),
            ));
        }
        Ok(self.to_f64_vec()?[0])
    }

    /// A tensor of zeros with the same shape, dtype and device.
    pub fn zeros_like(&self) -> Self {
        Tensor::from_parts(
            Buffer::zeros(self.dtype(), self.numel()),
            self.shape.clone(),
            self.device,
        )
    }

    /// A tensor of ones with the same shape, dtype and device.
    pub fn ones_like(&self) -> Self {
        Tensor::from_parts(
            Buffer::ones(self.dtype(), self.numel()),
            self.shape.clone(),
            self.device,
        )
    }

    /// Moves the tensor to `device`. The data is copied; a tensor already on
    /// `device` is returned as a cheap clone.
    ///
    /// # Errors
    /// `DeviceUnavailable` when the target device was not compiled in.
    pub fn to_device(&self, device: StorageDevice) -> Result<Self, GradrunError> {
        if device == self.device {
            return Ok(self.clone());
        }
        if !device.is_available() {
            return Err(GradrunError::DeviceUnavailable(device));
        }
        Ok(Tensor {
            buffer: Arc::new(self.buffer.as_ref().clone()),
            shape: self.shape.clone(),
            device,
        })
    }

    /// Elementwise closeness check in the style of `allclose`:
    /// `|a - b| <= atol + rtol * |b|` for every pair of elements.
    /// Tensors of different shapes are never close.
    pub fn allclose(&self, other: &Tensor, atol: f64, rtol: f64) -> bool {
        if self.shape != other.shape {
            return false;
        }
        match (self.to_f64_vec(), other.to_f64_vec()) {
            (Ok(a), Ok(b)) => a
                .iter()
                .zip(b.iter())
                .all(|(x, y)| (x - y).abs() <= atol + rtol * y.abs()),
            _ => false,
        }
    }

    /// Runs an elementwise float kernel on this tensor's device.
    pub(crate) fn map_float<T, C, A>(
        &self,
        name: &str,
        cpu_kernel: C,
        accelerator_kernel: A,
    ) -> Result<Tensor, GradrunError>
    where
        T: FloatElement + Default,
        C: Fn(T) -> T,
        A: Fn(&[T], usize) -> T,
    {
        let data = self.as_slice::<T>()?;
        let out = match self.device {
            StorageDevice::CPU => cpu::map(data, cpu_kernel),
            StorageDevice::Accelerator => {
                accelerator::elementwise(name, data.len(), |i| accelerator_kernel(data, i))?
            }
        };
        Ok(Tensor::from_parts(
            T::into_buffer(out),
            self.shape.clone(),
            self.device,
        ))
    }
}
