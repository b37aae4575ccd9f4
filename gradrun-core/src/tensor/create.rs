// src/tensor/create.rs

use crate::buffer::Buffer;
use crate::error::GradrunError;
use crate::tensor::Tensor;
use crate::types::{DType, Element};
use rand::Rng;
use rand_distr::{Distribution, StandardNormal, Uniform};

/// Creates a new CPU tensor of `dtype` filled with zeros.
pub fn zeros(shape: &[usize], dtype: DType) -> Tensor {
    let numel = shape.iter().product();
    Tensor::from_parts(Buffer::zeros(dtype, numel), shape.to_vec(), Default::default())
}

/// Creates a new CPU tensor of `dtype` filled with ones.
pub fn ones(shape: &[usize], dtype: DType) -> Tensor {
    let numel = shape.iter().product();
    Tensor::from_parts(Buffer::ones(dtype, numel), shape.to_vec(), Default::default())
}

/// Creates a new CPU tensor filled with `value`; the dtype follows `T`.
pub fn full<T: Element>(shape: &[usize], value: T) -> Tensor {
    let numel = shape.iter().product();
    Tensor::from_parts(
        T::into_buffer(vec![value; numel]),
        shape.to_vec(),
        Default::default(),
    )
}

/// Creates a new CPU F32 Tensor from a Vec<f32> and shape.
pub fn from_vec_f32(data_vec: Vec<f32>, shape: Vec<usize>) -> Result<Tensor, GradrunError> {
    Tensor::from_vec(data_vec, shape)
}

/// Creates a new CPU F64 Tensor from a Vec<f64> and shape.
pub fn from_vec_f64(data_vec: Vec<f64>, shape: Vec<usize>) -> Result<Tensor, GradrunError> {
    Tensor::from_vec(data_vec, shape)
}

/// Samples a float tensor uniformly from `[low, high)`.
///
/// # Errors
/// `ConfigurationError` if `low >= high` or `dtype` is not a float type.
pub fn rand_uniform<R: Rng + ?Sized>(
    shape: &[usize],
    dtype: DType,
    low: f64,
    high: f64,
    rng: &mut R,
) -> Result<Tensor, GradrunError> {
    if !(low < high) {
        return Err(GradrunError::ConfigurationError(format!(
            "rand_uniform: low ({}) must be smaller than high ({})",
            low, high
        )));
    }
    let numel: usize = shape.iter().product();
    let dist = Uniform::new(low, high);
    let samples: Vec<f64> = (0..numel).map(|_| dist.sample(rng)).collect();
    float_tensor(shape, dtype, &samples, "rand_uniform")
}

/// Samples a float tensor from the standard normal distribution.
pub fn randn<R: Rng + ?Sized>(shape: &[usize], dtype: DType, rng: &mut R) -> Result<Tensor, GradrunError> {
    let numel: usize = shape.iter().product();
    let samples: Vec<f64> = (0..numel).map(|_| StandardNormal.sample(rng)).collect();
    float_tensor(shape, dtype, &samples, "randn")
}

/// Builds a float tensor of `dtype` from `f64` values, rounding when needed.
pub(crate) fn float_tensor(
    shape: &[usize],
    dtype: DType,
    data: &[f64],
    operation: &str,
) -> Result<Tensor, GradrunError> {
    let buffer = Buffer::from_f64_vec(dtype, data).ok_or_else(|| {
        GradrunError::ConfigurationError(format!(
            "{}: dtype must be a float type, got {}",
            operation, dtype
        ))
    })?;
    Tensor::new(buffer, shape.to_vec())
}
