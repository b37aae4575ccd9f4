//! # Operators (`ops`)
//!
//! Every operator is a [`Function`](crate::autograd::Function) implementation
//! holding only its construction parameters, plus an `xxx_op` helper that
//! binds a fresh instance into a [`Graph`](crate::autograd::Graph):
//!
//! ```
//! use gradrun_core::autograd::Graph;
//! use gradrun_core::ops::activation::clipped_relu_op;
//! use gradrun_core::Tensor;
//!
//! let mut graph = Graph::new();
//! let x = graph.variable(Tensor::from_vec(vec![-1.0f32, 0.5, 30.0], vec![3]).unwrap());
//! let y = clipped_relu_op(&mut graph, x, 20.0f32).unwrap();
//! assert_eq!(graph.data(y).unwrap().to_vec::<f32>().unwrap(), vec![0.0, 0.5, 20.0]);
//! ```
//!
//! Submodules:
//! - [`activation`]: clipped ReLU and ReLU.
//! - [`arithmetic`]: elementwise add, mul and multiplication by a constant.
//! - [`reduction`]: sum to a scalar.
//! - [`identity`]: multi-input pass-through.

use crate::backend::{accelerator, cpu};
use crate::device::StorageDevice;
use crate::error::GradrunError;
use crate::tensor::Tensor;
use crate::types::FloatElement;

pub mod activation;
pub mod arithmetic;
pub mod identity;
pub mod reduction;

/// Runs `f` on every element of `x` with the kernel of `device`.
pub(crate) fn unary_kernel<T, F>(
    name: &str,
    device: StorageDevice,
    x: &Tensor,
    f: F,
) -> Result<Tensor, GradrunError>
where
    T: FloatElement + Default,
    F: Fn(T) -> T,
{
    let data = x.as_slice::<T>()?;
    let out = match device {
        StorageDevice::CPU => cpu::map(data, &f),
        StorageDevice::Accelerator => accelerator::elementwise(name, data.len(), |i| f(data[i]))?,
    };
    Ok(Tensor::from_parts(T::into_buffer(out), x.shape().to_vec(), device))
}

/// Runs `f` pairwise on two tensors of identical shape with the kernel of `device`.
pub(crate) fn binary_kernel<T, F>(
    name: &str,
    device: StorageDevice,
    a: &Tensor,
    b: &Tensor,
    f: F,
) -> Result<Tensor, GradrunError>
where
    T: FloatElement + Default,
    F: Fn(T, T) -> T,
{
    let x = a.as_slice::<T>()?;
    let y = b.as_slice::<T>()?;
    if x.len() != y.len() {
        return Err(GradrunError::InternalError(format!(
            "{}: operand lengths differ ({} vs {})",
            name,
            x.len(),
            y.len()
        )));
    }
    let out = match device {
        StorageDevice::CPU => cpu::zip_map(x, y, &f),
        StorageDevice::Accelerator => accelerator::elementwise(name, x.len(), |i| f(x[i], y[i]))?,
    };
    Ok(Tensor::from_parts(T::into_buffer(out), a.shape().to_vec(), device))
}

/// Reduces `x` to a zero-dimensional tensor with the kernel of `device`.
pub(crate) fn sum_kernel<T: FloatElement>(
    name: &str,
    device: StorageDevice,
    x: &Tensor,
) -> Result<Tensor, GradrunError> {
    let data = x.as_slice::<T>()?;
    let total = match device {
        StorageDevice::CPU => cpu::sum(data),
        StorageDevice::Accelerator => accelerator::reduce_sum(name, data)?,
    };
    Ok(Tensor::from_parts(T::into_buffer(vec![total]), Vec::new(), device))
}

/// Broadcasts the single element of `value` to `shape` on `device`.
pub(crate) fn fill_kernel<T: FloatElement + Default>(
    name: &str,
    device: StorageDevice,
    value: &Tensor,
    shape: &[usize],
) -> Result<Tensor, GradrunError> {
    let v = value
        .as_slice::<T>()?
        .first()
        .copied()
        .ok_or_else(|| GradrunError::InternalError(format!("{}: empty fill value", name)))?;
    let numel = shape.iter().product();
    let out = match device {
        StorageDevice::CPU => vec![v; numel],
        StorageDevice::Accelerator => accelerator::elementwise(name, numel, |_| v)?,
    };
    Ok(Tensor::from_parts(T::into_buffer(out), shape.to_vec(), device))
}
