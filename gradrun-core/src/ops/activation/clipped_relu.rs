// gradrun-core/src/ops/activation/clipped_relu.rs

use crate::autograd::function::expect_unary;
use crate::autograd::{Function, Graph, VarId};
use crate::device::StorageDevice;
use crate::error::GradrunError;
use crate::ops::{binary_kernel, unary_kernel};
use crate::tensor::Tensor;
use crate::type_check::{self, ArgSpec, TypeInfo};
use crate::types::{DType, Scalar};

/// Clipped Rectifier Unit: `min(max(0, x), cap)`, elementwise.
///
/// Accepts `float32` input only. The gradient passes through on the open
/// interval `(0, cap)` and is zero at both boundaries and outside.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClippedRelu {
    cap: f32,
}

impl ClippedRelu {
    pub const DEFAULT_CAP: f32 = 20.0;

    /// Validates the cap eagerly.
    ///
    /// # Errors
    /// `ConfigurationError` if `cap` is not a floating-point scalar, or is
    /// not finite and strictly positive.
    pub fn new(cap: impl Into<Scalar>) -> Result<Self, GradrunError> {
        let cap = cap.into();
        let value = cap.as_float().ok_or_else(|| {
            GradrunError::ConfigurationError(format!(
                "clipped_relu cap must be a float scalar, got {}",
                cap.dtype()
            ))
        })?;
        if !value.is_finite() || value <= 0.0 {
            return Err(GradrunError::ConfigurationError(format!(
                "clipped_relu cap must be positive and finite, got {}",
                value
            )));
        }
        Ok(ClippedRelu { cap: value as f32 })
    }

    pub fn cap(&self) -> f32 {
        self.cap
    }

    fn forward_on(&self, device: StorageDevice, inputs: &[Tensor]) -> Result<Vec<Tensor>, GradrunError> {
        let cap = self.cap;
        let y = unary_kernel::<f32, _>("clipped_relu_fwd", device, &inputs[0], |x| {
            // NaN falls through both comparisons.
            if x < 0.0 {
                0.0
            } else if x > cap {
                cap
            } else {
                x
            }
        })?;
        Ok(vec![y])
    }

    fn backward_on(
        &self,
        device: StorageDevice,
        inputs: &[Tensor],
        grad_outputs: &[Tensor],
    ) -> Result<Vec<Option<Tensor>>, GradrunError> {
        let cap = self.cap;
        let gx = binary_kernel::<f32, _>(
            "clipped_relu_bwd",
            device,
            &inputs[0],
            &grad_outputs[0],
            |x, gy| if 0.0 < x && x < cap { gy } else { 0.0 },
        )?;
        Ok(vec![Some(gx)])
    }
}

impl Default for ClippedRelu {
    fn default() -> Self {
        ClippedRelu {
            cap: Self::DEFAULT_CAP,
        }
    }
}

impl Function for ClippedRelu {
    fn label(&self) -> &'static str {
        "clipped_relu"
    }

    fn check_type_forward(&self, in_types: &[TypeInfo]) -> Result<(), GradrunError> {
        type_check::check_arguments(
            self.label(),
            "in_types",
            in_types,
            &[ArgSpec::new().dtype(DType::F32)],
        )
    }

    fn check_type_backward(&self, in_types: &[TypeInfo], out_types: &[TypeInfo]) -> Result<(), GradrunError> {
        expect_unary(self.label(), "in_types", in_types)?;
        expect_unary(self.label(), "out_types", out_types)?;
        ArgSpec::new()
            .dtype(DType::F32)
            .check(self.label(), "out_types[0]", &out_types[0])?;
        type_check::expect_same_ndim(
            self.label(),
            ("x", &in_types[0]),
            ("gy", &out_types[0]),
        )
    }

    fn forward_cpu(&self, inputs: &[Tensor]) -> Result<Vec<Tensor>, GradrunError> {
        self.forward_on(StorageDevice::CPU, inputs)
    }

    fn forward_accelerator(&self, inputs: &[Tensor]) -> Result<Vec<Tensor>, GradrunError> {
        self.forward_on(StorageDevice::Accelerator, inputs)
    }

    fn backward_cpu(&self, inputs: &[Tensor], grad_outputs: &[Tensor]) -> Result<Vec<Option<Tensor>>, GradrunError> {
        self.backward_on(StorageDevice::CPU, inputs, grad_outputs)
    }

    fn backward_accelerator(
        &self,
        inputs: &[Tensor],
        grad_outputs: &[Tensor],
    ) -> Result<Vec<Option<Tensor>>, GradrunError> {
        self.backward_on(StorageDevice::Accelerator, inputs, grad_outputs)
    }
}

/// Applies [`ClippedRelu`] with the given cap to `x`.
pub fn clipped_relu_op(graph: &mut Graph, x: VarId, cap: impl Into<Scalar>) -> Result<VarId, GradrunError> {
    graph.apply_single(ClippedRelu::new(cap)?, &[x])
}
