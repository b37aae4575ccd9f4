use crate::autograd::{Function, Graph, VarId};
use crate::device::StorageDevice;
use crate::error::GradrunError;
use crate::ops::{binary_kernel, unary_kernel};
use crate::tensor::{dispatch_float, Tensor};
use crate::type_check::{self, ArgSpec, TypeInfo};
use crate::types::FloatElement;

/// Rectified Linear Unit: `max(0, x)`. Float inputs of any precision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Relu;

fn forward_typed<T: FloatElement + Default>(device: StorageDevice, x: &Tensor) -> Result<Tensor, GradrunError> {
    unary_kernel::<T, _>("relu_fwd", device, x, |v| if v < T::zero() { T::zero() } else { v })
}

fn backward_typed<T: FloatElement + Default>(
    device: StorageDevice,
    x: &Tensor,
    gy: &Tensor,
) -> Result<Tensor, GradrunError> {
    binary_kernel::<T, _>("relu_bwd", device, x, gy, |v, g| if v > T::zero() { g } else { T::zero() })
}

impl Relu {
    fn forward_on(&self, device: StorageDevice, inputs: &[Tensor]) -> Result<Vec<Tensor>, GradrunError> {
        let x = &inputs[0];
        let y = dispatch_float(
            self.label(),
            x.dtype(),
            || forward_typed::<f32>(device, x),
            || forward_typed::<f64>(device, x),
        )?;
        Ok(vec![y])
    }

    fn backward_on(
        &self,
        device: StorageDevice,
        inputs: &[Tensor],
        grad_outputs: &[Tensor],
    ) -> Result<Vec<Option<Tensor>>, GradrunError> {
        let (x, gy) = (&inputs[0], &grad_outputs[0]);
        let gx = dispatch_float(
            self.label(),
            x.dtype(),
            || backward_typed::<f32>(device, x, gy),
            || backward_typed::<f64>(device, x, gy),
        )?;
        Ok(vec![Some(gx)])
    }
}

impl Function for Relu {
    fn label(&self) -> &'static str {
        "relu"
    }

    fn check_type_forward(&self, in_types: &[TypeInfo]) -> Result<(), GradrunError> {
        type_check::check_arguments(self.label(), "in_types", in_types, &[ArgSpec::new().floating()])
    }

    fn check_type_backward(&self, in_types: &[TypeInfo], out_types: &[TypeInfo]) -> Result<(), GradrunError> {
        type_check::expect_count(self.label(), "in_types", in_types, 1)?;
        type_check::expect_count(self.label(), "out_types", out_types, 1)?;
        type_check::expect_same_type(self.label(), ("x", &in_types[0]), ("gy", &out_types[0]))
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

pub fn relu_op(graph: &mut Graph, x: VarId) -> Result<VarId, GradrunError> {
    graph.apply_single(Relu, &[x])
}
