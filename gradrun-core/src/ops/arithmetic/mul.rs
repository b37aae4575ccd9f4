use super::add::check_binary_same_type;
use crate::autograd::{Function, Graph, VarId};
use crate::device::StorageDevice;
use crate::error::GradrunError;
use crate::ops::binary_kernel;
use crate::tensor::{dispatch_float, Tensor};
use crate::type_check::TypeInfo;

/// Elementwise product of two float tensors with identical dtype and shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Mul;

fn product(name: &str, device: StorageDevice, a: &Tensor, b: &Tensor) -> Result<Tensor, GradrunError> {
    dispatch_float(
        name,
        a.dtype(),
        || binary_kernel::<f32, _>(name, device, a, b, |x, y| x * y),
        || binary_kernel::<f64, _>(name, device, a, b, |x, y| x * y),
    )
}

impl Mul {
    fn forward_on(&self, device: StorageDevice, inputs: &[Tensor]) -> Result<Vec<Tensor>, GradrunError> {
        Ok(vec![product("mul_fwd", device, &inputs[0], &inputs[1])?])
    }

    fn backward_on(
        &self,
        device: StorageDevice,
        inputs: &[Tensor],
        grad_outputs: &[Tensor],
    ) -> Result<Vec<Option<Tensor>>, GradrunError> {
        let gy = &grad_outputs[0];
        let ga = product("mul_bwd", device, gy, &inputs[1])?;
        let gb = product("mul_bwd", device, gy, &inputs[0])?;
        Ok(vec![Some(ga), Some(gb)])
    }
}

impl Function for Mul {
    fn label(&self) -> &'static str {
        "mul"
    }

    fn check_type_forward(&self, in_types: &[TypeInfo]) -> Result<(), GradrunError> {
        check_binary_same_type(self.label(), in_types)
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

pub fn mul_op(graph: &mut Graph, a: VarId, b: VarId) -> Result<VarId, GradrunError> {
    graph.apply_single(Mul, &[a, b])
}
