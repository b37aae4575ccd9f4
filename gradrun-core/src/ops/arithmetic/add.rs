// gradrun-core/src/ops/arithmetic/add.rs

use crate::autograd::{Function, Graph, VarId};
use crate::device::StorageDevice;
use crate::error::GradrunError;
use crate::ops::binary_kernel;
use crate::tensor::{dispatch_float, Tensor};
use crate::type_check::{self, ArgSpec, TypeInfo};

/// Elementwise addition of two float tensors with identical dtype and shape.
/// No broadcasting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Add;

/// Shared by the binary arithmetic operators: two floats of the same type.
pub(crate) fn check_binary_same_type(operation: &str, in_types: &[TypeInfo]) -> Result<(), GradrunError> {
    type_check::check_arguments(
        operation,
        "in_types",
        in_types,
        &[ArgSpec::new().floating(), ArgSpec::new().floating()],
    )?;
    type_check::expect_same_dtype(operation, ("in_types[0]", &in_types[0]), ("in_types[1]", &in_types[1]))?;
    type_check::expect_same_shape(operation, ("in_types[0]", &in_types[0]), ("in_types[1]", &in_types[1]))
}

impl Add {
    fn forward_on(&self, device: StorageDevice, inputs: &[Tensor]) -> Result<Vec<Tensor>, GradrunError> {
        let (a, b) = (&inputs[0], &inputs[1]);
        let y = dispatch_float(
            self.label(),
            a.dtype(),
            || binary_kernel::<f32, _>("add_fwd", device, a, b, |x, y| x + y),
            || binary_kernel::<f64, _>("add_fwd", device, a, b, |x, y| x + y),
        )?;
        Ok(vec![y])
    }
}

impl Function for Add {
    fn label(&self) -> &'static str {
        "add"
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

    // d(a + b) = gy for both operands; the gradient buffer is shared.
    fn backward_cpu(&self, _inputs: &[Tensor], grad_outputs: &[Tensor]) -> Result<Vec<Option<Tensor>>, GradrunError> {
        let gy = &grad_outputs[0];
        Ok(vec![Some(gy.clone()), Some(gy.clone())])
    }

    fn backward_accelerator(
        &self,
        inputs: &[Tensor],
        grad_outputs: &[Tensor],
    ) -> Result<Vec<Option<Tensor>>, GradrunError> {
        self.backward_cpu(inputs, grad_outputs)
    }
}

pub fn add_op(graph: &mut Graph, a: VarId, b: VarId) -> Result<VarId, GradrunError> {
    graph.apply_single(Add, &[a, b])
}
