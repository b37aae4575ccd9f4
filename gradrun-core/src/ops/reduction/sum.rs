use crate::autograd::{Function, Graph, VarId};
use crate::device::StorageDevice;
use crate::error::GradrunError;
use crate::ops::{fill_kernel, sum_kernel};
use crate::tensor::{dispatch_float, Tensor};
use crate::type_check::{self, ArgSpec, TypeInfo};

/// Sums every element of a float tensor into a zero-dimensional tensor.
///
/// The backward broadcasts the scalar output gradient back to the input
/// shape. Accelerator sums reduce per block first, so they may differ from
/// the CPU result in the last bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sum;

impl Sum {
    fn forward_on(&self, device: StorageDevice, inputs: &[Tensor]) -> Result<Vec<Tensor>, GradrunError> {
        let x = &inputs[0];
        let y = dispatch_float(
            self.label(),
            x.dtype(),
            || sum_kernel::<f32>("sum_fwd", device, x),
            || sum_kernel::<f64>("sum_fwd", device, x),
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
            || fill_kernel::<f32>("sum_bwd", device, gy, x.shape()),
            || fill_kernel::<f64>("sum_bwd", device, gy, x.shape()),
        )?;
        Ok(vec![Some(gx)])
    }
}

impl Function for Sum {
    fn label(&self) -> &'static str {
        "sum"
    }

    fn check_type_forward(&self, in_types: &[TypeInfo]) -> Result<(), GradrunError> {
        type_check::check_arguments(self.label(), "in_types", in_types, &[ArgSpec::new().floating()])
    }

    fn check_type_backward(&self, in_types: &[TypeInfo], out_types: &[TypeInfo]) -> Result<(), GradrunError> {
        type_check::expect_count(self.label(), "in_types", in_types, 1)?;
        type_check::check_arguments(self.label(), "out_types", out_types, &[ArgSpec::new().ndim(0)])?;
        type_check::expect_same_dtype(self.label(), ("x", &in_types[0]), ("gy", &out_types[0]))
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

pub fn sum_op(graph: &mut Graph, x: VarId) -> Result<VarId, GradrunError> {
    graph.apply_single(Sum, &[x])
}
