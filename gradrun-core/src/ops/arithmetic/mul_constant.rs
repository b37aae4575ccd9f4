use crate::autograd::{Function, Graph, VarId};
use crate::device::StorageDevice;
use crate::error::GradrunError;
use crate::ops::unary_kernel;
use crate::tensor::{dispatch_float, Tensor};
use crate::type_check::{self, ArgSpec, TypeInfo};
use crate::types::FloatElement;

/// Multiplies a float tensor by a fixed scalar. The constant is rounded to
/// the input's precision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MulConstant {
    value: f64,
}

impl MulConstant {
    pub fn new(value: f64) -> Result<Self, GradrunError> {
        if !value.is_finite() {
            return Err(GradrunError::ConfigurationError(format!(
                "mul_constant value must be finite, got {}",
                value
            )));
        }
        Ok(MulConstant { value })
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    fn scale_on(&self, name: &str, device: StorageDevice, x: &Tensor) -> Result<Tensor, GradrunError> {
        fn typed<T: FloatElement + Default>(
            name: &str,
            device: StorageDevice,
            x: &Tensor,
            value: f64,
        ) -> Result<Tensor, GradrunError> {
            let k = T::cast_from_f64(value);
            unary_kernel::<T, _>(name, device, x, |v| v * k)
        }
        dispatch_float(
            name,
            x.dtype(),
            || typed::<f32>(name, device, x, self.value),
            || typed::<f64>(name, device, x, self.value),
        )
    }
}

impl Function for MulConstant {
    fn label(&self) -> &'static str {
        "mul_constant"
    }

    fn check_type_forward(&self, in_types: &[TypeInfo]) -> Result<(), GradrunError> {
        type_check::check_arguments(self.label(), "in_types", in_types, &[ArgSpec::new().floating()])
    }

    fn forward_cpu(&self, inputs: &[Tensor]) -> Result<Vec<Tensor>, GradrunError> {
        Ok(vec![self.scale_on("mul_constant_fwd", StorageDevice::CPU, &inputs[0])?])
    }

    fn forward_accelerator(&self, inputs: &[Tensor]) -> Result<Vec<Tensor>, GradrunError> {
        Ok(vec![self.scale_on("mul_constant_fwd", StorageDevice::Accelerator, &inputs[0])?])
    }

    fn backward_cpu(&self, _inputs: &[Tensor], grad_outputs: &[Tensor]) -> Result<Vec<Option<Tensor>>, GradrunError> {
        Ok(vec![Some(self.scale_on("mul_constant_bwd", StorageDevice::CPU, &grad_outputs[0])?)])
    }

    fn backward_accelerator(
        &self,
        _inputs: &[Tensor],
        grad_outputs: &[Tensor],
    ) -> Result<Vec<Option<Tensor>>, GradrunError> {
        Ok(vec![Some(self.scale_on(
            "mul_constant_bwd",
            StorageDevice::Accelerator,
            &grad_outputs[0],
        )?)])
    }
}

pub fn mul_constant_op(graph: &mut Graph, x: VarId, value: f64) -> Result<VarId, GradrunError> {
    graph.apply_single(MulConstant::new(value)?, &[x])
}
