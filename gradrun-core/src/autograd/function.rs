use crate::device::StorageDevice;
use crate::error::GradrunError;
use crate::tensor::Tensor;
use crate::type_check::{self, type_infos, TypeInfo};
use std::fmt::Debug;

/// Defines a differentiable operation: paired forward/backward kernels for
/// every [`StorageDevice`] plus the type contracts guarding them.
///
/// All four kernels are required methods, so adding a device variant forces
/// every operator to implement it. Callers go through the provided
/// [`forward`](Function::forward) and [`backward`](Function::backward), which
/// validate arguments before dispatching on the device.
///
/// An instance holds only its construction parameters. Binding it into a
/// [`Graph`](super::Graph) with [`Graph::apply`](super::Graph::apply) consumes
/// it, so one instance always corresponds to exactly one forward invocation.
///
/// The trait requires `Debug + Send + Sync` so that graphs can be inspected
/// and moved between threads.
pub trait Function: Debug + Send + Sync {
    /// Name used in logs and type contract errors.
    fn label(&self) -> &'static str;

    /// Validates the inputs of a forward call.
    fn check_type_forward(&self, in_types: &[TypeInfo]) -> Result<(), GradrunError>;

    /// Validates a backward call against the forward inputs and the outputs'
    /// type info. Output gradients are already known to match the recorded
    /// outputs when this runs.
    fn check_type_backward(
        &self,
        in_types: &[TypeInfo],
        out_types: &[TypeInfo],
    ) -> Result<(), GradrunError> {
        let _ = (in_types, out_types);
        Ok(())
    }

    fn forward_cpu(&self, inputs: &[Tensor]) -> Result<Vec<Tensor>, GradrunError>;

    fn forward_accelerator(&self, inputs: &[Tensor]) -> Result<Vec<Tensor>, GradrunError>;

    /// Computes the gradients of the inputs given the gradients of the outputs.
    ///
    /// The returned `Vec` has one slot per input, in input order. `None`
    /// means the input receives no gradient (non-differentiable argument);
    /// the engine treats it as zero.
    fn backward_cpu(
        &self,
        inputs: &[Tensor],
        grad_outputs: &[Tensor],
    ) -> Result<Vec<Option<Tensor>>, GradrunError>;

    fn backward_accelerator(
        &self,
        inputs: &[Tensor],
        grad_outputs: &[Tensor],
    ) -> Result<Vec<Option<Tensor>>, GradrunError>;

    /// Type-checks the inputs, verifies they live on `device`, then runs the
    /// device kernel.
    fn forward(&self, inputs: &[Tensor], device: StorageDevice) -> Result<Vec<Tensor>, GradrunError> {
        let in_types = type_infos(inputs);
        self.check_type_forward(&in_types)?;
        expect_device(self.label(), "in_types", &in_types, device)?;
        match device {
            StorageDevice::CPU => self.forward_cpu(inputs),
            StorageDevice::Accelerator => self.forward_accelerator(inputs),
        }
    }

    /// Type-checks inputs and output gradients, then runs the device kernel.
    fn backward(
        &self,
        inputs: &[Tensor],
        grad_outputs: &[Tensor],
        device: StorageDevice,
    ) -> Result<Vec<Option<Tensor>>, GradrunError> {
        let in_types = type_infos(inputs);
        let out_types = type_infos(grad_outputs);
        self.check_type_backward(&in_types, &out_types)?;
        expect_device(self.label(), "in_types", &in_types, device)?;
        expect_device(self.label(), "grad_outputs", &out_types, device)?;
        match device {
            StorageDevice::CPU => self.backward_cpu(inputs, grad_outputs),
            StorageDevice::Accelerator => self.backward_accelerator(inputs, grad_outputs),
        }
    }
}

fn expect_device(
    operation: &str,
    kind: &str,
    types: &[TypeInfo],
    device: StorageDevice,
) -> Result<(), GradrunError> {
    for (i, info) in types.iter().enumerate() {
        if info.device != device {
            return Err(GradrunError::type_violation(
                operation,
                format!("{kind}[{i}].device"),
                device,
                info.device,
            ));
        }
    }
    Ok(())
}

/// Shorthand used by single-input operators.
pub(crate) fn expect_unary(operation: &str, kind: &str, types: &[TypeInfo]) -> Result<(), GradrunError> {
    type_check::expect_count(operation, kind, types, 1)
}
