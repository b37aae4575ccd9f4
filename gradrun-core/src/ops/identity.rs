use crate::autograd::{Function, Graph, VarId};
use crate::error::GradrunError;
use crate::tensor::Tensor;
use crate::type_check::{self, ArgSpec, TypeInfo};

/// Passes every input through unchanged, one output per input.
///
/// The outputs share the input buffers. Useful to build graphs with
/// multi-output functions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Identity;

impl Function for Identity {
    fn label(&self) -> &'static str {
        "identity"
    }

    fn check_type_forward(&self, in_types: &[TypeInfo]) -> Result<(), GradrunError> {
        for (i, info) in in_types.iter().enumerate() {
            ArgSpec::new()
                .floating()
                .check(self.label(), &format!("in_types[{i}]"), info)?;
        }
        Ok(())
    }

    fn check_type_backward(&self, in_types: &[TypeInfo], out_types: &[TypeInfo]) -> Result<(), GradrunError> {
        type_check::expect_count(self.label(), "out_types", out_types, in_types.len())
    }

    fn forward_cpu(&self, inputs: &[Tensor]) -> Result<Vec<Tensor>, GradrunError> {
        Ok(inputs.to_vec())
    }

    fn forward_accelerator(&self, inputs: &[Tensor]) -> Result<Vec<Tensor>, GradrunError> {
        Ok(inputs.to_vec())
    }

    fn backward_cpu(&self, _inputs: &[Tensor], grad_outputs: &[Tensor]) -> Result<Vec<Option<Tensor>>, GradrunError> {
        Ok(grad_outputs.iter().cloned().map(Some).collect())
    }

    fn backward_accelerator(
        &self,
        _inputs: &[Tensor],
        grad_outputs: &[Tensor],
    ) -> Result<Vec<Option<Tensor>>, GradrunError> {
        Ok(grad_outputs.iter().cloned().map(Some).collect())
    }
}

pub fn identity_op(graph: &mut Graph, inputs: &[VarId]) -> Result<Vec<VarId>, GradrunError> {
    graph.apply(Identity, inputs)
}
