use crate::parameter::Parameter;
use gradrun_core::type_check;
use gradrun_core::{GradrunError, Tensor};
use std::fmt::Debug;

/// Named scalar attributes of an optimizer (`lr`, `momentum`...), as seen by
/// schedule extensions.
pub trait Hyperparameters {
    /// Current value, or `None` if the optimizer has no such attribute.
    fn hyperparam(&self, name: &str) -> Option<f64>;

    /// # Errors
    /// `ConfigurationError` for an unknown name or a value the optimizer
    /// cannot accept.
    fn set_hyperparam(&mut self, name: &str, value: f64) -> Result<(), GradrunError>;

    /// Names accepted by [`hyperparam`](Hyperparameters::hyperparam).
    fn hyperparam_names(&self) -> &'static [&'static str];
}

/// Trait defining the common interface for all optimizers.
pub trait Optimizer: Hyperparameters + Debug + Send {
    /// Applies one optimization step.
    ///
    /// `grads[i]` is the gradient of `params[i]`; a `None` slot leaves that
    /// parameter untouched.
    ///
    /// # Errors
    /// `TypeContractViolation` if the slices differ in length or a gradient
    /// does not match its parameter.
    fn update(&mut self, params: &mut [Parameter], grads: &[Option<Tensor>]) -> Result<(), GradrunError>;

    /// Number of completed `update` calls.
    fn t(&self) -> usize;
}

/// Validates the pairing of parameters and gradients before an update.
pub(crate) fn check_update_arguments(
    operation: &str,
    params: &[Parameter],
    grads: &[Option<Tensor>],
) -> Result<(), GradrunError> {
    if grads.len() != params.len() {
        return Err(GradrunError::type_violation(
            operation,
            "grads.size() == params.size()",
            params.len(),
            grads.len(),
        ));
    }
    for (i, (param, grad)) in params.iter().zip(grads).enumerate() {
        if let Some(grad) = grad {
            type_check::expect_same_type(
                operation,
                (&format!("params[{i}]"), &param.type_info()),
                (&format!("grads[{i}]"), &grad.type_info()),
            )?;
        }
    }
    Ok(())
}

pub(crate) fn unknown_hyperparam(optimizer: &str, name: &str) -> GradrunError {
    GradrunError::ConfigurationError(format!("{optimizer} has no hyperparameter '{name}'"))
}
