use super::backward::BackwardOptions;
use super::graph::{Graph, VarId};
use crate::buffer::Buffer;
use crate::error::GradrunError;
use crate::tensor::Tensor;
use crate::types::DType;
use log::debug;
use thiserror::Error;

/// Error type specifically for gradient checking failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GradCheckError {
    #[error("Gradient check failed for input {input_index}, element {element_index}: analytical {analytical_grad:?} != numerical {numerical_grad:?} (difference {difference:?})")]
    GradientMismatch {
        input_index: usize,
        element_index: usize,
        analytical_grad: f64,
        numerical_grad: f64,
        difference: f64,
    },
    #[error("Forward function execution failed during gradient check: {0}")]
    ForwardPassError(GradrunError),
    #[error("Backward pass execution failed during gradient check: {0}")]
    BackwardPassError(GradrunError),
    #[error("Tensor error during intermediate calculation: {0}")]
    TensorError(GradrunError),
    #[error("Unsupported data type for gradient check: expected a float dtype, got {0}")]
    UnsupportedDType(DType),
    #[error("Numerical gradient is NaN or infinite for input {input_index}, element {element_index} (loss+ {loss_plus:?}, loss- {loss_minus:?})")]
    NumericalGradNaNOrInfinite {
        input_index: usize,
        element_index: usize,
        loss_plus: f64,
        loss_minus: f64,
    },
    #[error("Analytical gradient is NaN or infinite for input {input_index}, element {element_index}: {value:?}")]
    AnalyticalGradNaNOrInfinite {
        input_index: usize,
        element_index: usize,
        value: f64,
    },
}

impl From<GradrunError> for GradCheckError {
    fn from(err: GradrunError) -> Self {
        GradCheckError::TensorError(err)
    }
}

/// Checks the analytical gradients of `func` against central finite
/// differences.
///
/// `func` builds its output from the given input variables inside the graph
/// it receives. The analytical gradients come from a single backward pass
/// seeded with `grad_output` (ones of the output's type when `None`). The
/// numerical gradient of input element `x` is
/// `(L(x + eps) - L(x - eps)) / (2 * eps)` with `L = sum(output * grad_output)`
/// evaluated in `f64`. An element passes when
/// `|analytical - numerical| <= atol + rtol * |numerical|`.
///
/// Inputs that receive no gradient are compared against zero.
pub fn check_backward<F>(
    func: F,
    inputs: &[Tensor],
    grad_output: Option<&Tensor>,
    eps: f64,
    atol: f64,
    rtol: f64,
) -> Result<(), GradCheckError>
where
    F: Fn(&mut Graph, &[VarId]) -> Result<VarId, GradrunError>,
{
    for input in inputs {
        if !input.dtype().is_float() {
            return Err(GradCheckError::UnsupportedDType(input.dtype()));
        }
    }

    // Analytical pass
    let mut graph = Graph::new();
    let ids: Vec<VarId> = inputs.iter().map(|t| graph.variable(t.clone())).collect();
    let output = func(&mut graph, &ids).map_err(GradCheckError::ForwardPassError)?;
    let gy = match grad_output {
        Some(g) => g.clone(),
        None => graph.data(output)?.ones_like(),
    };
    let gy_values = gy.to_f64_vec()?;
    graph
        .backward_with(output, BackwardOptions::with_grad(gy))
        .map_err(GradCheckError::BackwardPassError)?;

    let loss = |perturbed: &[Tensor]| -> Result<f64, GradCheckError> {
        let mut g = Graph::new();
        let ids: Vec<VarId> = perturbed.iter().map(|t| g.variable(t.clone())).collect();
        let out = func(&mut g, &ids).map_err(GradCheckError::ForwardPassError)?;
        let values = g.data(out)?.to_f64_vec()?;
        Ok(values.iter().zip(&gy_values).map(|(y, w)| y * w).sum())
    };

    for (input_index, input) in inputs.iter().enumerate() {
        let analytical = match graph.grad(ids[input_index])? {
            Some(grad) => grad.to_f64_vec()?,
            None => vec![0.0; input.numel()],
        };
        let original = input.to_f64_vec()?;

        for element_index in 0..input.numel() {
            let shifted = |delta: f64| -> Result<f64, GradCheckError> {
                let mut values = original.clone();
                values[element_index] += delta;
                let mut perturbed = inputs.to_vec();
                perturbed[input_index] = rebuild(input, &values)?;
                loss(&perturbed)
            };
            let loss_plus = shifted(eps)?;
            let loss_minus = shifted(-eps)?;
            let numerical = (loss_plus - loss_minus) / (2.0 * eps);
            if !numerical.is_finite() {
                return Err(GradCheckError::NumericalGradNaNOrInfinite {
                    input_index,
                    element_index,
                    loss_plus,
                    loss_minus,
                });
            }
            let value = analytical[element_index];
            if !value.is_finite() {
                return Err(GradCheckError::AnalyticalGradNaNOrInfinite {
                    input_index,
                    element_index,
                    value,
                });
            }
            let difference = (value - numerical).abs();
            if difference > atol + rtol * numerical.abs() {
                return Err(GradCheckError::GradientMismatch {
                    input_index,
                    element_index,
                    analytical_grad: value,
                    numerical_grad: numerical,
                    difference,
                });
            }
        }
        debug!("gradient check passed for input {}", input_index);
    }
    Ok(())
}

/// A tensor of `like`'s type holding `values` rounded to its dtype.
fn rebuild(like: &Tensor, values: &[f64]) -> Result<Tensor, GradrunError> {
    let buffer = Buffer::from_f64_vec(like.dtype(), values)
        .ok_or_else(|| GradrunError::type_violation("gradient_check", "dtype.kind", "numeric", like.dtype()))?;
    Tensor::new(buffer, like.shape().to_vec())?.to_device(like.device())
}
