use super::graph::{FuncId, Graph, VarId};
use crate::buffer::Buffer;
use crate::error::GradrunError;
use crate::tensor::Tensor;
use crate::type_check::{self, type_infos, TypeInfo};
use log::{debug, trace, warn};
use std::collections::{BinaryHeap, HashMap, HashSet};

/// Options of a backward pass.
#[derive(Debug, Clone, Default)]
pub struct BackwardOptions {
    /// Seed gradient of the terminal variable. Must match its dtype, shape
    /// and device.
    pub grad: Option<Tensor>,
    /// Keep the gradients of intermediate variables after their producer has
    /// consumed them.
    pub retain_grad: bool,
}

impl BackwardOptions {
    pub fn with_grad(grad: Tensor) -> Self {
        BackwardOptions {
            grad: Some(grad),
            ..Default::default()
        }
    }

    pub fn retain_grad(mut self, retain: bool) -> Self {
        self.retain_grad = retain;
        self
    }
}

fn zeros_for(info: &TypeInfo) -> Tensor {
    let numel = info.shape.iter().product();
    Tensor::from_parts(Buffer::zeros(info.dtype, numel), info.shape.clone(), info.device)
}

impl Graph {
    /// Runs backward from `root` with default options.
    pub fn backward(&mut self, root: VarId) -> Result<(), GradrunError> {
        self.backward_with(root, BackwardOptions::default())
    }

    /// Propagates gradients from `root` to every variable it depends on.
    ///
    /// The seed is, in order of preference: `options.grad`, the gradient
    /// already stored on `root`, or ones when `root` has a single element.
    ///
    /// Gradients are summed into the gradient buffers of every input that
    /// requires them. A function runs once all consumers of its outputs have
    /// run, so its output gradients are complete when it is invoked.
    ///
    /// # Errors
    /// * `BackwardNonScalar` when no seed is available.
    /// * `TypeContractViolation` when a seed, an output gradient or a
    ///   returned input gradient does not match the recorded type info. The
    ///   traversal stops there; gradients accumulated so far are kept and the
    ///   failing function's inputs are left untouched.
    pub fn backward_with(&mut self, root: VarId, options: BackwardOptions) -> Result<(), GradrunError> {
        let node = self.node(root)?;
        if !node.requires_grad {
            warn!("backward called on constant {}, nothing to do", root);
            return Ok(());
        }
        let seed = match options.grad {
            Some(grad) => {
                type_check::expect_same_type(
                    "backward",
                    ("root", &node.data.type_info()),
                    ("grad", &grad.type_info()),
                )?;
                grad
            }
            None => match &node.grad {
                Some(existing) => existing.clone(),
                None if node.data.numel() == 1 => node.data.ones_like(),
                None => {
                    return Err(GradrunError::BackwardNonScalar {
                        shape: node.data.shape().to_vec(),
                    })
                }
            },
        };
        self.variables[root.0].grad = Some(seed);

        let (mut pending, mut waiting) = self.discover(root);
        debug!(
            "backward from {}: {} functions, {} variables reachable",
            root,
            waiting.len(),
            pending.len() + 1
        );

        let mut ready = BinaryHeap::new();
        ready.push(root);
        while let Some(var) = ready.pop() {
            let Some(creator) = self.variables[var.0].creator else {
                continue;
            };
            let Some(count) = waiting.get_mut(&creator) else {
                continue;
            };
            *count -= 1;
            if *count > 0 {
                continue;
            }

            let input_grads = self.run_function_backward(creator)?;
            for (input, grad) in input_grads {
                if let Some(grad) = grad {
                    let node = &mut self.variables[input.0];
                    if node.requires_grad {
                        node.grad = Some(match node.grad.take() {
                            Some(acc) => acc.accumulate(&grad)?,
                            None => grad,
                        });
                    }
                }
                if let Some(p) = pending.get_mut(&input) {
                    *p -= 1;
                    if *p == 0 {
                        ready.push(input);
                    }
                }
            }

            if !options.retain_grad {
                let outputs = self.function_node(creator)?.outputs.clone();
                for output in outputs.into_iter().filter(|&o| o != root) {
                    self.variables[output.0].grad = None;
                }
            }
        }
        Ok(())
    }

    /// Finds the functions reachable from `root` and returns, per variable,
    /// the number of reachable consuming slots and, per function, the number
    /// of its outputs that must be ready before it runs.
    fn discover(&self, root: VarId) -> (HashMap<VarId, usize>, HashMap<FuncId, usize>) {
        let mut pending: HashMap<VarId, usize> = HashMap::new();
        let mut functions: Vec<FuncId> = Vec::new();
        let mut seen = HashSet::new();
        let mut stack: Vec<FuncId> = self.live_creator(root).into_iter().collect();
        while let Some(func_id) = stack.pop() {
            if !seen.insert(func_id) {
                continue;
            }
            functions.push(func_id);
            if let Some(node) = self.functions[func_id.0].as_ref() {
                for &input in &node.inputs {
                    *pending.entry(input).or_insert(0) += 1;
                    if let Some(creator) = self.live_creator(input) {
                        stack.push(creator);
                    }
                }
            }
        }

        let waiting = functions
            .into_iter()
            .filter_map(|func_id| {
                let node = self.functions[func_id.0].as_ref()?;
                let reachable = node
                    .outputs
                    .iter()
                    .filter(|&&o| o == root || pending.contains_key(&o))
                    .count();
                Some((func_id, reachable))
            })
            .collect();
        (pending, waiting)
    }

    fn live_creator(&self, id: VarId) -> Option<FuncId> {
        self.variables[id.0]
            .creator
            .filter(|f| self.functions.get(f.0).is_some_and(Option::is_some))
    }

    /// Validates and runs the backward of one function. Nothing is mutated,
    /// so a failure leaves every gradient buffer as it was.
    fn run_function_backward(&self, func_id: FuncId) -> Result<Vec<(VarId, Option<Tensor>)>, GradrunError> {
        let node = self.function_node(func_id)?;
        let label = node.function.label();

        let grad_outputs: Vec<Tensor> = node
            .outputs
            .iter()
            .zip(&node.output_types)
            .map(|(o, info)| {
                self.variables[o.0]
                    .grad
                    .clone()
                    .unwrap_or_else(|| zeros_for(info))
            })
            .collect();
        type_check::expect_matches_recorded(label, "grad_outputs", &type_infos(&grad_outputs), &node.output_types)?;

        trace!("backward of {} ({})", func_id, label);
        let grad_inputs = node
            .function
            .backward(&node.retained_inputs, &grad_outputs, node.device)?;

        if grad_inputs.len() != node.inputs.len() {
            return Err(GradrunError::type_violation(
                label,
                "grad_inputs.size()",
                node.inputs.len(),
                grad_inputs.len(),
            ));
        }
        for (i, (grad, input)) in grad_inputs.iter().zip(&node.retained_inputs).enumerate() {
            if let Some(grad) = grad {
                type_check::expect_same_type(
                    label,
                    (&format!("in_types[{i}]"), &input.type_info()),
                    (&format!("grad_inputs[{i}]"), &grad.type_info()),
                )?;
            }
        }
        Ok(node.inputs.iter().copied().zip(grad_inputs).collect())
    }
}
