use super::function::Function;
use crate::device::StorageDevice;
use crate::error::GradrunError;
use crate::tensor::Tensor;
use crate::type_check::{self, type_infos, TypeInfo};
use log::debug;
use std::collections::HashSet;
use std::fmt;

/// Handle of a variable node inside a [`Graph`].
///
/// Handles are plain indices: they are only meaningful for the graph that
/// produced them. Larger ids were created later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarId(pub(crate) usize);

/// Handle of a function node inside a [`Graph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FuncId(pub(crate) usize);

impl VarId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl FuncId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "var#{}", self.0)
    }
}

impl fmt::Display for FuncId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "func#{}", self.0)
    }
}

#[derive(Debug)]
pub(crate) struct VariableNode {
    pub(crate) data: Tensor,
    pub(crate) grad: Option<Tensor>,
    pub(crate) creator: Option<FuncId>,
    pub(crate) requires_grad: bool,
    pub(crate) name: Option<String>,
}

#[derive(Debug)]
pub(crate) struct FunctionNode {
    pub(crate) function: Box<dyn Function>,
    pub(crate) inputs: Vec<VarId>,
    pub(crate) outputs: Vec<VarId>,
    /// Input tensors as seen by forward, kept alive for backward.
    pub(crate) retained_inputs: Vec<Tensor>,
    /// Type info of the outputs recorded by forward.
    pub(crate) output_types: Vec<TypeInfo>,
    pub(crate) device: StorageDevice,
}

/// Arena holding the computation graph of one define-by-run session.
///
/// Variables and functions are stored in insertion order and addressed by
/// [`VarId`] / [`FuncId`]. A variable points to the function that produced
/// it (its creator); a function records the variables it consumed and
/// produced. Since a function can only consume variables already present in
/// the arena, the graph is acyclic by construction.
///
/// Dropping the graph releases every node and every retained tensor.
#[derive(Debug, Default)]
pub struct Graph {
    pub(crate) variables: Vec<VariableNode>,
    pub(crate) functions: Vec<Option<FunctionNode>>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a leaf variable that accumulates gradients.
    pub fn variable(&mut self, data: Tensor) -> VarId {
        self.push_variable(data, None, true)
    }

    /// Registers a leaf variable carrying a name, used in logs.
    pub fn named_variable(&mut self, data: Tensor, name: impl Into<String>) -> VarId {
        let id = self.push_variable(data, None, true);
        self.variables[id.0].name = Some(name.into());
        id
    }

    /// Registers a leaf that never receives a gradient.
    pub fn constant(&mut self, data: Tensor) -> VarId {
        self.push_variable(data, None, false)
    }

    fn push_variable(&mut self, data: Tensor, creator: Option<FuncId>, requires_grad: bool) -> VarId {
        let id = VarId(self.variables.len());
        self.variables.push(VariableNode {
            data,
            grad: None,
            creator,
            requires_grad,
            name: None,
        });
        id
    }

    /// Number of variables in the arena.
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Number of functions still bound in the graph.
    pub fn num_functions(&self) -> usize {
        self.functions.iter().filter(|f| f.is_some()).count()
    }

    pub(crate) fn node(&self, id: VarId) -> Result<&VariableNode, GradrunError> {
        self.variables
            .get(id.0)
            .ok_or_else(|| GradrunError::InvalidHandle(format!("{} (graph has {} variables)", id, self.variables.len())))
    }

    fn node_mut(&mut self, id: VarId) -> Result<&mut VariableNode, GradrunError> {
        let len = self.variables.len();
        self.variables
            .get_mut(id.0)
            .ok_or_else(|| GradrunError::InvalidHandle(format!("{} (graph has {} variables)", id, len)))
    }

    pub(crate) fn function_node(&self, id: FuncId) -> Result<&FunctionNode, GradrunError> {
        self.functions
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or_else(|| GradrunError::InvalidHandle(format!("{} is unknown or was released", id)))
    }

    pub fn data(&self, id: VarId) -> Result<&Tensor, GradrunError> {
        Ok(&self.node(id)?.data)
    }

    pub fn grad(&self, id: VarId) -> Result<Option<&Tensor>, GradrunError> {
        Ok(self.node(id)?.grad.as_ref())
    }

    /// Replaces the gradient of `id`. A new gradient must have the variable's
    /// dtype, shape and device.
    pub fn set_grad(&mut self, id: VarId, grad: Option<Tensor>) -> Result<(), GradrunError> {
        let node = self.node_mut(id)?;
        if let Some(g) = &grad {
            type_check::expect_same_type(
                "set_grad",
                ("data", &node.data.type_info()),
                ("grad", &g.type_info()),
            )?;
        }
        node.grad = grad;
        Ok(())
    }

    pub fn cleargrad(&mut self, id: VarId) -> Result<(), GradrunError> {
        self.node_mut(id)?.grad = None;
        Ok(())
    }

    /// Clears the gradient of every variable in the arena.
    pub fn cleargrads(&mut self) {
        for node in &mut self.variables {
            node.grad = None;
        }
    }

    pub fn requires_grad(&self, id: VarId) -> Result<bool, GradrunError> {
        Ok(self.node(id)?.requires_grad)
    }

    pub fn name(&self, id: VarId) -> Result<Option<&str>, GradrunError> {
        Ok(self.node(id)?.name.as_deref())
    }

    /// The function that produced `id`, `None` for leaves and unchained variables.
    pub fn creator(&self, id: VarId) -> Result<Option<FuncId>, GradrunError> {
        Ok(self.node(id)?.creator)
    }

    pub fn inputs_of(&self, id: FuncId) -> Result<&[VarId], GradrunError> {
        Ok(&self.function_node(id)?.inputs)
    }

    pub fn outputs_of(&self, id: FuncId) -> Result<&[VarId], GradrunError> {
        Ok(&self.function_node(id)?.outputs)
    }

    pub fn function_label(&self, id: FuncId) -> Result<&'static str, GradrunError> {
        Ok(self.function_node(id)?.function.label())
    }

    /// Runs `function` on the data of `inputs` and records it in the graph.
    ///
    /// The device is taken from the first input (CPU when there are none) and
    /// every input must live on it. When no input requires a gradient the
    /// outputs are registered as constants and nothing is recorded.
    ///
    /// `function` is consumed: an operator instance is bound to exactly one
    /// invocation.
    ///
    /// # Errors
    /// `InvalidHandle` for unknown inputs, `TypeContractViolation` when the
    /// inputs violate the operator's contract, plus whatever its kernel
    /// returns.
    pub fn apply<F>(&mut self, function: F, inputs: &[VarId]) -> Result<Vec<VarId>, GradrunError>
    where
        F: Function + 'static,
    {
        let tensors = inputs
            .iter()
            .map(|&id| self.data(id).cloned())
            .collect::<Result<Vec<_>, _>>()?;
        let device = tensors.first().map(Tensor::device).unwrap_or_default();
        let outputs = function.forward(&tensors, device)?;
        for (i, out) in outputs.iter().enumerate() {
            if out.device() != device {
                return Err(GradrunError::InternalError(format!(
                    "{} produced output {} on {} while running on {}",
                    function.label(),
                    i,
                    out.device(),
                    device
                )));
            }
        }

        let requires_grad = inputs.iter().any(|id| self.variables[id.0].requires_grad);
        if !requires_grad {
            debug!(
                "apply {}: no input requires grad, outputs are constants",
                function.label()
            );
            return Ok(outputs.into_iter().map(|t| self.constant(t)).collect());
        }

        let func_id = FuncId(self.functions.len());
        let output_types = type_infos(&outputs);
        let output_ids: Vec<VarId> = outputs
            .into_iter()
            .map(|t| self.push_variable(t, Some(func_id), true))
            .collect();
        debug!(
            "apply {} as {}: inputs {:?} -> outputs {:?} on {}",
            function.label(),
            func_id,
            inputs,
            output_ids,
            device
        );
        self.functions.push(Some(FunctionNode {
            function: Box::new(function),
            inputs: inputs.to_vec(),
            outputs: output_ids.clone(),
            retained_inputs: tensors,
            output_types,
            device,
        }));
        Ok(output_ids)
    }

    /// [`apply`](Graph::apply) for operators with exactly one output.
    pub fn apply_single<F>(&mut self, function: F, inputs: &[VarId]) -> Result<VarId, GradrunError>
    where
        F: Function + 'static,
    {
        let label = function.label();
        let outputs = self.apply(function, inputs)?;
        match outputs.as_slice() {
            [single] => Ok(*single),
            _ => Err(GradrunError::InternalError(format!(
                "{} returned {} outputs, expected exactly one",
                label,
                outputs.len()
            ))),
        }
    }

    /// Releases every function upstream of `id` together with the tensors it
    /// retained. The variables stay in the arena as leaves with their data.
    pub fn unchain_backward(&mut self, id: VarId) -> Result<(), GradrunError> {
        let mut stack: Vec<FuncId> = self.node(id)?.creator.into_iter().collect();
        let mut seen = HashSet::new();
        let mut released = 0usize;
        while let Some(func_id) = stack.pop() {
            if !seen.insert(func_id) {
                continue;
            }
            let Some(node) = self.functions.get_mut(func_id.0).and_then(Option::take) else {
                continue;
            };
            for &input in &node.inputs {
                if let Some(creator) = self.variables[input.0].creator {
                    stack.push(creator);
                }
            }
            for &output in &node.outputs {
                self.variables[output.0].creator = None;
            }
            released += 1;
        }
        debug!("unchain_backward from {}: released {} functions", id, released);
        Ok(())
    }
}
