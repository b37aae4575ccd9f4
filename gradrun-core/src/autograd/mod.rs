//! # Define-by-run automatic differentiation
//!
//! The forward pass builds a [`Graph`] on the fly: every [`Function`] applied
//! to variables is recorded with its inputs and outputs. Calling
//! [`Graph::backward`] on a terminal variable walks that record in reverse
//! and accumulates gradients into every variable that requires them.

pub mod backward;
pub mod function;
pub mod gradient_check;
pub mod graph;


pub use backward::BackwardOptions;
pub use function::Function;
pub use graph::{FuncId, Graph, VarId};
