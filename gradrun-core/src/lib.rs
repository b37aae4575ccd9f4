//! # gradrun-core
//!
//! Define-by-run automatic differentiation: immutable device-tagged tensors,
//! operators with paired forward/backward kernels guarded by type contracts,
//! and an arena graph whose backward engine propagates gradients in reverse
//! topological order.

pub mod autograd;
pub mod backend;
pub mod buffer;
pub mod device;
pub mod error;
pub mod ops;
pub mod tensor;
pub mod type_check;
pub mod types;


pub use autograd::gradient_check::{check_backward, GradCheckError};
pub use autograd::{BackwardOptions, FuncId, Function, Graph, VarId};
pub use buffer::Buffer;
pub use device::StorageDevice;
pub use error::GradrunError;
pub use tensor::Tensor;
pub use type_check::{ArgSpec, TypeInfo};
pub use types::{DType, Element, FloatElement, Scalar};

// Re-export traits required by public functions/structs
pub use num_traits;
