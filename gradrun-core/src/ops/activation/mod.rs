pub mod clipped_relu;
pub mod relu;


pub use clipped_relu::{clipped_relu_op, ClippedRelu};
pub use relu::{relu_op, Relu};
