pub mod add;
pub mod mul;
pub mod mul_constant;


pub use add::{add_op, Add};
pub use mul::{mul_op, Mul};
pub use mul_constant::{mul_constant_op, MulConstant};
