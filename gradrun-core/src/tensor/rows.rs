use super::Tensor;
use crate::buffer::Buffer;
use crate::error::GradrunError;
use crate::type_check::{self, TypeInfo};

impl Tensor {
    /// Copies the `index`-th slice along the first axis. The result has the
    /// remaining dimensions and stays on the same device.
    ///
    /// # Errors
    /// `TypeContractViolation` for rank-0 tensors, `IndexOutOfBounds` past the
    /// first axis.
    pub fn row(&self, index: usize) -> Result<Tensor, GradrunError> {
        let Some((&rows, rest)) = self.shape.split_first() else {
            return Err(GradrunError::type_violation("row", "ndim", ">= 1", 0));
        };
        if index >= rows {
            return Err(GradrunError::IndexOutOfBounds { index, len: rows });
        }
        let width: usize = rest.iter().product();
        let start = index * width;
        let buffer = self
            .buffer
            .slice(start..start + width)
            .ok_or_else(|| GradrunError::InternalError(format!("row {} outside buffer", index)))?;
        Ok(Tensor::from_parts(buffer, rest.to_vec(), self.device))
    }
}

/// Stacks tensors of identical type along a new leading axis.
///
/// # Errors
/// `ConfigurationError` for an empty list, `TypeContractViolation` when the
/// tensors differ in dtype, shape or device.
pub fn stack(tensors: &[Tensor]) -> Result<Tensor, GradrunError> {
    let first = tensors
        .first()
        .ok_or_else(|| GradrunError::ConfigurationError("stack needs at least one tensor".to_string()))?;
    let first_info = TypeInfo::of(first);
    for (i, t) in tensors.iter().enumerate().skip(1) {
        type_check::expect_same_type(
            "stack",
            ("tensors[0]", &first_info),
            (&format!("tensors[{i}]"), &TypeInfo::of(t)),
        )?;
    }
    let parts: Vec<&Buffer> = tensors.iter().map(|t| t.buffer()).collect();
    let buffer = Buffer::concat(&parts)
        .ok_or_else(|| GradrunError::InternalError("stack: buffer dtypes diverged".to_string()))?;
    let mut shape = Vec::with_capacity(first.ndim() + 1);
    shape.push(tensors.len());
    shape.extend_from_slice(first.shape());
    Ok(Tensor::from_parts(buffer, shape, first.device()))
}
