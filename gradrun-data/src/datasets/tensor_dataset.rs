use super::traits::Dataset;
use gradrun_core::{GradrunError, Tensor};

/// A dataset composed of one or more tensors sharing their first dimension.
///
/// `get(index)` returns one row per tensor: the slice at `index` along the
/// first axis.
#[derive(Debug, Clone)]
pub struct TensorDataset {
    tensors: Vec<Tensor>,
    length: usize,
}

impl TensorDataset {
    /// An empty list gives an empty dataset.
    ///
    /// # Errors
    ///
    /// `TypeContractViolation` if a tensor is rank 0 or if first dimensions differ.
    pub fn new(tensors: Vec<Tensor>) -> Result<Self, GradrunError> {
        let mut length = None;
        for (i, tensor) in tensors.iter().enumerate() {
            let Some(&rows) = tensor.shape().first() else {
                return Err(GradrunError::type_violation(
                    "TensorDataset::new",
                    format!("tensors[{i}].ndim"),
                    ">= 1",
                    0,
                ));
            };
            match length {
                None => length = Some(rows),
                Some(expected) if expected != rows => {
                    return Err(GradrunError::type_violation(
                        "TensorDataset::new",
                        format!("tensors[{i}].shape[0] == tensors[0].shape[0]"),
                        expected,
                        rows,
                    ));
                }
                Some(_) => {}
            }
        }
        Ok(Self {
            tensors,
            length: length.unwrap_or(0),
        })
    }
}

impl Dataset for TensorDataset {
    type Item = Vec<Tensor>;

    fn get(&self, index: usize) -> Result<Self::Item, GradrunError> {
        if index >= self.length {
            return Err(GradrunError::IndexOutOfBounds {
                index,
                len: self.length,
            });
        }
        self.tensors.iter().map(|t| t.row(index)).collect()
    }

    fn len(&self) -> usize {
        self.length
    }
}

#[cfg(test)]
#[path = "tensor_dataset_test.rs"]
mod tests;
