use crate::device::StorageDevice;
use std::fmt::Display;
use thiserror::Error;

/// Custom error type for the gradrun framework.
#[derive(Error, Debug, PartialEq, Clone)] // PartialEq for easier testing
pub enum GradrunError {
    /// An argument violated the declared type contract of an operation
    /// (count, dtype, rank, shape or device).
    #[error("Type contract violated in {operation}: expected {predicate} == {expected}, got {actual}")]
    TypeContractViolation {
        operation: String,
        predicate: String,
        expected: String,
        actual: String,
    },

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// A non-repeating iterator has completed its sweeps. This is a terminal
    /// signal, not a failure.
    #[error("No more data: the iterator has completed its configured sweeps")]
    DataExhausted,

    #[error("Backward called on a variable of shape {shape:?} without an explicit gradient")]
    BackwardNonScalar { shape: Vec<usize> },

    #[error("Device {0} is not available in this build")]
    DeviceUnavailable(StorageDevice),

    #[error("Invalid graph handle: {0}")]
    InvalidHandle(String),

    #[error("Tensor creation error: data length {data_len} does not match shape {shape:?}")]
    TensorCreationError { data_len: usize, shape: Vec<usize> },

    #[error("Index out of bounds: index {index} for length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("Failed to serialize or deserialize state: {0}")]
    StateSerialization(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl GradrunError {
    /// Builds a `TypeContractViolation` from displayable expected/actual values.
    pub fn type_violation(
        operation: impl Into<String>,
        predicate: impl Into<String>,
        expected: impl Display,
        actual: impl Display,
    ) -> Self {
        GradrunError::TypeContractViolation {
            operation: operation.into(),
            predicate: predicate.into(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// True for the distinguished end-of-data signal.
    pub fn is_data_exhausted(&self) -> bool {
        matches!(self, GradrunError::DataExhausted)
    }
}
