//! # Type contracts
//!
//! Every [`Function`](crate::autograd::Function) declares what it accepts as an
//! ordered list of per-argument expectations. The checks here run before any
//! kernel executes and fail fast with
//! [`GradrunError::TypeContractViolation`], naming the offending predicate
//! (e.g. `in_types[0].dtype`) with the expected and actual values.
//!
//! The checks only read the [`TypeInfo`] snapshots; they never touch data or
//! gradient buffers.

use crate::device::StorageDevice;
use crate::error::GradrunError;
use crate::tensor::Tensor;
use crate::types::DType;
use std::fmt;

/// The properties of one argument that a type contract can inspect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeInfo {
    pub dtype: DType,
    pub shape: Vec<usize>,
    pub device: StorageDevice,
}

impl TypeInfo {
    pub fn of(tensor: &Tensor) -> Self {
        TypeInfo {
            dtype: tensor.dtype(),
            shape: tensor.shape().to_vec(),
            device: tensor.device(),
        }
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }
}

/// Collects the type info of a list of tensors.
pub fn type_infos(tensors: &[Tensor]) -> Vec<TypeInfo> {
    tensors.iter().map(TypeInfo::of).collect()
}

/// Expected rank of an argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rank {
    #[default]
    Any,
    Exactly(usize),
    AtLeast(usize),
}

/// Expected dtype of an argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DTypeSpec {
    #[default]
    Any,
    Exactly(DType),
    Float,
}

/// Declared expectation for a single argument.
///
/// Built with chained setters:
///
/// ```
/// use gradrun_core::type_check::ArgSpec;
/// use gradrun_core::DType;
///
/// let spec = ArgSpec::new().dtype(DType::F32).min_ndim(1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgSpec {
    dtype: DTypeSpec,
    rank: Rank,
    shape: Option<Vec<usize>>,
}

impl ArgSpec {
    /// An expectation that accepts anything.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dtype(mut self, dtype: DType) -> Self {
        self.dtype = DTypeSpec::Exactly(dtype);
        self
    }

    /// Accepts `F32` and `F64`.
    pub fn floating(mut self) -> Self {
        self.dtype = DTypeSpec::Float;
        self
    }

    pub fn ndim(mut self, ndim: usize) -> Self {
        self.rank = Rank::Exactly(ndim);
        self
    }

    pub fn min_ndim(mut self, ndim: usize) -> Self {
        self.rank = Rank::AtLeast(ndim);
        self
    }

    pub fn shape(mut self, shape: Vec<usize>) -> Self {
        self.shape = Some(shape);
        self
    }

    /// Checks `actual` against this expectation. `label` names the argument
    /// in error messages, e.g. `in_types[1]`.
    pub fn check(&self, operation: &str, label: &str, actual: &TypeInfo) -> Result<(), GradrunError> {
        match self.dtype {
            DTypeSpec::Any => {}
            DTypeSpec::Exactly(expected) if expected != actual.dtype => {
                return Err(GradrunError::type_violation(
                    operation,
                    format!("{label}.dtype"),
                    expected,
                    actual.dtype,
                ));
            }
            DTypeSpec::Float if !actual.dtype.is_float() => {
                return Err(GradrunError::type_violation(
                    operation,
                    format!("{label}.dtype.kind"),
                    "float",
                    actual.dtype,
                ));
            }
            _ => {}
        }
        match self.rank {
            Rank::Any => {}
            Rank::Exactly(n) if n != actual.ndim() => {
                return Err(GradrunError::type_violation(
                    operation,
                    format!("{label}.ndim"),
                    n,
                    actual.ndim(),
                ));
            }
            Rank::AtLeast(n) if actual.ndim() < n => {
                return Err(GradrunError::type_violation(
                    operation,
                    format!("{label}.ndim"),
                    format!(">= {n}"),
                    actual.ndim(),
                ));
            }
            _ => {}
        }
        if let Some(shape) = &self.shape {
            if shape != &actual.shape {
                return Err(GradrunError::type_violation(
                    operation,
                    format!("{label}.shape"),
                    Shape(shape),
                    Shape(&actual.shape),
                ));
            }
        }
        Ok(())
    }
}

struct Shape<'a>(&'a [usize]);

impl fmt::Display for Shape<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

/// Checks the number of arguments. `kind` is `in_types`, `out_types`, ...
pub fn expect_count(
    operation: &str,
    kind: &str,
    actual: &[TypeInfo],
    expected: usize,
) -> Result<(), GradrunError> {
    if actual.len() != expected {
        return Err(GradrunError::type_violation(
            operation,
            format!("{kind}.size()"),
            expected,
            actual.len(),
        ));
    }
    Ok(())
}

/// Checks the count, then each argument against its declared expectation.
pub fn check_arguments(
    operation: &str,
    kind: &str,
    actual: &[TypeInfo],
    specs: &[ArgSpec],
) -> Result<(), GradrunError> {
    expect_count(operation, kind, actual, specs.len())?;
    for (i, (spec, info)) in specs.iter().zip(actual).enumerate() {
        spec.check(operation, &format!("{kind}[{i}]"), info)?;
    }
    Ok(())
}

pub fn expect_same_dtype(
    operation: &str,
    lhs: (&str, &TypeInfo),
    rhs: (&str, &TypeInfo),
) -> Result<(), GradrunError> {
    if lhs.1.dtype != rhs.1.dtype {
        return Err(GradrunError::type_violation(
            operation,
            format!("{}.dtype == {}.dtype", rhs.0, lhs.0),
            lhs.1.dtype,
            rhs.1.dtype,
        ));
    }
    Ok(())
}

pub fn expect_same_ndim(
    operation: &str,
    lhs: (&str, &TypeInfo),
    rhs: (&str, &TypeInfo),
) -> Result<(), GradrunError> {
    if lhs.1.ndim() != rhs.1.ndim() {
        return Err(GradrunError::type_violation(
            operation,
            format!("{}.ndim == {}.ndim", rhs.0, lhs.0),
            lhs.1.ndim(),
            rhs.1.ndim(),
        ));
    }
    Ok(())
}

/// Rank is compared first so that a rank mismatch is reported as such.
pub fn expect_same_shape(
    operation: &str,
    lhs: (&str, &TypeInfo),
    rhs: (&str, &TypeInfo),
) -> Result<(), GradrunError> {
    expect_same_ndim(operation, lhs, rhs)?;
    if lhs.1.shape != rhs.1.shape {
        return Err(GradrunError::type_violation(
            operation,
            format!("{}.shape == {}.shape", rhs.0, lhs.0),
            Shape(&lhs.1.shape),
            Shape(&rhs.1.shape),
        ));
    }
    Ok(())
}

pub fn expect_same_device(
    operation: &str,
    lhs: (&str, &TypeInfo),
    rhs: (&str, &TypeInfo),
) -> Result<(), GradrunError> {
    if lhs.1.device != rhs.1.device {
        return Err(GradrunError::type_violation(
            operation,
            format!("{}.device == {}.device", rhs.0, lhs.0),
            lhs.1.device,
            rhs.1.device,
        ));
    }
    Ok(())
}

/// dtype, shape and device all equal.
pub fn expect_same_type(
    operation: &str,
    lhs: (&str, &TypeInfo),
    rhs: (&str, &TypeInfo),
) -> Result<(), GradrunError> {
    expect_same_dtype(operation, lhs, rhs)?;
    expect_same_shape(operation, lhs, rhs)?;
    expect_same_device(operation, lhs, rhs)
}

/// Validates a list of gradients against the type info recorded for the
/// tensors they belong to (count, then dtype/shape/device per slot).
pub fn expect_matches_recorded(
    operation: &str,
    kind: &str,
    actual: &[TypeInfo],
    recorded: &[TypeInfo],
) -> Result<(), GradrunError> {
    expect_count(operation, kind, actual, recorded.len())?;
    for (i, (got, want)) in actual.iter().zip(recorded).enumerate() {
        let expected_label = format!("recorded[{i}]");
        let actual_label = format!("{kind}[{i}]");
        expect_same_type(operation, (&expected_label, want), (&actual_label, got))?;
    }
    Ok(())
}
