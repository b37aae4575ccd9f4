use gradrun_core::type_check::{self, TypeInfo};
use gradrun_core::{GradrunError, Tensor};
use std::fmt;
use std::ops::Deref;

/// A named tensor updated by an [`Optimizer`](crate::Optimizer).
///
/// Parameters live outside any [`Graph`](gradrun_core::Graph): every training
/// step registers them as fresh leaves and writes the optimized values back.
#[derive(Clone, PartialEq)]
pub struct Parameter {
    name: String,
    value: Tensor,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: Tensor) -> Self {
        Parameter {
            name: name.into(),
            value,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &Tensor {
        &self.value
    }

    /// Replaces the value, keeping dtype, shape and device fixed.
    pub fn set_value(&mut self, value: Tensor) -> Result<(), GradrunError> {
        type_check::expect_same_type(
            "Parameter::set_value",
            ("value", &TypeInfo::of(&self.value)),
            ("new_value", &TypeInfo::of(&value)),
        )?;
        self.value = value;
        Ok(())
    }

    pub fn into_inner(self) -> Tensor {
        self.value
    }
}

impl Deref for Parameter {
    type Target = Tensor;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Parameter({}: {:?})", self.name, self.value.type_info())
    }
}
