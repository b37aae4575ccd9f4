//! Extensions that shift an optimizer hyperparameter on a schedule.

pub mod exponential_shift;
pub mod multistep_shift;

#[cfg(test)]
mod exponential_shift_test;

pub use exponential_shift::ExponentialShift;
pub use multistep_shift::MultistepShift;

use gradrun_core::GradrunError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Persisted counters of a schedule extension.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScheduleState {
    /// Number of times the extension has been called.
    pub t: usize,
    /// Value the schedule starts from; `None` until it is known.
    pub base: Option<f64>,
    /// Last value written to the optimizer.
    pub last_value: Option<f64>,
}

impl ScheduleState {
    pub(crate) fn to_value(self) -> Result<Value, GradrunError> {
        serde_json::to_value(self).map_err(|e| GradrunError::StateSerialization(e.to_string()))
    }

    pub(crate) fn from_value(value: Value) -> Result<Self, GradrunError> {
        serde_json::from_value(value).map_err(|e| GradrunError::StateSerialization(e.to_string()))
    }
}

/// Reads the starting value of `attr` from the optimizer.
pub(crate) fn read_base(
    extension: &str,
    optimizer: &dyn crate::optimizer::Hyperparameters,
    attr: &str,
) -> Result<f64, GradrunError> {
    optimizer.hyperparam(attr).ok_or_else(|| {
        GradrunError::ConfigurationError(format!(
            "{extension}: optimizer has no hyperparameter '{attr}'"
        ))
    })
}
