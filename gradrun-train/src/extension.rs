use crate::optimizer::Hyperparameters;
use crate::trigger::{IntervalTrigger, Progress, Trigger};
use gradrun_core::GradrunError;
use serde_json::Value;

/// What an extension sees of the training loop when it runs.
pub struct ExtensionContext<'a> {
    pub progress: Progress,
    /// Hyperparameters of the optimizer being trained.
    pub optimizer: &'a mut dyn Hyperparameters,
    /// Loss of the most recent update, if one happened.
    pub loss: Option<f64>,
}

/// A periodic callback of the [`Trainer`](crate::Trainer).
///
/// The trainer calls `initialize` once before the first update, `call`
/// after every update its trigger fires on, and `finalize` once when the
/// loop ends.
pub trait Extension: Send {
    fn name(&self) -> &str;

    /// Trigger used when the extension is registered without one.
    fn default_trigger(&self) -> Box<dyn Trigger> {
        Box::new(IntervalTrigger::every_iteration())
    }

    fn initialize(&mut self, _ctx: &mut ExtensionContext<'_>) -> Result<(), GradrunError> {
        Ok(())
    }

    fn call(&mut self, ctx: &mut ExtensionContext<'_>) -> Result<(), GradrunError>;

    fn finalize(&mut self) {}

    /// Serializable snapshot of the extension's internal counters.
    fn state(&self) -> Result<Value, GradrunError> {
        Ok(Value::Null)
    }

    fn load_state(&mut self, _state: Value) -> Result<(), GradrunError> {
        Ok(())
    }
}
