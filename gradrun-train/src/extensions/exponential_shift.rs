use super::{read_base, ScheduleState};
use crate::extension::{Extension, ExtensionContext};
use gradrun_core::GradrunError;
use log::{debug, info};
use serde_json::Value;

/// Multiplies an optimizer attribute by `rate` on every call.
///
/// After `t` calls the attribute is `base * rate^t`. With a `target`, the
/// value stops at the target once it passes it: from below when
/// `rate > 1`, from above when `rate < 1`.
#[derive(Debug, Clone)]
pub struct ExponentialShift {
    attr: String,
    rate: f64,
    init: Option<f64>,
    target: Option<f64>,
    base: Option<f64>,
    t: usize,
}

impl ExponentialShift {
    /// # Errors
    /// `ConfigurationError` unless `rate` is finite and positive.
    pub fn new(
        attr: impl Into<String>,
        rate: f64,
        init: Option<f64>,
        target: Option<f64>,
    ) -> Result<Self, GradrunError> {
        if !(rate.is_finite() && rate > 0.0) {
            return Err(GradrunError::ConfigurationError(format!(
                "ExponentialShift rate must be positive and finite, got {rate}"
            )));
        }
        Ok(ExponentialShift {
            attr: attr.into(),
            rate,
            init,
            target,
            base: init,
            t: 0,
        })
    }

    pub fn t(&self) -> usize {
        self.t
    }

    pub fn current_value(&self) -> Option<f64> {
        let value = self.base? * self.rate.powf(self.t as f64);
        Some(match self.target {
            Some(target) if self.rate > 1.0 && value > target => target,
            Some(target) if self.rate < 1.0 && value < target => target,
            _ => value,
        })
    }

    fn ensure_base(&mut self, ctx: &ExtensionContext<'_>) -> Result<(), GradrunError> {
        if self.base.is_none() {
            let base = read_base("ExponentialShift", &*ctx.optimizer, &self.attr)?;
            debug!("ExponentialShift: {} starts from the optimizer's {}", self.attr, base);
            self.base = Some(base);
        }
        Ok(())
    }

    fn apply(&self, ctx: &mut ExtensionContext<'_>) -> Result<(), GradrunError> {
        if let Some(value) = self.current_value() {
            ctx.optimizer.set_hyperparam(&self.attr, value)?;
        }
        Ok(())
    }
}

impl Extension for ExponentialShift {
    fn name(&self) -> &str {
        "ExponentialShift"
    }

    fn initialize(&mut self, ctx: &mut ExtensionContext<'_>) -> Result<(), GradrunError> {
        self.ensure_base(ctx)?;
        self.apply(ctx)
    }

    fn call(&mut self, ctx: &mut ExtensionContext<'_>) -> Result<(), GradrunError> {
        self.ensure_base(ctx)?;
        self.t += 1;
        if let Some(value) = self.current_value() {
            info!("ExponentialShift: {} -> {} at call {}", self.attr, value, self.t);
        }
        self.apply(ctx)
    }

    fn state(&self) -> Result<Value, GradrunError> {
        ScheduleState {
            t: self.t,
            base: self.base,
            last_value: self.current_value(),
        }
        .to_value()
    }

    fn load_state(&mut self, state: Value) -> Result<(), GradrunError> {
        let state = ScheduleState::from_value(state)?;
        self.t = state.t;
        self.base = state.base.or(self.init);
        Ok(())
    }
}
