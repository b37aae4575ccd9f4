// gradrun-train/src/extensions/multistep_shift.rs

use super::{read_base, ScheduleState};
use crate::extension::{Extension, ExtensionContext};
use gradrun_core::GradrunError;
use log::info;
use serde_json::Value;

/// Staircase schedule: multiplies an optimizer attribute by `gamma` each
/// time the invocation count reaches one of the `steps`.
///
/// After `t` calls the attribute is `base * gamma^k`, where `k` is the
/// number of steps `<= t`. The base is `init`, or the optimizer's value at
/// `initialize` time when `init` is `None`.
///
/// ```
/// use gradrun_train::extensions::MultistepShift;
///
/// let shift = MultistepShift::new("lr", 0.1, vec![1, 3, 5], Some(2.0)).unwrap();
/// assert_eq!(shift.steps(), &[1, 3, 5]);
/// ```
#[derive(Debug, Clone)]
pub struct MultistepShift {
    attr: String,
    gamma: f64,
    steps: Vec<usize>,
    init: Option<f64>,
    base: Option<f64>,
    t: usize,
    consumed: usize,
}

impl MultistepShift {
    /// `steps` may be given in any order; duplicates count once.
    ///
    /// # Errors
    /// `ConfigurationError` for a non-finite `gamma` or `init`.
    pub fn new(
        attr: impl Into<String>,
        gamma: f64,
        mut steps: Vec<usize>,
        init: Option<f64>,
    ) -> Result<Self, GradrunError> {
        if !gamma.is_finite() {
            return Err(GradrunError::ConfigurationError(format!(
                "MultistepShift gamma must be finite, got {gamma}"
            )));
        }
        if let Some(init) = init.filter(|v| !v.is_finite()) {
            return Err(GradrunError::ConfigurationError(format!(
                "MultistepShift init must be finite, got {init}"
            )));
        }
        steps.sort_unstable();
        steps.dedup();
        Ok(MultistepShift {
            attr: attr.into(),
            gamma,
            steps,
            init,
            base: init,
            t: 0,
            consumed: 0,
        })
    }

    pub fn attr(&self) -> &str {
        &self.attr
    }

    pub fn steps(&self) -> &[usize] {
        &self.steps
    }

    /// Invocation count.
    pub fn t(&self) -> usize {
        self.t
    }

    /// Value the schedule currently prescribes, once the base is known.
    pub fn current_value(&self) -> Option<f64> {
        self.base.map(|base| base * self.gamma.powf(self.consumed as f64))
    }

    fn consume_reached_steps(&mut self) -> bool {
        let before = self.consumed;
        while self.steps.get(self.consumed).is_some_and(|&step| step <= self.t) {
            self.consumed += 1;
        }
        self.consumed != before
    }

    fn apply(&self, ctx: &mut ExtensionContext<'_>) -> Result<(), GradrunError> {
        if let Some(value) = self.current_value() {
            ctx.optimizer.set_hyperparam(&self.attr, value)?;
        }
        Ok(())
    }
}

impl Extension for MultistepShift {
    fn name(&self) -> &str {
        "MultistepShift"
    }

    fn initialize(&mut self, ctx: &mut ExtensionContext<'_>) -> Result<(), GradrunError> {
        if self.base.is_none() {
            self.base = Some(read_base("MultistepShift", &*ctx.optimizer, &self.attr)?);
        }
        self.apply(ctx)
    }

    fn call(&mut self, ctx: &mut ExtensionContext<'_>) -> Result<(), GradrunError> {
        if self.base.is_none() {
            self.base = Some(read_base("MultistepShift", &*ctx.optimizer, &self.attr)?);
        }
        self.t += 1;
        if self.consume_reached_steps() {
            if let Some(value) = self.current_value() {
                info!(
                    "MultistepShift: {} -> {} at call {} ({} of {} steps)",
                    self.attr,
                    value,
                    self.t,
                    self.consumed,
                    self.steps.len()
                );
            }
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
        self.consumed = 0;
        self.consume_reached_steps();
        Ok(())
    }
}
