// gradrun-train/src/sgd.rs

use crate::optimizer::{check_update_arguments, unknown_hyperparam, Hyperparameters, Optimizer};
use crate::parameter::Parameter;
use gradrun_core::{GradrunError, Tensor};
use log::trace;
use std::collections::HashMap;

fn check_lr(lr: f64) -> Result<f64, GradrunError> {
    if !lr.is_finite() {
        return Err(GradrunError::ConfigurationError(format!(
            "learning rate must be finite, got {lr}"
        )));
    }
    Ok(lr)
}

fn check_momentum(momentum: f64) -> Result<f64, GradrunError> {
    if !(0.0..1.0).contains(&momentum) {
        return Err(GradrunError::ConfigurationError(format!(
            "momentum must be in [0, 1), got {momentum}"
        )));
    }
    Ok(momentum)
}

/// Vanilla stochastic gradient descent: `p = p - lr * grad(p)`.
#[derive(Debug, Clone)]
pub struct Sgd {
    lr: f64,
    t: usize,
}

impl Sgd {
    pub const DEFAULT_LR: f64 = 0.01;

    pub fn new(lr: f64) -> Result<Self, GradrunError> {
        Ok(Sgd { lr: check_lr(lr)?, t: 0 })
    }

    pub fn lr(&self) -> f64 {
        self.lr
    }
}

impl Default for Sgd {
    fn default() -> Self {
        Sgd {
            lr: Self::DEFAULT_LR,
            t: 0,
        }
    }
}

impl Hyperparameters for Sgd {
    fn hyperparam(&self, name: &str) -> Option<f64> {
        match name {
            "lr" => Some(self.lr),
            _ => None,
        }
    }

    fn set_hyperparam(&mut self, name: &str, value: f64) -> Result<(), GradrunError> {
        match name {
            "lr" => self.lr = check_lr(value)?,
            _ => return Err(unknown_hyperparam("Sgd", name)),
        }
        Ok(())
    }

    fn hyperparam_names(&self) -> &'static [&'static str] {
        &["lr"]
    }
}

impl Optimizer for Sgd {
    fn update(&mut self, params: &mut [Parameter], grads: &[Option<Tensor>]) -> Result<(), GradrunError> {
        check_update_arguments("Sgd::update", params, grads)?;
        for (param, grad) in params.iter_mut().zip(grads) {
            let Some(grad) = grad else { continue };
            let updated = param.value().accumulate(&grad.scale(-self.lr)?)?;
            param.set_value(updated)?;
        }
        self.t += 1;
        trace!("Sgd step {} (lr = {})", self.t, self.lr);
        Ok(())
    }

    fn t(&self) -> usize {
        self.t
    }
}

/// SGD with classical momentum:
/// `v = momentum * v - lr * grad(p)`, then `p = p + v`.
///
/// Velocities are kept per parameter name and start at zero.
#[derive(Debug, Clone)]
pub struct MomentumSgd {
    lr: f64,
    momentum: f64,
    velocities: HashMap<String, Tensor>,
    t: usize,
}

impl MomentumSgd {
    pub fn new(lr: f64, momentum: f64) -> Result<Self, GradrunError> {
        Ok(MomentumSgd {
            lr: check_lr(lr)?,
            momentum: check_momentum(momentum)?,
            velocities: HashMap::new(),
            t: 0,
        })
    }

    pub fn velocity(&self, name: &str) -> Option<&Tensor> {
        self.velocities.get(name)
    }
}

impl Default for MomentumSgd {
    fn default() -> Self {
        MomentumSgd {
            lr: 0.01,
            momentum: 0.9,
            velocities: HashMap::new(),
            t: 0,
        }
    }
}

impl Hyperparameters for MomentumSgd {
    fn hyperparam(&self, name: &str) -> Option<f64> {
        match name {
            "lr" => Some(self.lr),
            "momentum" => Some(self.momentum),
            _ => None,
        }
    }

    fn set_hyperparam(&mut self, name: &str, value: f64) -> Result<(), GradrunError> {
        match name {
            "lr" => self.lr = check_lr(value)?,
            "momentum" => self.momentum = check_momentum(value)?,
            _ => return Err(unknown_hyperparam("MomentumSgd", name)),
        }
        Ok(())
    }

    fn hyperparam_names(&self) -> &'static [&'static str] {
        &["lr", "momentum"]
    }
}

impl Optimizer for MomentumSgd {
    fn update(&mut self, params: &mut [Parameter], grads: &[Option<Tensor>]) -> Result<(), GradrunError> {
        check_update_arguments("MomentumSgd::update", params, grads)?;
        for (param, grad) in params.iter_mut().zip(grads) {
            let Some(grad) = grad else { continue };
            let step = grad.scale(-self.lr)?;
            let velocity = match self.velocities.get(param.name()) {
                // A parameter whose type changed starts over.
                Some(v) if v.type_info() == grad.type_info() => v.scale(self.momentum)?.accumulate(&step)?,
                _ => step,
            };
            param.set_value(param.value().accumulate(&velocity)?)?;
            self.velocities.insert(param.name().to_string(), velocity);
        }
        self.t += 1;
        trace!(
            "MomentumSgd step {} (lr = {}, momentum = {})",
            self.t,
            self.lr,
            self.momentum
        );
        Ok(())
    }

    fn t(&self) -> usize {
        self.t
    }
}

#[cfg(test)]
#[path = "sgd_test.rs"]
mod tests;
