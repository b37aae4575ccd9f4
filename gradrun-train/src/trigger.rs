// gradrun-train/src/trigger.rs

use gradrun_core::GradrunError;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Snapshot of the training loop that triggers look at.
///
/// `iteration` counts completed updates, so it is 1 after the first step.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Progress {
    pub iteration: usize,
    pub epoch: usize,
    pub epoch_detail: f64,
    pub is_new_epoch: bool,
}

/// Unit a trigger period is counted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerUnit {
    Iteration,
    Epoch,
}

impl TryFrom<&str> for TriggerUnit {
    type Error = GradrunError;

    fn try_from(unit: &str) -> Result<Self, Self::Error> {
        match unit {
            "iteration" => Ok(TriggerUnit::Iteration),
            "epoch" => Ok(TriggerUnit::Epoch),
            other => Err(GradrunError::ConfigurationError(format!(
                "trigger unit must be 'iteration' or 'epoch', got '{other}'"
            ))),
        }
    }
}

impl TriggerUnit {
    /// Whether the count `n` in this unit has just been reached.
    fn reached(self, progress: &Progress, n: usize) -> bool {
        match self {
            TriggerUnit::Iteration => progress.iteration == n,
            TriggerUnit::Epoch => progress.is_new_epoch && progress.epoch == n,
        }
    }

    fn count(self, progress: &Progress) -> Option<usize> {
        match self {
            TriggerUnit::Iteration => Some(progress.iteration),
            TriggerUnit::Epoch => progress.is_new_epoch.then_some(progress.epoch),
        }
    }
}

/// Decides whether a periodic action runs after the current step.
pub trait Trigger: Debug + Send {
    fn fires(&self, progress: &Progress) -> bool;
}

/// Fires every `period` iterations or every `period` epochs.
///
/// Epoch triggers fire on the step that completes the epoch. A pure
/// function of the progress, so it can be shared between extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalTrigger {
    period: usize,
    unit: TriggerUnit,
}

impl IntervalTrigger {
    pub fn new(period: usize, unit: TriggerUnit) -> Result<Self, GradrunError> {
        if period == 0 {
            return Err(GradrunError::ConfigurationError(
                "trigger period must be at least 1".to_string(),
            ));
        }
        Ok(IntervalTrigger { period, unit })
    }

    /// Every iteration.
    pub fn every_iteration() -> Self {
        IntervalTrigger {
            period: 1,
            unit: TriggerUnit::Iteration,
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn unit(&self) -> TriggerUnit {
        self.unit
    }
}

impl Trigger for IntervalTrigger {
    fn fires(&self, progress: &Progress) -> bool {
        match self.unit.count(progress) {
            Some(count) => count > 0 && count % self.period == 0,
            None => false,
        }
    }
}

/// `(1, "iteration")`, `(5, "epoch")`...
impl TryFrom<(usize, &str)> for IntervalTrigger {
    type Error = GradrunError;

    fn try_from((period, unit): (usize, &str)) -> Result<Self, Self::Error> {
        IntervalTrigger::new(period, TriggerUnit::try_from(unit)?)
    }
}

/// Fires exactly at the listed iterations or epochs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualScheduleTrigger {
    points: Vec<usize>,
    unit: TriggerUnit,
}

impl ManualScheduleTrigger {
    pub fn new(mut points: Vec<usize>, unit: TriggerUnit) -> Self {
        points.sort_unstable();
        points.dedup();
        ManualScheduleTrigger { points, unit }
    }

    pub fn points(&self) -> &[usize] {
        &self.points
    }
}

impl Trigger for ManualScheduleTrigger {
    fn fires(&self, progress: &Progress) -> bool {
        self.points.iter().any(|&p| self.unit.reached(progress, p))
    }
}

impl TryFrom<(Vec<usize>, &str)> for ManualScheduleTrigger {
    type Error = GradrunError;

    fn try_from((points, unit): (Vec<usize>, &str)) -> Result<Self, Self::Error> {
        Ok(ManualScheduleTrigger::new(points, TriggerUnit::try_from(unit)?))
    }
}

#[cfg(test)]
#[path = "trigger_test.rs"]
mod tests;
