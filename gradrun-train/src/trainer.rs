// gradrun-train/src/trainer.rs

use crate::extension::{Extension, ExtensionContext};
use crate::trigger::{Progress, Trigger};
use crate::updater::{Updater, UpdaterState};
use gradrun_core::GradrunError;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

struct RegisteredExtension {
    name: String,
    extension: Box<dyn Extension>,
    trigger: Box<dyn Trigger>,
}

/// Snapshot of a trainer: the updater's progress and every extension's state,
/// keyed by registered name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainerState {
    pub updater: UpdaterState,
    pub extensions: BTreeMap<String, Value>,
}

impl TrainerState {
    pub fn to_json(&self) -> Result<String, GradrunError> {
        serde_json::to_string(self).map_err(|e| GradrunError::StateSerialization(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, GradrunError> {
        serde_json::from_str(json).map_err(|e| GradrunError::StateSerialization(e.to_string()))
    }
}

/// The training loop: repeatedly updates, then runs the extensions whose
/// trigger fires.
///
/// The loop ends when the stop trigger fires or when the updater's
/// iterator reports `DataExhausted`. Without a stop trigger and with a
/// forever-repeating iterator, [`run`](Trainer::run) does not return.
pub struct Trainer<U: Updater> {
    updater: U,
    stop_trigger: Option<Box<dyn Trigger>>,
    extensions: Vec<RegisteredExtension>,
    last_loss: Option<f64>,
}

impl<U: Updater> Trainer<U> {
    pub fn new(updater: U) -> Self {
        Trainer {
            updater,
            stop_trigger: None,
            extensions: Vec::new(),
            last_loss: None,
        }
    }

    pub fn with_stop_trigger(mut self, trigger: impl Trigger + 'static) -> Self {
        self.stop_trigger = Some(Box::new(trigger));
        self
    }

    /// Registers an extension, run on `trigger` or on its default trigger.
    ///
    /// Extensions run in registration order. A name already in use gets a
    /// `_1`, `_2`... suffix. Returns the registered name.
    pub fn extend(
        &mut self,
        extension: impl Extension + 'static,
        trigger: Option<Box<dyn Trigger>>,
    ) -> String {
        let base = extension.name().to_string();
        let mut name = base.clone();
        let mut suffix = 0;
        while self.extensions.iter().any(|e| e.name == name) {
            suffix += 1;
            name = format!("{base}_{suffix}");
        }
        let trigger = trigger.unwrap_or_else(|| extension.default_trigger());
        debug!("registered extension {name} with trigger {trigger:?}");
        self.extensions.push(RegisteredExtension {
            name: name.clone(),
            extension: Box::new(extension),
            trigger,
        });
        name
    }

    pub fn updater(&self) -> &U {
        &self.updater
    }

    pub fn updater_mut(&mut self) -> &mut U {
        &mut self.updater
    }

    pub fn into_updater(self) -> U {
        self.updater
    }

    pub fn last_loss(&self) -> Option<f64> {
        self.last_loss
    }

    pub fn extension_names(&self) -> Vec<&str> {
        self.extensions.iter().map(|e| e.name.as_str()).collect()
    }

    /// Runs the loop to completion and returns the final progress.
    ///
    /// Extensions and the updater are finalized whether the loop ends
    /// normally or with an error.
    pub fn run(&mut self) -> Result<Progress, GradrunError> {
        let result = self.run_loop();
        for entry in self.extensions.iter_mut() {
            entry.extension.finalize();
        }
        self.updater.finalize();
        result
    }

    fn run_loop(&mut self) -> Result<Progress, GradrunError> {
        let progress = self.updater.progress();
        for entry in self.extensions.iter_mut() {
            let mut ctx = ExtensionContext {
                progress,
                optimizer: self.updater.optimizer_mut(),
                loss: self.last_loss,
            };
            entry.extension.initialize(&mut ctx)?;
        }

        loop {
            let progress = self.updater.progress();
            if self.stop_trigger.as_ref().is_some_and(|t| t.fires(&progress)) {
                info!("stop trigger fired at iteration {}", progress.iteration);
                return Ok(progress);
            }

            match self.updater.update() {
                Ok(loss) => self.last_loss = Some(loss),
                Err(e) if e.is_data_exhausted() => {
                    info!("iterator exhausted after {} iterations", progress.iteration);
                    return Ok(progress);
                }
                Err(e) => return Err(e),
            }

            let progress = self.updater.progress();
            for entry in self.extensions.iter_mut() {
                if entry.trigger.fires(&progress) {
                    let mut ctx = ExtensionContext {
                        progress,
                        optimizer: self.updater.optimizer_mut(),
                        loss: self.last_loss,
                    };
                    entry.extension.call(&mut ctx)?;
                }
            }
        }
    }

    pub fn state(&self) -> Result<TrainerState, GradrunError> {
        let extensions = self
            .extensions
            .iter()
            .map(|e| Ok((e.name.clone(), e.extension.state()?)))
            .collect::<Result<BTreeMap<_, _>, GradrunError>>()?;
        Ok(TrainerState {
            updater: self.updater.state(),
            extensions,
        })
    }

    /// Restores the updater and every extension present in `state`.
    /// Extensions missing from the snapshot keep their current state.
    pub fn load_state(&mut self, mut state: TrainerState) -> Result<(), GradrunError> {
        self.updater.load_state(state.updater)?;
        for entry in self.extensions.iter_mut() {
            if let Some(value) = state.extensions.remove(&entry.name) {
                entry.extension.load_state(value)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "trainer_test.rs"]
mod tests;
